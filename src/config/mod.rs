//! Build intent: base image reference, target image type, customizations.
//!
//! Only the parts of a blueprint that change the manifest shape are modeled.
//! Credentials are carried through untouched.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ManifestError;

/// Target image types understood by the graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Ami,
    Raw,
    Qcow2,
    Iso,
}

impl ImageType {
    pub const ALL: [ImageType; 4] = [
        ImageType::Ami,
        ImageType::Raw,
        ImageType::Qcow2,
        ImageType::Iso,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Ami => "ami",
            ImageType::Raw => "raw",
            ImageType::Qcow2 => "qcow2",
            ImageType::Iso => "iso",
        }
    }

    /// Disk images deploy the base image into a partitioned disk.
    pub fn is_disk(&self) -> bool {
        !matches!(self, ImageType::Iso)
    }

    /// Name of the final artifact produced by the downstream engine.
    pub fn export_filename(&self) -> &'static str {
        match self {
            // AMIs are uploaded as plain raw disks.
            ImageType::Ami | ImageType::Raw => "disk.raw",
            ImageType::Qcow2 => "disk.qcow2",
            ImageType::Iso => "install.iso",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ami" => Ok(ImageType::Ami),
            "raw" => Ok(ImageType::Raw),
            "qcow2" => Ok(ImageType::Qcow2),
            "iso" => Ok(ImageType::Iso),
            other => Err(ManifestError::UnsupportedImageType {
                image_type: other.to_string(),
            }),
        }
    }
}

/// A user account to create in the deployed system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCustomization {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelCustomization {
    /// Extra kernel arguments, whitespace separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customizations {
    #[serde(default)]
    pub user: Vec<UserCustomization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<KernelCustomization>,
}

impl Customizations {
    pub fn has_users(&self) -> bool {
        !self.user.is_empty()
    }

    /// Kernel arguments requested through `kernel.append`.
    pub fn kernel_args(&self) -> Vec<String> {
        self.kernel
            .as_ref()
            .and_then(|kernel| kernel.append.as_deref())
            .map(|append| append.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// The blueprint portion of a build request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Customizations>,
}

/// Everything the graph builder needs to derive a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestConfig {
    /// Base container reference, e.g. `quay.io/centos-bootc/centos-bootc:stream9`.
    pub imgref: String,
    /// Requested image type; validated by the builder.
    pub img_type: String,
    pub build_config: Option<BuildConfig>,
}

impl ManifestConfig {
    pub fn new(imgref: impl Into<String>, img_type: impl Into<String>) -> Self {
        Self {
            imgref: imgref.into(),
            img_type: img_type.into(),
            build_config: None,
        }
    }

    pub fn with_build_config(mut self, build_config: BuildConfig) -> Self {
        self.build_config = Some(build_config);
        self
    }

    pub fn customizations(&self) -> Option<&Customizations> {
        self.build_config
            .as_ref()
            .and_then(|config| config.customizations.as_ref())
    }

    pub fn users(&self) -> &[UserCustomization] {
        self.customizations()
            .map(|c| c.user.as_slice())
            .unwrap_or_default()
    }
}

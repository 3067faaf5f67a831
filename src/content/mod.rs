//! Externally resolved content handed to the resolver.
//!
//! Package metadata, container digests and ostree commits are fetched by
//! other tools. They arrive here grouped by the pipeline that consumes them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One resolved package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_location: Option<String>,
}

impl PackageSpec {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            checksum: checksum.into(),
            ..Self::default()
        }
    }

    /// `version[-release][.arch]`, the form dracut expects for a kernel.
    pub fn kernel_release(&self) -> String {
        let mut release = self.version.clone();
        if let Some(rel) = &self.release {
            release.push('-');
            release.push_str(rel);
        }
        if let Some(arch) = &self.arch {
            release.push('.');
            release.push_str(arch);
        }
        release
    }
}

/// One resolved container reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub source: String,
    pub digest: String,
    #[serde(alias = "imageID")]
    pub image_id: String,
}

impl ContainerSpec {
    pub fn new(
        source: impl Into<String>,
        digest: impl Into<String>,
        image_id: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            digest: digest.into(),
            image_id: image_id.into(),
        }
    }
}

/// One resolved ostree commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSpec {
    pub checksum: String,
    pub url: String,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
}

/// Packages keyed by pipeline name.
pub type PackageSets = BTreeMap<String, Vec<PackageSpec>>;
/// Containers keyed by pipeline name.
pub type ContainerSets = BTreeMap<String, Vec<ContainerSpec>>;
/// Commits keyed by pipeline name.
pub type CommitSets = BTreeMap<String, Vec<CommitSpec>>;

/// All resolved content for one resolve call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentMaps {
    #[serde(default)]
    pub packages: PackageSets,
    #[serde(default)]
    pub containers: ContainerSets,
    #[serde(default)]
    pub commits: CommitSets,
}

impl ContentMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packages(mut self, pipeline: impl Into<String>, packages: Vec<PackageSpec>) -> Self {
        self.packages.insert(pipeline.into(), packages);
        self
    }

    pub fn with_containers(
        mut self,
        pipeline: impl Into<String>,
        containers: Vec<ContainerSpec>,
    ) -> Self {
        self.containers.insert(pipeline.into(), containers);
        self
    }

    pub fn with_commits(mut self, pipeline: impl Into<String>, commits: Vec<CommitSpec>) -> Self {
        self.commits.insert(pipeline.into(), commits);
        self
    }

    /// Read content maps from a JSON file with `packages`, `containers` and
    /// `commits` objects, each keyed by pipeline name.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("reading content file '{}'", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing content file '{}'", path.display()))
    }
}

/// Entries for `pipeline`, or an empty slice when none were supplied.
pub(crate) fn entries<'a, T>(sets: &'a BTreeMap<String, Vec<T>>, pipeline: &str) -> &'a [T] {
    sets.get(pipeline).map(Vec::as_slice).unwrap_or_default()
}

/// Exact-name package lookup.
pub fn find_package<'a>(packages: &'a [PackageSpec], name: &str) -> Option<&'a PackageSpec> {
    packages.iter().find(|pkg| pkg.name == name)
}

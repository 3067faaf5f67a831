//! Graph builder: configuration to abstract manifest.
//!
//! The pipeline set and the fixed stages depend only on the image type.
//! Conditional stages come from the [`conditions`] table. Nothing here does
//! I/O, and the only failures are a missing base reference or an unknown
//! image type; every content invariant is checked later by the resolver.

pub mod conditions;
pub mod disk;
pub mod iso;

use tracing::debug;

use crate::config::{ImageType, ManifestConfig};
use crate::error::{ManifestError, Result};
use crate::manifest::{Manifest, Pipeline};

/// Derive the abstract manifest for `config`.
pub fn build(config: &ManifestConfig) -> Result<Manifest> {
    if config.imgref.is_empty() {
        return Err(ManifestError::NoBaseImage);
    }
    let image_type: ImageType = config.img_type.parse()?;

    let mut pipelines = skeleton(config, image_type);

    let selected = conditions::select(image_type, config.customizations());
    for selection in &selected {
        debug!(
            pipeline = selection.pipeline,
            stage = %selection.stage.stage_type,
            "adding conditional stage"
        );
    }
    conditions::apply(&mut pipelines, selected);

    debug!(
        imgref = %config.imgref,
        image_type = %image_type,
        pipelines = pipelines.len(),
        "built manifest skeleton"
    );
    Ok(Manifest::new(image_type, pipelines))
}

/// Fixed pipelines for `image_type`, before conditional stages.
pub(crate) fn skeleton(config: &ManifestConfig, image_type: ImageType) -> Vec<Pipeline> {
    match image_type {
        ImageType::Ami | ImageType::Raw | ImageType::Qcow2 => disk::pipelines(config, image_type),
        ImageType::Iso => iso::pipelines(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, Customizations, UserCustomization};
    use crate::error::ErrorKind;
    use crate::manifest::{pipelines, stages, StageOrigin};

    fn base_config(img_type: &str) -> ManifestConfig {
        ManifestConfig::new("testempty", img_type)
    }

    fn user_config(img_type: &str) -> ManifestConfig {
        ManifestConfig::new("testuser", img_type).with_build_config(BuildConfig {
            customizations: Some(Customizations {
                user: vec![UserCustomization {
                    name: "tester".into(),
                    password: Some("super-secret-password-42".into()),
                    key: Some("ssh-ed25519 AAAAAAAAAAAA".into()),
                    groups: Vec::new(),
                }],
                kernel: None,
            }),
        })
    }

    #[test]
    fn test_pipeline_sets_per_image_type() {
        let expected: &[(&str, &[&str])] = &[
            ("ami", &["build", "ostree-deployment", "image"]),
            ("raw", &["build", "ostree-deployment", "image"]),
            ("qcow2", &["build", "ostree-deployment", "image", "qcow2"]),
            ("iso", &["build", "anaconda-tree", "bootiso-tree"]),
        ];
        for (img_type, names) in expected {
            let manifest = build(&base_config(img_type)).unwrap();
            assert_eq!(manifest.pipeline_names(), *names, "image type {img_type}");
            assert_eq!(manifest.image_type().as_str(), *img_type);
        }
    }

    #[test]
    fn test_user_config_builds_for_every_type() {
        for image_type in ImageType::ALL {
            assert!(build(&user_config(image_type.as_str())).is_ok());
        }
    }

    #[test]
    fn test_empty_imgref_fails_regardless_of_type() {
        for img_type in ["ami", "raw", "qcow2", "iso", "bad", ""] {
            let err = build(&ManifestConfig::new("", img_type)).unwrap_err();
            assert!(matches!(err, ManifestError::NoBaseImage), "{img_type}");
            assert_eq!(err.kind(), ErrorKind::Config);
            assert_eq!(err.to_string(), "no base image defined");
        }
    }

    #[test]
    fn test_unsupported_image_type_names_value() {
        let err = build(&base_config("bad")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.to_string(), "unsupported image type \"bad\"");
    }

    #[test]
    fn test_users_stage_only_with_users() {
        for img_type in ["ami", "raw", "qcow2"] {
            let plain = build(&base_config(img_type)).unwrap();
            let deployment = plain.pipeline(pipelines::OSTREE_DEPLOYMENT).unwrap();
            assert!(!deployment.has_stage(stages::USERS));

            let with_users = build(&user_config(img_type)).unwrap();
            let deployment = with_users.pipeline(pipelines::OSTREE_DEPLOYMENT).unwrap();
            let users = deployment
                .stages
                .iter()
                .position(|s| s.stage_type == stages::USERS)
                .unwrap();
            assert_eq!(deployment.stages[users].origin, StageOrigin::Conditional);
            assert_eq!(deployment.stages[users - 1].stage_type, stages::OSTREE_FILLVAR);
        }
    }

    #[test]
    fn test_unconditional_topology_ignores_customizations() {
        for image_type in ImageType::ALL {
            let plain = build(&base_config(image_type.as_str())).unwrap();
            let custom = build(&user_config(image_type.as_str())).unwrap();
            assert_eq!(plain.pipeline_names(), custom.pipeline_names());
            for (a, b) in plain.pipelines().iter().zip(custom.pipelines()) {
                let fixed: Vec<&str> = b
                    .stages
                    .iter()
                    .filter(|s| s.origin == StageOrigin::Fixed)
                    .map(|s| s.stage_type.as_str())
                    .collect();
                assert_eq!(a.stage_types(), fixed);
            }
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = user_config("qcow2");
        assert_eq!(build(&config).unwrap(), build(&config).unwrap());
    }
}

//! Conditional stage table.
//!
//! Every stage whose presence depends on the customizations is listed here
//! once, with the image types it applies to, the predicate that enables it
//! and where it goes. The builder evaluates the table a single time per
//! build and splices the selected stages into the fixed skeleton.

use crate::config::{Customizations, ImageType};
use crate::manifest::{pipelines, stages, Pipeline, Stage};

/// Customization predicate gating a conditional stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// At least one user account is configured.
    HasUsers,
}

impl Predicate {
    pub fn holds(self, customizations: Option<&Customizations>) -> bool {
        let Some(customizations) = customizations else {
            return false;
        };
        match self {
            Predicate::HasUsers => customizations.has_users(),
        }
    }
}

/// One row of the conditional stage table.
#[derive(Debug)]
pub struct ConditionalStage {
    pub pipeline: &'static str,
    pub image_types: &'static [ImageType],
    pub predicate: Predicate,
    /// Stage type the new stage is inserted after.
    pub after: &'static str,
    make: fn(&Customizations) -> Stage,
}

impl ConditionalStage {
    pub fn applies_to(&self, image_type: ImageType) -> bool {
        self.image_types.contains(&image_type)
    }
}

fn users_stage(customizations: &Customizations) -> Stage {
    stages::users(&customizations.user)
}

pub const CONDITIONAL_STAGES: &[ConditionalStage] = &[ConditionalStage {
    pipeline: pipelines::OSTREE_DEPLOYMENT,
    image_types: &[ImageType::Ami, ImageType::Raw, ImageType::Qcow2],
    predicate: Predicate::HasUsers,
    after: stages::OSTREE_FILLVAR,
    make: users_stage,
}];

/// A conditional stage selected for one build, ready to splice in.
#[derive(Debug)]
pub struct Selected {
    pub pipeline: &'static str,
    pub after: &'static str,
    pub stage: Stage,
}

/// Evaluate the table for `image_type` and `customizations`.
pub fn select(image_type: ImageType, customizations: Option<&Customizations>) -> Vec<Selected> {
    let Some(customizations) = customizations else {
        return Vec::new();
    };
    CONDITIONAL_STAGES
        .iter()
        .filter(|row| row.applies_to(image_type) && row.predicate.holds(Some(customizations)))
        .map(|row| Selected {
            pipeline: row.pipeline,
            after: row.after,
            stage: (row.make)(customizations).conditional(),
        })
        .collect()
}

/// Splice selected stages into their pipelines.
///
/// Every row targets a pipeline of the skeleton for its image types; a
/// selection naming any other pipeline is a table error.
pub fn apply(pipelines: &mut [Pipeline], selected: Vec<Selected>) {
    for selection in selected {
        let target = pipelines.iter_mut().find(|p| p.name == selection.pipeline);
        debug_assert!(
            target.is_some(),
            "conditional stage {} targets unknown pipeline {}",
            selection.stage.stage_type,
            selection.pipeline
        );
        if let Some(pipeline) = target {
            pipeline.insert_after(selection.after, selection.stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::skeleton;
    use crate::config::{ManifestConfig, UserCustomization};
    use crate::manifest::StageOrigin;

    fn with_user() -> Customizations {
        Customizations {
            user: vec![UserCustomization {
                name: "tester".into(),
                ..UserCustomization::default()
            }],
            kernel: None,
        }
    }

    #[test]
    fn test_has_users_predicate() {
        assert!(!Predicate::HasUsers.holds(None));
        assert!(!Predicate::HasUsers.holds(Some(&Customizations::default())));
        assert!(Predicate::HasUsers.holds(Some(&with_user())));
    }

    #[test]
    fn test_select_users_for_disk_types() {
        let customizations = with_user();
        for image_type in [ImageType::Ami, ImageType::Raw, ImageType::Qcow2] {
            let selected = select(image_type, Some(&customizations));
            assert_eq!(selected.len(), 1);
            assert_eq!(selected[0].pipeline, pipelines::OSTREE_DEPLOYMENT);
            assert_eq!(selected[0].stage.stage_type, stages::USERS);
            assert_eq!(selected[0].stage.origin, StageOrigin::Conditional);
        }
    }

    #[test]
    fn test_select_nothing_for_iso() {
        assert!(select(ImageType::Iso, Some(&with_user())).is_empty());
    }

    #[test]
    fn test_select_nothing_without_users() {
        for image_type in ImageType::ALL {
            assert!(select(image_type, None).is_empty());
            assert!(select(image_type, Some(&Customizations::default())).is_empty());
        }
    }

    #[test]
    fn test_table_rows_match_skeletons() {
        let config = ManifestConfig::new("quay.io/x", "qcow2");
        for row in CONDITIONAL_STAGES {
            for &image_type in row.image_types {
                let built = skeleton(&config, image_type);
                let pipeline = built
                    .iter()
                    .find(|p| p.name == row.pipeline)
                    .unwrap_or_else(|| {
                        panic!("{image_type} has no pipeline {:?}", row.pipeline)
                    });
                assert!(
                    pipeline.has_stage(row.after),
                    "{image_type}: pipeline {:?} has no anchor stage {:?}",
                    row.pipeline,
                    row.after
                );
            }
        }
    }

    #[test]
    fn test_apply_inserts_after_anchor() {
        let config = ManifestConfig::new("quay.io/x", "raw");
        let mut built = skeleton(&config, ImageType::Raw);
        apply(&mut built, select(ImageType::Raw, Some(&with_user())));
        let deployment = built
            .iter()
            .find(|p| p.name == pipelines::OSTREE_DEPLOYMENT)
            .unwrap();
        let types = deployment.stage_types();
        let fillvar = types.iter().position(|t| *t == stages::OSTREE_FILLVAR).unwrap();
        assert_eq!(types[fillvar + 1], stages::USERS);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "targets unknown pipeline")]
    fn test_apply_rejects_unknown_pipeline() {
        let mut built = vec![Pipeline::new("build")];
        apply(
            &mut built,
            vec![Selected {
                pipeline: "missing",
                after: stages::OSTREE_FILLVAR,
                stage: stages::users(&[]),
            }],
        );
    }
}

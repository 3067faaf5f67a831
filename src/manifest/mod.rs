//! Abstract pipeline graph produced by the builder.
//!
//! A [`Manifest`] fixes the pipeline and stage topology for one configuration.
//! Stages that need external content carry a [`ContentSlot`]; the resolver
//! fills those slots on a read-only view and never touches the graph itself,
//! so one manifest can be resolved any number of times, from any thread.

pub mod document;
pub mod stages;

use serde_json::{Map, Value};
use std::fmt;

use crate::config::ImageType;

/// Pipeline names shared between the builder and the resolver.
pub mod pipelines {
    pub const BUILD: &str = "build";
    pub const OSTREE_DEPLOYMENT: &str = "ostree-deployment";
    pub const IMAGE: &str = "image";
    pub const QCOW2: &str = "qcow2";
    pub const ANACONDA_TREE: &str = "anaconda-tree";
    pub const BOOTISO_TREE: &str = "bootiso-tree";
}

/// Why a stage is part of its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageOrigin {
    /// Always present for the image type.
    Fixed,
    /// Present because a customization predicate held.
    Conditional,
}

/// Content a stage requires before it can be emitted.
///
/// Slots are looked up under the owning pipeline's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSlot {
    /// Exactly one ostree commit or exactly one container, never both.
    DeploymentSource,
    /// At least one container, commit, or an earlier pipeline's tree.
    TreeSource { intermediate: Option<String> },
    /// The pipeline's containers; must not be empty.
    Containers,
    /// The pipeline's packages; `required` forbids an empty list.
    Packages { required: bool },
    /// One package matched by exact name. Its kernel release is written to
    /// the stage option `option`.
    NamedPackage { name: String, option: String },
}

impl fmt::Display for ContentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSlot::DeploymentSource => write!(f, "deployment source"),
            ContentSlot::TreeSource { .. } => write!(f, "tree source"),
            ContentSlot::Containers => write!(f, "containers"),
            ContentSlot::Packages { .. } => write!(f, "packages"),
            ContentSlot::NamedPackage { name, .. } => write!(f, "package {name}"),
        }
    }
}

/// One step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Engine stage identifier, e.g. `org.osbuild.rpm`.
    pub stage_type: String,
    /// Pass-through options; `Value::Null` when the stage takes none.
    pub options: Value,
    /// Inputs fixed at build time (references to other pipelines).
    pub inputs: Map<String, Value>,
    pub origin: StageOrigin,
    pub slot: Option<ContentSlot>,
}

impl Stage {
    pub fn new(stage_type: impl Into<String>, options: Value) -> Self {
        Self {
            stage_type: stage_type.into(),
            options,
            inputs: Map::new(),
            origin: StageOrigin::Fixed,
            slot: None,
        }
    }

    pub fn with_slot(mut self, slot: ContentSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, input: Value) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    pub fn conditional(mut self) -> Self {
        self.origin = StageOrigin::Conditional;
        self
    }
}

/// A named, ordered group of stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub name: String,
    /// Pipeline providing the build root, as `name:<pipeline>`.
    pub build: Option<String>,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            build: None,
            stages: Vec::new(),
        }
    }

    /// Run this pipeline inside the tree built by `build_pipeline`.
    pub fn built_by(mut self, build_pipeline: &str) -> Self {
        self.build = Some(format!("name:{build_pipeline}"));
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Insert `stage` right after the last stage of type `anchor`, or at the
    /// end if no such stage exists.
    pub(crate) fn insert_after(&mut self, anchor: &str, stage: Stage) {
        let index = self
            .stages
            .iter()
            .rposition(|s| s.stage_type == anchor)
            .map(|i| i + 1)
            .unwrap_or(self.stages.len());
        self.stages.insert(index, stage);
    }

    pub fn stage_types(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.stage_type.as_str()).collect()
    }

    pub fn has_stage(&self, stage_type: &str) -> bool {
        self.stages.iter().any(|s| s.stage_type == stage_type)
    }
}

/// The abstract, unresolved manifest for one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    image_type: ImageType,
    pipelines: Vec<Pipeline>,
}

impl Manifest {
    pub fn new(image_type: ImageType, pipelines: Vec<Pipeline>) -> Self {
        Self {
            image_type,
            pipelines,
        }
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    pub fn pipeline_names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|p| p.name.as_str()).collect()
    }

    /// Ordered pipeline names with their ordered stage types.
    pub fn layout(&self) -> Vec<(String, Vec<String>)> {
        self.pipelines
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    p.stages.iter().map(|s| s.stage_type.clone()).collect(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_after_anchor() {
        let mut pipeline = Pipeline::new("p")
            .stage(Stage::new("a", Value::Null))
            .stage(Stage::new("b", Value::Null))
            .stage(Stage::new("c", Value::Null));
        pipeline.insert_after("b", Stage::new("x", Value::Null).conditional());
        assert_eq!(pipeline.stage_types(), vec!["a", "b", "x", "c"]);
        assert_eq!(pipeline.stages[2].origin, StageOrigin::Conditional);
    }

    #[test]
    fn test_insert_after_missing_anchor_appends() {
        let mut pipeline = Pipeline::new("p").stage(Stage::new("a", Value::Null));
        pipeline.insert_after("zzz", Stage::new("x", Value::Null));
        assert_eq!(pipeline.stage_types(), vec!["a", "x"]);
    }

    #[test]
    fn test_built_by() {
        let pipeline = Pipeline::new("image").built_by("build");
        assert_eq!(pipeline.build.as_deref(), Some("name:build"));
    }

    #[test]
    fn test_layout_preserves_order() {
        let manifest = Manifest::new(
            ImageType::Raw,
            vec![
                Pipeline::new("build").stage(Stage::new("one", json!({}))),
                Pipeline::new("second")
                    .stage(Stage::new("two", Value::Null))
                    .stage(Stage::new("three", Value::Null)),
            ],
        );
        assert_eq!(manifest.pipeline_names(), vec!["build", "second"]);
        assert_eq!(
            manifest.layout(),
            vec![
                ("build".to_string(), vec!["one".to_string()]),
                ("second".to_string(), vec!["two".to_string(), "three".to_string()]),
            ]
        );
        assert!(manifest.pipeline("missing").is_none());
    }
}

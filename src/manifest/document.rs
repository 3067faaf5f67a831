//! Serialized manifest as consumed by the image-assembly engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Engine manifest format version.
pub const FORMAT_VERSION: &str = "2";

pub const SOURCE_CURL: &str = "org.osbuild.curl";
pub const SOURCE_SKOPEO: &str = "org.osbuild.skopeo";
pub const SOURCE_OSTREE: &str = "org.osbuild.ostree";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    pub pipelines: Vec<DocumentPipeline>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, SourceItems>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPipeline {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default)]
    pub stages: Vec<DocumentStage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStage {
    #[serde(rename = "type")]
    pub stage_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub inputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

/// Items of one source kind, keyed by checksum or image ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceItems {
    pub items: BTreeMap<String, Value>,
}

impl Document {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn pipeline(&self, name: &str) -> Option<&DocumentPipeline> {
        self.pipelines.iter().find(|p| p.name == name)
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

impl DocumentPipeline {
    pub fn has_stage(&self, stage_type: &str) -> bool {
        self.stages.iter().any(|s| s.stage_type == stage_type)
    }

    pub fn stage(&self, stage_type: &str) -> Option<&DocumentStage> {
        self.stages.iter().find(|s| s.stage_type == stage_type)
    }
}

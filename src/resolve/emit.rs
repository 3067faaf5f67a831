//! Document emission for bound pipelines.
//!
//! Only called after binding and completeness checks passed, so nothing in
//! here can fail.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::{Bound, BoundPipeline, BoundStage};
use crate::content::{CommitSpec, ContainerSpec, PackageSpec};
use crate::manifest::document::{
    Document, DocumentPipeline, DocumentStage, SourceItems, FORMAT_VERSION, SOURCE_CURL,
    SOURCE_OSTREE, SOURCE_SKOPEO,
};
use crate::manifest::{stages, ContentSlot};

/// Download sources collected while emitting stages.
#[derive(Default)]
struct Sources {
    curl: BTreeMap<String, Value>,
    skopeo: BTreeMap<String, Value>,
    ostree: BTreeMap<String, Value>,
}

impl Sources {
    fn add_packages(&mut self, packages: &[PackageSpec]) {
        for pkg in packages {
            let item = match &pkg.remote_location {
                Some(url) => json!({ "url": url }),
                None => json!({}),
            };
            self.curl.insert(pkg.checksum.clone(), item);
        }
    }

    fn add_containers(&mut self, containers: &[ContainerSpec]) {
        for container in containers {
            self.skopeo.insert(
                container.image_id.clone(),
                json!({ "image": { "name": container.source, "digest": container.digest } }),
            );
        }
    }

    fn add_commits(&mut self, commits: &[CommitSpec]) {
        for commit in commits {
            self.ostree.insert(
                commit.checksum.clone(),
                json!({ "remote": { "url": commit.url } }),
            );
        }
    }

    fn into_map(self) -> BTreeMap<String, SourceItems> {
        let mut out = BTreeMap::new();
        for (name, items) in [
            (SOURCE_CURL, self.curl),
            (SOURCE_SKOPEO, self.skopeo),
            (SOURCE_OSTREE, self.ostree),
        ] {
            if !items.is_empty() {
                out.insert(name.to_string(), SourceItems { items });
            }
        }
        out
    }
}

fn containers_input(containers: &[ContainerSpec]) -> Value {
    let mut references = Map::new();
    for container in containers {
        references.insert(
            container.image_id.clone(),
            json!({ "name": container.source }),
        );
    }
    json!({
        "type": "org.osbuild.containers",
        "origin": "org.osbuild.source",
        "references": references,
    })
}

fn commits_input(commits: &[CommitSpec]) -> Value {
    let mut references = Map::new();
    for commit in commits {
        let reference = match &commit.ref_name {
            Some(ref_name) => json!({ "ref": ref_name }),
            None => json!({}),
        };
        references.insert(commit.checksum.clone(), reference);
    }
    json!({
        "type": "org.osbuild.ostree",
        "origin": "org.osbuild.source",
        "references": references,
    })
}

fn packages_input(packages: &[PackageSpec]) -> Value {
    let references: Vec<&str> = packages.iter().map(|p| p.checksum.as_str()).collect();
    json!({
        "type": "org.osbuild.files",
        "origin": "org.osbuild.source",
        "references": references,
    })
}

fn set_option(options: &mut Value, key: &str, value: Value) {
    if !options.is_object() {
        *options = Value::Object(Map::new());
    }
    if let Value::Object(map) = options {
        map.insert(key.to_string(), value);
    }
}

fn emit_stage(bound: &BoundStage<'_>, sources: &mut Sources) -> DocumentStage {
    let stage = bound.stage;
    let mut out = DocumentStage {
        stage_type: stage.stage_type.clone(),
        inputs: stage.inputs.clone(),
        options: stage.options.clone(),
    };

    // The declared stage type is kept for every source kind; only inputs and
    // options say where the content comes from.
    match bound.content {
        Bound::Nothing => {}
        Bound::DeployContainer(container) => {
            let containers = std::slice::from_ref(container);
            out.inputs.insert("images".into(), containers_input(containers));
            sources.add_containers(containers);
        }
        Bound::DeployCommit(commit) => {
            let commits = std::slice::from_ref(commit);
            if let Value::Object(map) = &mut out.options {
                map.remove("target_imgref");
            }
            if let Some(ref_name) = &commit.ref_name {
                set_option(&mut out.options, "ref", Value::String(ref_name.clone()));
            }
            out.inputs.insert("commits".into(), commits_input(commits));
            sources.add_commits(commits);
        }
        Bound::TreeContainers(containers) => {
            out.inputs.insert("images".into(), containers_input(containers));
            sources.add_containers(containers);
        }
        Bound::TreeCommits(commits) => {
            set_option(&mut out.options, "repo", json!("/ostree/repo"));
            out.inputs.insert("commits".into(), commits_input(commits));
            sources.add_commits(commits);
        }
        Bound::TreeIntermediate(pipeline) => {
            out.inputs.insert("tree".into(), stages::tree_input(pipeline));
        }
        Bound::Containers(containers) => {
            out.inputs.insert("images".into(), containers_input(containers));
            sources.add_containers(containers);
        }
        Bound::Packages(packages) => {
            out.inputs.insert("packages".into(), packages_input(packages));
            sources.add_packages(packages);
        }
        Bound::Package(package) => {
            if let Some(ContentSlot::NamedPackage { option, .. }) = &stage.slot {
                set_option(&mut out.options, option, json!([package.kernel_release()]));
            }
        }
    }

    out
}

pub(super) fn document(bound: &[BoundPipeline<'_>]) -> Document {
    let mut sources = Sources::default();
    let pipelines = bound
        .iter()
        .map(|bp| DocumentPipeline {
            name: bp.pipeline.name.clone(),
            build: bp.pipeline.build.clone(),
            stages: bp
                .stages
                .iter()
                .map(|stage| emit_stage(stage, &mut sources))
                .collect(),
        })
        .collect();

    Document {
        version: FORMAT_VERSION.to_string(),
        pipelines,
        sources: sources.into_map(),
    }
}

//! Resolver/emitter: abstract manifest plus external content to manifest bytes.
//!
//! Resolution runs three passes over the manifest, always in declared
//! pipeline and stage order:
//!
//! 1. **bind** every content slot to the supplied content, enforcing source
//!    cardinality and named-package presence;
//! 2. **check** that every slot requiring a non-empty list got one;
//! 3. **emit** the document and encode it.
//!
//! Nothing is encoded before passes 1 and 2 succeed for every pipeline, so a
//! failure never leaves a partial document behind. The manifest and the
//! content maps are only borrowed.

mod emit;

use tracing::{debug, info};

use crate::content::{
    entries, find_package, CommitSets, CommitSpec, ContainerSets, ContainerSpec, ContentMaps,
    PackageSets, PackageSpec,
};
use crate::error::{ContentKind, ManifestError, Result};
use crate::manifest::document::Document;
use crate::manifest::{ContentSlot, Manifest, Pipeline, Stage};

/// Content bound to one stage's slot.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Bound<'a> {
    Nothing,
    DeployContainer(&'a ContainerSpec),
    DeployCommit(&'a CommitSpec),
    TreeContainers(&'a [ContainerSpec]),
    TreeCommits(&'a [CommitSpec]),
    TreeIntermediate(&'a str),
    Containers(&'a [ContainerSpec]),
    Packages(&'a [PackageSpec]),
    Package(&'a PackageSpec),
}

#[derive(Debug)]
pub(crate) struct BoundStage<'a> {
    pub(crate) stage: &'a Stage,
    pub(crate) content: Bound<'a>,
}

#[derive(Debug)]
pub(crate) struct BoundPipeline<'a> {
    pub(crate) pipeline: &'a Pipeline,
    pub(crate) stages: Vec<BoundStage<'a>>,
}

/// Resolve `manifest` against per-pipeline content and encode it as JSON.
pub fn resolve(
    manifest: &Manifest,
    packages: &PackageSets,
    containers: &ContainerSets,
    commits: &CommitSets,
) -> Result<Vec<u8>> {
    let document = resolve_document(manifest, packages, containers, commits)?;
    let bytes = serde_json::to_vec_pretty(&document)?;
    info!(
        image_type = %manifest.image_type(),
        pipelines = document.pipelines.len(),
        bytes = bytes.len(),
        "emitted manifest"
    );
    Ok(bytes)
}

/// Resolve `manifest` into an in-memory document without encoding it.
pub fn resolve_document(
    manifest: &Manifest,
    packages: &PackageSets,
    containers: &ContainerSets,
    commits: &CommitSets,
) -> Result<Document> {
    let bound = bind(manifest, packages, containers, commits)?;
    check_complete(&bound)?;
    Ok(emit::document(&bound))
}

impl Manifest {
    /// Resolve against bundled content maps; see [`resolve`].
    pub fn serialize(&self, content: &ContentMaps) -> Result<Vec<u8>> {
        resolve(
            self,
            &content.packages,
            &content.containers,
            &content.commits,
        )
    }
}

fn bind<'a>(
    manifest: &'a Manifest,
    packages: &'a PackageSets,
    containers: &'a ContainerSets,
    commits: &'a CommitSets,
) -> Result<Vec<BoundPipeline<'a>>> {
    let mut bound = Vec::with_capacity(manifest.pipelines().len());

    for (index, pipeline) in manifest.pipelines().iter().enumerate() {
        let name = pipeline.name.as_str();
        let pipeline_packages = entries(packages, name);
        let pipeline_containers = entries(containers, name);
        let pipeline_commits = entries(commits, name);

        let mut stages = Vec::with_capacity(pipeline.stages.len());
        for stage in &pipeline.stages {
            let content = match &stage.slot {
                None => Bound::Nothing,
                Some(ContentSlot::DeploymentSource) => {
                    match (pipeline_commits, pipeline_containers) {
                        ([commit], []) => Bound::DeployCommit(commit),
                        ([], [container]) => Bound::DeployContainer(container),
                        _ => {
                            return Err(ManifestError::Cardinality {
                                pipeline: name.to_string(),
                                commits: pipeline_commits.len(),
                                containers: pipeline_containers.len(),
                            })
                        }
                    }
                }
                Some(ContentSlot::TreeSource { intermediate }) => {
                    let earlier = &manifest.pipelines()[..index];
                    let materialized = intermediate
                        .as_deref()
                        .filter(|wanted| earlier.iter().any(|p| p.name == *wanted));
                    if !pipeline_containers.is_empty() {
                        Bound::TreeContainers(pipeline_containers)
                    } else if !pipeline_commits.is_empty() {
                        Bound::TreeCommits(pipeline_commits)
                    } else if let Some(source) = materialized {
                        Bound::TreeIntermediate(source)
                    } else {
                        return Err(ManifestError::MissingSource {
                            pipeline: name.to_string(),
                        });
                    }
                }
                Some(ContentSlot::Containers) => Bound::Containers(pipeline_containers),
                Some(ContentSlot::Packages { .. }) => Bound::Packages(pipeline_packages),
                Some(ContentSlot::NamedPackage { name: package, .. }) => {
                    match find_package(pipeline_packages, package) {
                        Some(spec) => Bound::Package(spec),
                        None => {
                            return Err(ManifestError::PackageNotFound {
                                package: package.clone(),
                                pipeline: name.to_string(),
                            })
                        }
                    }
                }
            };
            stages.push(BoundStage { stage, content });
        }

        debug!(
            pipeline = name,
            packages = pipeline_packages.len(),
            containers = pipeline_containers.len(),
            commits = pipeline_commits.len(),
            "bound pipeline content"
        );
        bound.push(BoundPipeline { pipeline, stages });
    }

    Ok(bound)
}

fn check_complete(bound: &[BoundPipeline<'_>]) -> Result<()> {
    for pipeline in bound {
        for stage in &pipeline.stages {
            let missing = match (&stage.stage.slot, stage.content) {
                (Some(ContentSlot::Containers), Bound::Containers(list)) if list.is_empty() => {
                    Some(ContentKind::Containers)
                }
                (Some(ContentSlot::Packages { required: true }), Bound::Packages(list))
                    if list.is_empty() =>
                {
                    Some(ContentKind::Packages)
                }
                _ => None,
            };
            if let Some(content) = missing {
                return Err(ManifestError::IncompleteInput {
                    pipeline: pipeline.pipeline.name.clone(),
                    content,
                });
            }
        }
    }
    Ok(())
}

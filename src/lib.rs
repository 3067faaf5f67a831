//! Manifest generation for bootable images built from bootc containers.
//!
//! Turning a container image into a disk image or an installer ISO is done by
//! an external image-assembly engine driven by a pipeline manifest. This crate
//! produces that manifest in two steps:
//!
//! - **Build** - [`builder::build`] maps a [`ManifestConfig`] (base image
//!   reference, image type, customizations) to an abstract [`Manifest`]. The
//!   pipeline topology depends only on the configuration.
//! - **Resolve** - [`resolve::resolve`] fills the manifest's content slots with
//!   externally resolved packages, containers and ostree commits, checks the
//!   content invariants, and emits the serialized manifest.
//!
//! # Architecture
//!
//! ```text
//! ManifestConfig ──► builder::build ──► Manifest (immutable)
//!                                          │
//!      PackageSets / ContainerSets /       │
//!      CommitSets (fetched elsewhere) ─────┤
//!                                          ▼
//!                                  resolve::resolve ──► manifest bytes
//!                                          │
//!                                          └──► ManifestError
//! ```
//!
//! Both steps are pure and synchronous. A manifest can be resolved any number
//! of times, concurrently, against different content.
//!
//! # Example
//!
//! ```rust
//! use bootc_image_builder::{build, ContainerSpec, ContentMaps, ManifestConfig};
//!
//! let config = ManifestConfig::new("quay.io/centos-bootc/centos-bootc:stream9", "qcow2");
//! let manifest = build(&config)?;
//!
//! let container = ContainerSpec::new("quay.io/centos-bootc/centos-bootc:stream9", "sha256:dd", "sha256:11");
//! let content = ContentMaps::new()
//!     .with_containers("build", vec![container.clone()])
//!     .with_containers("ostree-deployment", vec![container]);
//! let bytes = manifest.serialize(&content)?;
//! assert!(!bytes.is_empty());
//! # Ok::<(), bootc_image_builder::ManifestError>(())
//! ```

pub mod builder;
pub mod config;
pub mod content;
pub mod error;
pub mod manifest;
pub mod preflight;
pub mod resolve;

pub use builder::build;
pub use config::{BuildConfig, Customizations, ImageType, ManifestConfig, UserCustomization};
pub use content::{
    CommitSets, CommitSpec, ContainerSets, ContainerSpec, ContentMaps, PackageSets, PackageSpec,
};
pub use error::{ContentKind, ErrorKind, ManifestError};
pub use manifest::{ContentSlot, Manifest, Pipeline, Stage};
pub use resolve::resolve;

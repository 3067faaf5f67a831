//! Failure values produced while building and resolving manifests.
//!
//! Every failure aborts the whole build or resolve call. Callers tell the
//! kinds apart with [`ManifestError::kind`] and read the offending pipeline,
//! package or image type from the variant fields.

use std::fmt;
use thiserror::Error;

/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

/// What kind of content list was missing when a slot required it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Packages,
    Containers,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Packages => write!(f, "packages"),
            ContentKind::Containers => write!(f, "containers"),
        }
    }
}

/// Coarse classification of a [`ManifestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed top-level configuration.
    Config,
    /// A base-image source slot saw the wrong number of commits/containers.
    Cardinality,
    /// A slot accepting several source kinds found none of them.
    MissingSource,
    /// A named item was absent from the supplied content.
    NotFound,
    /// A required content list was empty or absent.
    IncompleteInput,
    /// The resolved document could not be encoded.
    Emit,
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no base image defined")]
    NoBaseImage,

    #[error("unsupported image type {image_type:?}")]
    UnsupportedImageType { image_type: String },

    #[error(
        "pipeline {pipeline} requires exactly one ostree commit or one container (have commits: {commits}; containers: {containers})"
    )]
    Cardinality {
        pipeline: String,
        commits: usize,
        containers: usize,
    },

    #[error("missing ostree, container, or ospipeline parameters in ISO tree pipeline {pipeline}")]
    MissingSource { pipeline: String },

    #[error("package {package:?} not found in the PackageSpec list for pipeline {pipeline}")]
    PackageNotFound { package: String, pipeline: String },

    #[error("serialization not started: pipeline {pipeline} has no {content}")]
    IncompleteInput {
        pipeline: String,
        content: ContentKind,
    },

    #[error("encoding manifest: {0}")]
    Emit(#[from] serde_json::Error),
}

impl ManifestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManifestError::NoBaseImage | ManifestError::UnsupportedImageType { .. } => {
                ErrorKind::Config
            }
            ManifestError::Cardinality { .. } => ErrorKind::Cardinality,
            ManifestError::MissingSource { .. } => ErrorKind::MissingSource,
            ManifestError::PackageNotFound { .. } => ErrorKind::NotFound,
            ManifestError::IncompleteInput { .. } => ErrorKind::IncompleteInput,
            ManifestError::Emit(_) => ErrorKind::Emit,
        }
    }

    /// Pipeline the failure was detected in, if it is tied to one.
    pub fn pipeline(&self) -> Option<&str> {
        match self {
            ManifestError::Cardinality { pipeline, .. }
            | ManifestError::MissingSource { pipeline }
            | ManifestError::PackageNotFound { pipeline, .. }
            | ManifestError::IncompleteInput { pipeline, .. } => Some(pipeline),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_share_kind() {
        assert_eq!(ManifestError::NoBaseImage.kind(), ErrorKind::Config);
        let err = ManifestError::UnsupportedImageType {
            image_type: "bad".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.to_string(), "unsupported image type \"bad\"");
        assert_eq!(err.pipeline(), None);
    }

    #[test]
    fn test_cardinality_message_reports_counts() {
        let err = ManifestError::Cardinality {
            pipeline: "ostree-deployment".into(),
            commits: 0,
            containers: 0,
        };
        assert_eq!(
            err.to_string(),
            "pipeline ostree-deployment requires exactly one ostree commit or one container (have commits: 0; containers: 0)"
        );
        assert_eq!(err.pipeline(), Some("ostree-deployment"));
    }

    #[test]
    fn test_not_found_names_package() {
        let err = ManifestError::PackageNotFound {
            package: "kernel".into(),
            pipeline: "anaconda-tree".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("package \"kernel\" not found"));
    }

    #[test]
    fn test_incomplete_input_is_distinct_from_not_found() {
        let err = ManifestError::IncompleteInput {
            pipeline: "build".into(),
            content: ContentKind::Packages,
        };
        assert_eq!(err.kind(), ErrorKind::IncompleteInput);
        assert_eq!(
            err.to_string(),
            "serialization not started: pipeline build has no packages"
        );
    }
}

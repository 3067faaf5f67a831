//! Host capability checks run before a build.
//!
//! Writing an image into an output directory needs the builder to hand the
//! files back to the invoking user. [`can_chown_in_path`] answers whether
//! that works in a given directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use bootc_image_builder::preflight::{can_chown_in_path, ProcessIdentity};
//! use std::path::Path;
//!
//! if !can_chown_in_path(Path::new("/output"), &ProcessIdentity).unwrap() {
//!     eprintln!("output files will stay owned by the build user");
//! }
//! ```

use std::io;
use std::os::unix::fs::fchown;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Supplies the uid ownership changes are attempted for.
pub trait IdentityProvider {
    fn current_uid(&self) -> u32;
}

/// The real uid of this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIdentity;

impl IdentityProvider for ProcessIdentity {
    fn current_uid(&self) -> u32 {
        // SAFETY: getuid has no preconditions and cannot fail.
        unsafe { libc::getuid() }
    }
}

/// A fixed uid, for callers that already know who they build for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIdentity(pub u32);

impl IdentityProvider for FixedIdentity {
    fn current_uid(&self) -> u32 {
        self.0
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{}: no such file or directory", path.display())]
    PathNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("probing ownership changes in {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Check whether files created in `dir` can be handed to the uid from
/// `identity`.
///
/// Returns `Ok(false)` when the change is refused for lack of privilege.
/// The probe file is removed before returning.
pub fn can_chown_in_path(dir: &Path, identity: &dyn IdentityProvider) -> Result<bool, ProbeError> {
    let probe = tempfile::Builder::new()
        .prefix(".can-chown-")
        .tempfile_in(dir)
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ProbeError::PathNotFound {
                path: dir.to_path_buf(),
                source,
            },
            _ => ProbeError::Io {
                path: dir.to_path_buf(),
                source,
            },
        })?;

    let uid = identity.current_uid();
    let result = fchown(probe.as_file(), Some(uid), None);
    let removed = probe.close();

    let can_chown = match result {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => false,
        Err(source) => {
            return Err(ProbeError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    removed.map_err(|source| ProbeError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    tracing::debug!(dir = %dir.display(), uid, can_chown, "probed ownership change");
    Ok(can_chown)
}

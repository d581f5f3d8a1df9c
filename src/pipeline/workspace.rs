//! Per-run scratch directory with guaranteed removal.
//!
//! A [`Workspace`] owns one uniquely-named directory for exactly one run. The
//! render backend writes into it, the pairing stage reads from it, and it is
//! removed when the run ends: explicitly through [`Workspace::cleanup`] on
//! the normal and error paths, and through `Drop` if anything unwinds first.
//! Removal failures are logged and swallowed so they can never replace the
//! run's real result or error.

use crate::error::{ErrorKind, ExtractError};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "catalog-extract-";

/// Exclusively-owned temporary directory for one pipeline run.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Allocate a fresh directory under `root`, or the system temp dir.
    ///
    /// The name carries a random suffix, so concurrent runs never collide.
    pub fn create(root: Option<&Path>) -> Result<Self, ExtractError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .map_err(|source| ExtractError::WorkspaceCreateFailed { source })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|source| ExtractError::WorkspaceCreateFailed { source })?;

        let path = dir.path().to_path_buf();
        debug!("Created workspace {}", path.display());

        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True until [`Workspace::cleanup`] has run.
    pub fn is_active(&self) -> bool {
        self.dir.is_some()
    }

    /// Remove the directory and everything in it.
    ///
    /// Idempotent: calls after the first do nothing. Failures are logged.
    pub fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => debug!("Removed workspace {}", self.path.display()),
            Err(e) => match cleanup_failure(&e) {
                None => debug!("Workspace {} was already gone", self.path.display()),
                Some(kind) => warn!(
                    kind = ?kind,
                    "Failed to remove workspace {}: {} (left on disk)",
                    self.path.display(),
                    e
                ),
            },
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Classify a removal error. A directory that is already gone is not one.
fn cleanup_failure(e: &io::Error) -> Option<ErrorKind> {
    (e.kind() != io::ErrorKind::NotFound).then_some(ErrorKind::WorkspaceCleanupFailure)
}

/// Recursively remove `path`; an already-absent directory is not an error.
pub fn remove_dir_idempotent(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

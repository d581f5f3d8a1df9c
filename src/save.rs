//! Persist artifacts into a destination directory.
//!
//! Each artifact is written to `<dest>/<name>.tmp` and renamed into place, so
//! a reader never sees half an image. One artifact failing to save does not
//! stop the others; the caller gets a [`SaveSummary`] listing both.

use crate::error::{ErrorKind, ExtractError, SaveFailure};
use crate::output::Artifact;
use crate::pipeline::pairing::sanitize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of [`save_artifacts`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveSummary {
    /// Paths written, in artifact order.
    pub written: Vec<PathBuf>,
    pub failed: Vec<SaveFailure>,
}

impl SaveSummary {
    /// Some artifacts were written and some were not.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.written.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Taxonomy bucket for an incomplete save; `None` when every artifact
    /// was written. A save where nothing landed is an I/O failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        if self.is_complete() {
            None
        } else if self.is_partial() {
            Some(ErrorKind::PartialSaveFailure)
        } else {
            Some(ErrorKind::Io)
        }
    }
}

/// Write every artifact into `dest`, creating it if needed.
///
/// # Errors
/// Only when `dest` itself cannot be created. Per-file failures land in
/// [`SaveSummary::failed`].
pub async fn save_artifacts(
    artifacts: &[Artifact],
    dest: &Path,
) -> Result<SaveSummary, ExtractError> {
    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

    let mut summary = SaveSummary::default();

    for artifact in artifacts {
        let file_name = safe_file_name(&artifact.name);
        let path = dest.join(&file_name);

        match write_atomic(&path, &artifact.data).await {
            Ok(()) => {
                debug!("Saved {} ({} bytes)", path.display(), artifact.data.len());
                summary.written.push(path);
            }
            Err(e) => {
                warn!("Failed to save {}: {}", path.display(), e);
                summary.failed.push(SaveFailure {
                    name: file_name,
                    detail: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

/// Re-sanitise the stem. The extension keeps only ASCII alphanumerics, so
/// nothing after the last `.` can introduce a path separator.
fn safe_file_name(name: &str) -> String {
    if let Some((stem, ext)) = name.rsplit_once('.') {
        let ext: String = ext.chars().filter(char::is_ascii_alphanumeric).collect();
        if !stem.is_empty() && !ext.is_empty() {
            return format!("{}.{}", sanitize(stem), ext);
        }
    }
    sanitize(name)
}

async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, data).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

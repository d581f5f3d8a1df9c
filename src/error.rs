//! Error types for the catalog-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Fatal**: the run cannot produce a result (missing
//!   input, no renderer reachable, renderer crashed, nothing paired).
//!   Returned as `Err(ExtractError)` from [`crate::extract::Extractor::run`].
//!
//! * [`SaveFailure`]: **Non-fatal**: a single artifact could not be written
//!   by the save step. Collected into [`crate::save::SaveSummary`] so one
//!   bad file never aborts the remaining writes.
//!
//! Every fatal error maps onto a coarse [`ErrorKind`] so callers (a UI status
//! line, a JSON consumer) can tell configuration problems from content
//! problems from transient I/O without matching on every variant.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the catalog-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Source document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The text source could not open or parse the document.
    #[error("Document '{path}' could not be read: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// No text source or render strategy could be resolved.
    #[error(
        "No {what} is available:\n{reasons}\n\n\
Point --pdfium-lib (PDFIUM_LIB_PATH) at libpdfium, install poppler-utils \
(pdftoppm, pdfimages, pdftotext), or configure a remote rendering endpoint."
    )]
    BackendUnavailable { what: String, reasons: String },

    /// The selected backend ran but failed.
    #[error("{backend} renderer failed: {detail}")]
    RenderFailed { backend: String, detail: String },

    /// The selected backend did not finish within its wall-clock ceiling.
    #[error("{backend} renderer timed out after {secs}s\nIncrease the timeout or render fewer pages.")]
    RenderTimeout { backend: String, secs: u64 },

    // ── Pairing errors ────────────────────────────────────────────────────
    /// Labels were found but no rendered image could be paired with them.
    #[error(
        "Found {labels} labels but no artifacts matched ({files} rendered files).\n\
The renderer output probably does not fit this document; try --target images or --target pages."
    )]
    NoArtifactsMatched { labels: usize, files: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The temporary workspace directory could not be created.
    #[error("Failed to create workspace directory: {source}")]
    WorkspaceCreateFailed {
        #[source]
        source: std::io::Error,
    },

    /// Rendered files could not be listed or read back.
    #[error("Failed to read rendered output '{path}': {source}")]
    PairingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination directory for saved artifacts could not be created.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error taxonomy reported to callers alongside the detail string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Source path missing, unreadable, or not a document.
    InputNotFound,
    /// No render strategy (or text source) could be resolved.
    BackendUnavailable,
    /// The selected backend executed but failed or timed out.
    RenderFailed,
    /// Labels were found but pairing produced zero artifacts.
    NoArtifactsMatched,
    /// Some, but not all, artifacts were written by the save step.
    PartialSaveFailure,
    /// The workspace could not be removed. Logged, never returned by a run.
    WorkspaceCleanupFailure,
    /// Transient filesystem problem.
    Io,
    /// Rejected configuration.
    InvalidConfig,
    /// Bug or task panic.
    Internal,
}

impl ExtractError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::FileNotFound { .. }
            | ExtractError::PermissionDenied { .. }
            | ExtractError::NotAPdf { .. }
            | ExtractError::CorruptDocument { .. } => ErrorKind::InputNotFound,
            ExtractError::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            ExtractError::RenderFailed { .. } | ExtractError::RenderTimeout { .. } => {
                ErrorKind::RenderFailed
            }
            ExtractError::NoArtifactsMatched { .. } => ErrorKind::NoArtifactsMatched,
            ExtractError::WorkspaceCreateFailed { .. }
            | ExtractError::PairingIo { .. }
            | ExtractError::OutputWriteFailed { .. } => ErrorKind::Io,
            ExtractError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ExtractError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Structured form for transport to a UI tier or a JSON consumer.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            detail: self.to_string(),
        }
    }
}

/// A serialisable `{ kind, detail }` pair describing a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub detail: String,
}

/// A non-fatal failure writing one artifact to the destination directory.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("Could not write '{name}': {detail}")]
pub struct SaveFailure {
    /// The artifact name as it would have appeared on disk.
    pub name: String,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_share_a_kind() {
        let missing = ExtractError::FileNotFound {
            path: PathBuf::from("/nope.pdf"),
        };
        let not_pdf = ExtractError::NotAPdf {
            path: PathBuf::from("/x.txt"),
            magic: *b"abcd",
        };
        assert_eq!(missing.kind(), ErrorKind::InputNotFound);
        assert_eq!(not_pdf.kind(), ErrorKind::InputNotFound);
    }

    #[test]
    fn render_timeout_is_a_render_failure() {
        let e = ExtractError::RenderTimeout {
            backend: "process".into(),
            secs: 30,
        };
        assert_eq!(e.kind(), ErrorKind::RenderFailed);
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn render_failed_carries_diagnostic() {
        let e = ExtractError::RenderFailed {
            backend: "process".into(),
            detail: "Syntax Error: Couldn't find trailer dictionary".into(),
        };
        let report = e.report();
        assert_eq!(report.kind, ErrorKind::RenderFailed);
        assert!(report.detail.contains("trailer dictionary"));
    }

    #[test]
    fn no_artifacts_matched_display() {
        let e = ExtractError::NoArtifactsMatched {
            labels: 4,
            files: 0,
        };
        assert!(e.to_string().contains("4 labels"));
        assert_eq!(e.kind(), ErrorKind::NoArtifactsMatched);
    }

    #[test]
    fn report_serialises_kind_in_snake_case() {
        let e = ExtractError::BackendUnavailable {
            what: "render backend".into(),
            reasons: "  library: not found".into(),
        };
        let json = serde_json::to_string(&e.report()).unwrap();
        assert!(json.contains("\"kind\":\"backend_unavailable\""), "got: {json}");
    }

    #[test]
    fn save_failure_display() {
        let f = SaveFailure {
            name: "1998.5.12a Bowl.png".into(),
            detail: "disk full".into(),
        };
        assert!(f.to_string().contains("1998.5.12a Bowl.png"));
        assert!(f.to_string().contains("disk full"));
    }
}

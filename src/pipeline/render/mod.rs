//! Render backends: turn a source document into image files in a workspace.
//!
//! Three interchangeable strategies implement [`RenderBackend`]:
//!
//! | Strategy | Engine | Module |
//! |----------|--------|--------|
//! | `library` | pdfium via `pdfium-render`, in process | [`library`] |
//! | `process` | poppler `pdftoppm` / `pdfimages`, spawned | [`process`] |
//! | `remote`  | HTTP document-processing service | [`remote`] |
//!
//! [`resolve_backend`] probes them in the configured order and returns the
//! first that is *available*. Fallback happens only on unavailability: once
//! a strategy is chosen its render errors are returned as-is, so a broken
//! renderer is reported instead of being papered over by a different one.
//!
//! Output naming is strategy-specific. The pairing stage only relies on the
//! natural sort order of the file names.

pub mod library;
pub mod process;
pub mod remote;

use crate::config::{BackendKind, RenderTarget, RendererConfig};
use crate::error::ExtractError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a backend needs for one render call.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub source: &'a Path,
    /// Directory to write into. Owned by the run; nothing else writes here.
    pub workspace: &'a Path,
    /// 1-based inclusive page range.
    pub first_page: usize,
    pub last_page: usize,
    /// Pages in the whole document.
    pub page_count: usize,
    pub target: RenderTarget,
    pub dpi: u32,
    pub max_rendered_pixels: u32,
}

impl RenderRequest<'_> {
    /// True when the range spans every page of the document.
    pub fn covers_whole_document(&self) -> bool {
        self.first_page == 1 && self.last_page >= self.page_count
    }
}

/// What a finished render call reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    pub files_written: usize,
}

/// A rendering strategy.
///
/// `render` resolves only after every output file is written and closed, and
/// never waits past the strategy's wall-clock ceiling.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn render(&self, request: &RenderRequest<'_>) -> Result<RenderOutcome, ExtractError>;
}

/// Result of checking whether a strategy can run here.
pub enum Probe<T> {
    Ready(T),
    /// Not an error: the next strategy is tried.
    Unavailable(String),
}

/// Pick the first available strategy in `config.backend_order`.
///
/// `whole_document` is false when the run selected a subset of pages;
/// strategies that cannot honour a page range are then skipped.
pub fn resolve_backend(
    config: &RendererConfig,
    target: RenderTarget,
    whole_document: bool,
) -> Result<Arc<dyn RenderBackend>, ExtractError> {
    let mut reasons = Vec::new();

    for &kind in &config.backend_order {
        let probe = match kind {
            BackendKind::Library => library::PdfiumBackend::probe(config),
            BackendKind::Process => process::PopplerBackend::probe(config, target),
            BackendKind::Remote => remote::RemoteBackend::probe(config, target, whole_document),
        };

        match probe {
            Probe::Ready(backend) => {
                info!("Using {} render backend", kind);
                return Ok(backend);
            }
            Probe::Unavailable(reason) => {
                debug!("{} render backend unavailable: {}", kind, reason);
                reasons.push(format!("  • {kind}: {reason}"));
            }
        }
    }

    Err(ExtractError::BackendUnavailable {
        what: "render backend".into(),
        reasons: reasons.join("\n"),
    })
}

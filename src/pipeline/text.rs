//! Document text extraction, one string per page.
//!
//! Two sources implement [`TextSource`], tried in this order by
//! [`resolve_text_source`]:
//!
//! 1. [`PdfiumTextSource`]: pdfium's text layer, in process.
//! 2. [`PdftotextSource`]: poppler's `pdftotext`, with pages split on the
//!    form feed it emits after each page.
//!
//! The page count reported here drives page selection for the render stage.

use crate::config::RendererConfig;
use crate::error::ExtractError;
use crate::pipeline::render::library::{bind_pdfium, probe_pdfium, PdfiumLocation};
use crate::pipeline::render::process::{find_executable, run_tool};
use crate::pipeline::render::Probe;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Text of a document, indexed by page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentText {
    pages: Vec<String>,
}

impl DocumentText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// Text of pages `first..=last` (1-based), joined by newlines.
    ///
    /// Out-of-range pages contribute nothing.
    pub fn text_for(&self, first: usize, last: usize) -> String {
        if first == 0 || first > last {
            return String::new();
        }
        let end = last.min(self.pages.len());
        if first > end {
            return String::new();
        }
        self.pages[first - 1..end].join("\n")
    }
}

/// Something that can read a document's text layer.
#[async_trait]
pub trait TextSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn read(&self, source: &Path) -> Result<DocumentText, ExtractError>;
}

/// Text via pdfium's per-page text layer.
#[derive(Debug)]
pub struct PdfiumTextSource {
    location: PdfiumLocation,
}

impl PdfiumTextSource {
    pub fn new(location: PdfiumLocation) -> Self {
        Self { location }
    }
}

#[async_trait]
impl TextSource for PdfiumTextSource {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    async fn read(&self, source: &Path) -> Result<DocumentText, ExtractError> {
        let location = self.location.clone();
        let path = source.to_path_buf();

        tokio::task::spawn_blocking(move || read_with_pdfium(&location, &path))
            .await
            .map_err(|e| ExtractError::Internal(format!("Text task panicked: {}", e)))?
    }
}

fn read_with_pdfium(location: &PdfiumLocation, path: &Path) -> Result<DocumentText, ExtractError> {
    let corrupt = |detail: String| ExtractError::CorruptDocument {
        path: path.to_path_buf(),
        detail,
    };

    let pdfium = bind_pdfium(location).map_err(|reason| ExtractError::BackendUnavailable {
        what: "text source".into(),
        reasons: format!("  • pdfium: {reason}"),
    })?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| corrupt(format!("{:?}", e)))?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| corrupt(format!("page {}: {:?}", idx + 1, e)))?;
        pages.push(text.all());
    }

    debug!("pdfium read text of {} pages", pages.len());
    Ok(DocumentText::new(pages))
}

/// Text via poppler's `pdftotext`.
#[derive(Debug)]
pub struct PdftotextSource {
    executable: PathBuf,
    timeout: Duration,
}

impl PdftotextSource {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TextSource for PdftotextSource {
    fn name(&self) -> &'static str {
        "pdftotext"
    }

    async fn read(&self, source: &Path) -> Result<DocumentText, ExtractError> {
        let args = [
            std::ffi::OsStr::new("-enc"),
            std::ffi::OsStr::new("UTF-8"),
            source.as_os_str(),
            std::ffi::OsStr::new("-"),
        ];

        let output = run_tool("pdftotext", &self.executable, &args, self.timeout)
            .await
            .map_err(|e| match e {
                ExtractError::RenderFailed { detail, .. } => ExtractError::CorruptDocument {
                    path: source.to_path_buf(),
                    detail,
                },
                other => other,
            })?;

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(split_pages(&text))
    }
}

/// Split `pdftotext` output on form feeds. The trailing feed after the last
/// page does not start another page.
pub fn split_pages(text: &str) -> DocumentText {
    let mut pages: Vec<String> = text.split('\x0c').map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    DocumentText::new(pages)
}

/// Pick the first usable text source: pdfium, then `pdftotext`.
pub fn resolve_text_source(config: &RendererConfig) -> Result<Arc<dyn TextSource>, ExtractError> {
    let mut reasons = Vec::new();

    match probe_pdfium(config.pdfium_library.as_deref()) {
        Probe::Ready(location) => {
            info!("Reading text with pdfium");
            return Ok(Arc::new(PdfiumTextSource::new(location)));
        }
        Probe::Unavailable(reason) => reasons.push(format!("  • pdfium: {reason}")),
    }

    match find_executable("pdftotext", config.poppler_dir.as_deref()) {
        Some(executable) => {
            info!("Reading text with {}", executable.display());
            return Ok(Arc::new(PdftotextSource::new(
                executable,
                Duration::from_secs(config.process_timeout_secs),
            )));
        }
        None => reasons.push("  • pdftotext: not found".to_string()),
    }

    Err(ExtractError::BackendUnavailable {
        what: "text source".into(),
        reasons: reasons.join("\n"),
    })
}

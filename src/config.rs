//! Configuration types for a catalog extraction run.
//!
//! All run behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Renderer locations (the pdfium library, the
//! poppler executables, the remote endpoint and its credentials) live in
//! [`RendererConfig`] and are resolved once by the caller, typically from CLI
//! flags or environment variables, then passed down. Nothing below this
//! module reads ambient process state to find a renderer.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use catalog_extract::{BackendKind, ExtractionConfig, RenderTarget};
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .target(RenderTarget::EmbeddedImages)
///     .backend_order(vec![BackendKind::Process])
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
/// Largest accepted `max_rendered_pixels`. A 20 000 px square RGBA render
/// is already 1.6 GB.
pub const MAX_RENDERED_PIXELS_LIMIT: u32 = 20_000;

#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI for page renders. Range: 72–600. Default: 150.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels for the
    /// in-process renderer. Range: 100–[`MAX_RENDERED_PIXELS_LIMIT`].
    /// Default: 2000.
    ///
    /// Caps either dimension regardless of DPI so an oversized page (a poster
    /// scanned into a catalog) cannot exhaust memory.
    pub max_rendered_pixels: u32,

    /// Which pages to extract labels from and render. Default: all.
    pub pages: PageSelection,

    /// Whether to render whole pages or the pictures embedded in them.
    /// Default: [`RenderTarget::Pages`].
    pub target: RenderTarget,

    /// Where to find the rendering engines, and in which order to try them.
    pub renderer: RendererConfig,

    /// Parent directory for the per-run workspace. Default: system temp dir.
    pub workspace_root: Option<PathBuf>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            pages: PageSelection::default(),
            target: RenderTarget::default(),
            renderer: RendererConfig::default(),
            workspace_root: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pages", &self.pages)
            .field("target", &self.target)
            .field("renderer", &self.renderer)
            .field("workspace_root", &self.workspace_root)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn target(mut self, target: RenderTarget) -> Self {
        self.config.target = target;
        self
    }

    pub fn backend_order(mut self, order: Vec<BackendKind>) -> Self {
        self.config.renderer.backend_order = order;
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.renderer.pdfium_library = Some(path.into());
        self
    }

    pub fn poppler_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.renderer.poppler_dir = Some(dir.into());
        self
    }

    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.config.renderer.remote = Some(remote);
        self
    }

    pub fn process_timeout_secs(mut self, secs: u64) -> Self {
        self.config.renderer.process_timeout_secs = secs;
        self
    }

    pub fn remote_timeout_secs(mut self, secs: u64) -> Self {
        self.config.renderer.remote_timeout_secs = secs;
        self
    }

    pub fn workspace_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_rendered_pixels < 100 || c.max_rendered_pixels > MAX_RENDERED_PIXELS_LIMIT {
            return Err(ExtractError::InvalidConfig(format!(
                "max_rendered_pixels must be 100–{}, got {}",
                MAX_RENDERED_PIXELS_LIMIT, c.max_rendered_pixels
            )));
        }
        if c.renderer.backend_order.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "At least one render backend must be enabled".into(),
            ));
        }
        if c.renderer.process_timeout_secs == 0 || c.renderer.remote_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "Renderer timeouts must be ≥ 1 second".into(),
            ));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || start > end {
                return Err(ExtractError::InvalidConfig(format!(
                    "Invalid page range {start}-{end}"
                )));
            }
        }
        if let PageSelection::Single(0) = c.pages {
            return Err(ExtractError::InvalidConfig(
                "Pages are 1-indexed, minimum is 1".into(),
            ));
        }
        if let Some(ref remote) = c.renderer.remote {
            if !remote.endpoint.starts_with("http://") && !remote.endpoint.starts_with("https://")
            {
                return Err(ExtractError::InvalidConfig(format!(
                    "Remote endpoint must be an HTTP(S) URL, got '{}'",
                    remote.endpoint
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Renderer configuration ───────────────────────────────────────────────

/// The three interchangeable rendering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process pdfium binding.
    Library,
    /// Spawned poppler executable (`pdftoppm` / `pdfimages`).
    Process,
    /// Remote document-processing service.
    Remote,
}

impl BackendKind {
    /// The default preference order.
    pub const ALL: [BackendKind; 3] = [BackendKind::Library, BackendKind::Process, BackendKind::Remote];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Library => "library",
            BackendKind::Process => "process",
            BackendKind::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renderer locations and limits, resolved once at startup.
#[derive(Clone)]
pub struct RendererConfig {
    /// Strategies to probe, in order. Default: library, process, remote.
    pub backend_order: Vec<BackendKind>,

    /// Path to libpdfium (file) or to the directory holding it.
    /// If `None`, the system library search path is used.
    pub pdfium_library: Option<PathBuf>,

    /// Directory holding the poppler executables.
    /// If `None`, `PATH` is searched.
    pub poppler_dir: Option<PathBuf>,

    /// Remote service settings. The remote strategy is unavailable without them.
    pub remote: Option<RemoteConfig>,

    /// Wall-clock ceiling for one spawned renderer process. Default: 300.
    pub process_timeout_secs: u64,

    /// Wall-clock ceiling for the whole remote exchange. Default: 600.
    pub remote_timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend_order: BackendKind::ALL.to_vec(),
            pdfium_library: None,
            poppler_dir: None,
            remote: None,
            process_timeout_secs: 300,
            remote_timeout_secs: 600,
        }
    }
}

impl fmt::Debug for RendererConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererConfig")
            .field("backend_order", &self.backend_order)
            .field("pdfium_library", &self.pdfium_library)
            .field("poppler_dir", &self.poppler_dir)
            .field("remote", &self.remote)
            .field("process_timeout_secs", &self.process_timeout_secs)
            .field("remote_timeout_secs", &self.remote_timeout_secs)
            .finish()
    }
}

/// Connection settings for the remote document-processing service.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Base URL, e.g. `https://render.example.com/v1`.
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    /// Delay between job status polls in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,
}

impl RemoteConfig {
    pub fn new(
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            poll_interval_ms: 2000,
        }
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms.max(1);
        self
    }

    /// True when every credential needed to authenticate is present.
    pub fn has_credentials(&self) -> bool {
        !self.endpoint.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What a render backend turns into image files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTarget {
    /// One image per page. (default)
    #[default]
    Pages,
    /// One image per picture embedded in the selected pages.
    EmbeddedImages,
}

/// Specifies which pages of the document take part in a run.
///
/// Renderers accept a contiguous range, so selections are contiguous too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
}

impl PageSelection {
    /// Clip the selection to the document, returning a 1-based inclusive
    /// `(first, last)` range, or `None` when nothing is left.
    pub fn bounds(&self, total_pages: usize) -> Option<(usize, usize)> {
        let (first, last) = match *self {
            PageSelection::All => (1, total_pages),
            PageSelection::Single(p) => (p, p),
            PageSelection::Range(start, end) => (start.max(1), end.min(total_pages)),
        };
        if first == 0 || first > last || last > total_pages {
            None
        } else {
            Some((first, last))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let config = ExtractionConfig::builder().build().expect("defaults are valid");
        assert_eq!(config.dpi, 150);
        assert_eq!(config.renderer.backend_order, BackendKind::ALL.to_vec());
        assert_eq!(config.target, RenderTarget::Pages);
    }

    #[test]
    fn dpi_out_of_range_is_rejected() {
        let err = ExtractionConfig::builder().dpi(20).build().unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn max_rendered_pixels_is_bounded_both_ways() {
        for px in [99, MAX_RENDERED_PIXELS_LIMIT + 1, u32::MAX] {
            let err = ExtractionConfig::builder()
                .max_rendered_pixels(px)
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("max_rendered_pixels"), "px={px}: {err}");
        }
        assert!(ExtractionConfig::builder()
            .max_rendered_pixels(MAX_RENDERED_PIXELS_LIMIT)
            .build()
            .is_ok());
    }

    #[test]
    fn empty_backend_order_is_rejected() {
        let err = ExtractionConfig::builder()
            .backend_order(vec![])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("backend"));
    }

    #[test]
    fn remote_endpoint_must_be_http() {
        let err = ExtractionConfig::builder()
            .remote(RemoteConfig::new("ftp://x", "id", "secret"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn remote_secret_is_redacted_in_debug() {
        let remote = RemoteConfig::new("https://render.example.com/v1/", "id", "s3cr3t");
        let dbg = format!("{remote:?}");
        assert!(!dbg.contains("s3cr3t"));
        assert_eq!(remote.endpoint, "https://render.example.com/v1");
    }

    #[test]
    fn page_selection_bounds() {
        assert_eq!(PageSelection::All.bounds(5), Some((1, 5)));
        assert_eq!(PageSelection::All.bounds(0), None);
        assert_eq!(PageSelection::Single(3).bounds(5), Some((3, 3)));
        assert_eq!(PageSelection::Single(6).bounds(5), None);
        assert_eq!(PageSelection::Range(2, 10).bounds(4), Some((2, 4)));
        assert_eq!(PageSelection::Range(5, 9).bounds(4), None);
    }
}

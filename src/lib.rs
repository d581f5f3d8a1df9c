//! # catalog-extract
//!
//! Pull labelled images out of catalog-style PDF documents.
//!
//! ## Why this crate?
//!
//! Museum and collection catalogs print an accession number and a short
//! description next to every object photograph. This crate finds those
//! labels in the text layer, renders the pages (or the embedded pictures)
//! to image files, and pairs the i-th label with the i-th image, producing
//! one named artifact per catalog entry.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     check the path and the %PDF magic
//!  ├─ 2. Text      per-page text via pdfium or pdftotext
//!  ├─ 3. Labels    accession-number regex, de-duplicated in order
//!  ├─ 4. Render    pdfium in process │ poppler processes │ remote service
//!  ├─ 5. Pair      natural-sorted files zipped with labels
//!  └─ 6. Output    artifacts + counts (workspace removed on every path)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use catalog_extract::{extract, ExtractionConfig, RenderTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .target(RenderTarget::EmbeddedImages)
//!         .build()?;
//!     let result = extract("catalog.pdf", &config).await?;
//!     for artifact in &result.artifacts {
//!         println!("{} ({} bytes)", artifact.name, artifact.data.len());
//!     }
//!     eprintln!(
//!         "{} labels, {} files, {} paired",
//!         result.counts.labels_found, result.counts.files_rendered, result.counts.paired
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `catalog-extract` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! catalog-extract = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Backend
//!
//! | Backend | Needs | Targets |
//! |---------|-------|---------|
//! | `library` | libpdfium (system path or `pdfium_library`) | pages, images |
//! | `process` | poppler-utils (`pdftoppm`, `pdfimages`) | pages, images |
//! | `remote`  | endpoint + client credentials | images |
//!
//! The default order is library, process, remote; the first one available
//! on the host is used.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod save;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    BackendKind, ExtractionConfig, ExtractionConfigBuilder, PageSelection, RemoteConfig,
    RenderTarget, RendererConfig,
};
pub use error::{ErrorKind, ErrorReport, ExtractError, SaveFailure};
pub use extract::{extract, extract_sync, extract_to_dir, Extractor, RunTracker};
pub use output::{Artifact, PipelineResult, RunCounts, RunStats};
pub use pipeline::render::{RenderBackend, RenderOutcome, RenderRequest};
pub use pipeline::text::{DocumentText, TextSource};
pub use progress::{
    ChannelProgress, ExtractionProgressCallback, NoopProgressCallback, PipelineStage,
    ProgressCallback, ProgressEvent,
};
pub use save::{save_artifacts, SaveSummary};

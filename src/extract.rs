//! Run orchestration: validate → extract text → render → pair.
//!
//! An [`Extractor`] holds immutable configuration plus optional injected
//! strategies and can serve any number of independent runs. Every run gets
//! its own [`Workspace`], so concurrent runs never share state.
//!
//! ## Why a tracker?
//!
//! The stages form a strict sequence with a single failure exit. Routing
//! every transition through [`RunTracker`] keeps progress events and log
//! lines in step with the real state, and turns an out-of-order transition
//! into an [`ExtractError::Internal`] instead of a silent misreport.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{PipelineResult, RunCounts, RunStats};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::render::{resolve_backend, RenderBackend, RenderRequest};
use crate::pipeline::text::{resolve_text_source, TextSource};
use crate::pipeline::workspace::Workspace;
use crate::pipeline::{labels, pairing};
use crate::progress::{PipelineStage, ProgressCallback};
use crate::save::{self, SaveSummary};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Enforces the stage order of one run and reports each transition.
pub struct RunTracker {
    stage: PipelineStage,
    callback: Option<ProgressCallback>,
}

impl RunTracker {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            stage: PipelineStage::Idle,
            callback,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Move to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: PipelineStage, message: &str) -> Result<(), ExtractError> {
        if !self.stage.can_transition_to(next) {
            return Err(ExtractError::Internal(format!(
                "illegal pipeline transition {} → {}",
                self.stage, next
            )));
        }
        self.stage = next;
        info!("[{}] {}", next, message);
        if let Some(ref cb) = self.callback {
            cb.on_stage(next, message);
        }
        Ok(())
    }

    /// Enter `Failed`. No-op once the run is already terminal.
    pub fn fail(&mut self, message: &str) {
        if self.stage.is_terminal() {
            return;
        }
        debug!("Run failed during {}", self.stage);
        self.stage = PipelineStage::Failed;
        if let Some(ref cb) = self.callback {
            cb.on_stage(PipelineStage::Failed, message);
        }
    }
}

/// Runs the extraction pipeline.
///
/// Strategies are resolved per run unless injected. Injection is how tests
/// (and callers with their own renderer) bypass probing.
#[derive(Clone)]
pub struct Extractor {
    config: ExtractionConfig,
    backend: Option<Arc<dyn RenderBackend>>,
    text_source: Option<Arc<dyn TextSource>>,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            backend: None,
            text_source: None,
        }
    }

    /// Use `backend` for every run instead of probing.
    pub fn with_backend(mut self, backend: Arc<dyn RenderBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use `source` for every run instead of probing.
    pub fn with_text_source(mut self, source: Arc<dyn TextSource>) -> Self {
        self.text_source = Some(source);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run the pipeline once on the document at `path`.
    ///
    /// # Errors
    /// Any fatal error from any stage. The workspace is removed on every
    /// path before this returns.
    pub async fn run(&self, path: impl AsRef<Path>) -> Result<PipelineResult, ExtractError> {
        let path = path.as_ref();
        let started = Instant::now();
        let mut tracker = RunTracker::new(self.config.progress_callback.clone());

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(&path.display().to_string());
        }

        match self.run_stages(path, &mut tracker, started).await {
            Ok(result) => {
                let message = format!(
                    "{} artifacts from {} labels in {}ms",
                    result.counts.paired, result.counts.labels_found, result.stats.total_duration_ms
                );
                tracker.advance(PipelineStage::Completed, &message)?;
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_run_complete(result.counts.labels_found, result.counts.paired);
                }
                Ok(result)
            }
            Err(e) => {
                warn!("Extraction failed: {}", e);
                tracker.fail(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        path: &Path,
        tracker: &mut RunTracker,
        started: Instant,
    ) -> Result<PipelineResult, ExtractError> {
        tracker.advance(
            PipelineStage::ValidatingInput,
            &format!("Validating {}", path.display()),
        )?;
        let document = input::validate_source(path)?;

        let mut workspace = Workspace::create(self.config.workspace_root.as_deref())?;
        let result = self
            .run_in_workspace(&document, &workspace, tracker, started)
            .await;
        // Drop would do this too; doing it here keeps removal ahead of the
        // terminal progress event.
        workspace.cleanup();
        result
    }

    async fn run_in_workspace(
        &self,
        document: &SourceDocument,
        workspace: &Workspace,
        tracker: &mut RunTracker,
        started: Instant,
    ) -> Result<PipelineResult, ExtractError> {
        // ── Extracting ───────────────────────────────────────────────────
        tracker.advance(PipelineStage::Extracting, "Reading document text")?;
        let text_source = match &self.text_source {
            Some(source) => Arc::clone(source),
            None => resolve_text_source(&self.config.renderer)?,
        };
        let text = text_source.read(document.path()).await?;
        let page_count = text.page_count();

        let (first_page, last_page) = self.config.pages.bounds(page_count).ok_or_else(|| {
            ExtractError::InvalidConfig(format!(
                "page selection {:?} does not fit a {}-page document",
                self.config.pages, page_count
            ))
        })?;

        let labels = labels::extract_labels(&text.text_for(first_page, last_page));
        info!(
            "Found {} labels on pages {}-{} of {} ({})",
            labels.len(),
            first_page,
            last_page,
            page_count,
            text_source.name()
        );

        // ── Rendering ────────────────────────────────────────────────────
        let backend = match &self.backend {
            Some(backend) => Arc::clone(backend),
            None => resolve_backend(
                &self.config.renderer,
                self.config.target,
                first_page == 1 && last_page >= page_count,
            )?,
        };
        tracker.advance(
            PipelineStage::Rendering,
            &format!("Rendering pages {}-{} with {}", first_page, last_page, backend.kind()),
        )?;

        let request = RenderRequest {
            source: document.path(),
            workspace: workspace.path(),
            first_page,
            last_page,
            page_count,
            target: self.config.target,
            dpi: self.config.dpi,
            max_rendered_pixels: self.config.max_rendered_pixels,
        };
        let render_start = Instant::now();
        let outcome = backend.render(&request).await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        debug!(
            "{} backend reported {} files in {}ms",
            backend.kind(),
            outcome.files_written,
            render_duration_ms
        );

        // ── Pairing ──────────────────────────────────────────────────────
        tracker.advance(PipelineStage::Pairing, "Pairing labels with rendered files")?;
        let dir = workspace.path().to_path_buf();
        let pair_labels = labels.clone();
        let (files_rendered, artifacts) = tokio::task::spawn_blocking(move || {
            let files = pairing::list_rendered_files(&dir)?;
            let artifacts = pairing::pair_files(&pair_labels, &files)?;
            Ok::<_, ExtractError>((files.len(), artifacts))
        })
        .await
        .map_err(|e| ExtractError::Internal(format!("Pairing task panicked: {}", e)))??;

        if artifacts.is_empty() && !labels.is_empty() {
            return Err(ExtractError::NoArtifactsMatched {
                labels: labels.len(),
                files: files_rendered,
            });
        }

        let counts = RunCounts {
            labels_found: labels.len(),
            files_rendered,
            paired: artifacts.len(),
        };
        let stats = RunStats {
            page_count,
            first_page,
            last_page,
            total_duration_ms: started.elapsed().as_millis() as u64,
            render_duration_ms,
        };

        Ok(PipelineResult {
            artifacts,
            counts,
            labels,
            backend: backend.kind(),
            stats,
        })
    }
}

/// Extract artifacts from the PDF at `path`.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(ExtractError)` for any fatal stage failure: missing or
/// non-PDF input, no usable backend, a failed render, or labels that could
/// not be paired with a single image.
pub async fn extract(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<PipelineResult, ExtractError> {
    Extractor::new(config.clone()).run(path).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<PipelineResult, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(path, config))
}

/// Extract and save every artifact into `dest`.
///
/// Individual save failures are reported in the [`SaveSummary`], not as an
/// error.
pub async fn extract_to_dir(
    path: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<(PipelineResult, SaveSummary), ExtractError> {
    let result = extract(path, config).await?;
    let summary = save::save_artifacts(&result.artifacts, dest.as_ref()).await?;
    Ok((result, summary))
}

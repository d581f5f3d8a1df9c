//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive a
//! status message at every state transition of a run. Events are advisory:
//! nothing in the pipeline depends on a callback being present or fast.
//!
//! [`ChannelProgress`] forwards the same events into a Tokio channel for
//! callers that would rather consume a stream of status lines.
//!
//! # Example
//!
//! ```rust
//! use catalog_extract::{ExtractionConfig, ExtractionProgressCallback, PipelineStage};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl ExtractionProgressCallback for PrintStages {
//!     fn on_stage(&self, stage: PipelineStage, message: &str) {
//!         eprintln!("[{stage}] {message}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// States of one pipeline run.
///
/// ```text
/// Idle → ValidatingInput → Extracting → Rendering → Pairing → Completed
///              └──────────────┴─────────────┴──────────┴──────→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    ValidatingInput,
    Extracting,
    Rendering,
    Pairing,
    Completed,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Completed | PipelineStage::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (s, Failed) => !s.is_terminal(),
            (Idle, ValidatingInput)
            | (ValidatingInput, Extracting)
            | (Extracting, Rendering)
            | (Rendering, Pairing)
            | (Pairing, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::ValidatingInput => "validating",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Rendering => "rendering",
            PipelineStage::Pairing => "pairing",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a run moves between stages.
///
/// Implementations must be `Send + Sync`: independent runs may share one
/// callback across tasks. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once when a run is requested.
    fn on_run_start(&self, source: &str) {
        let _ = source;
    }

    /// Called on every state transition with a human-readable status line.
    fn on_stage(&self, stage: PipelineStage, message: &str) {
        let _ = (stage, message);
    }

    /// Called once when a run completes successfully.
    ///
    /// # Arguments
    /// * `labels_found`: distinct labels in the selected pages
    /// * `paired`      : artifacts produced
    fn on_run_complete(&self, labels_found: usize, paired: usize) {
        let _ = (labels_found, paired);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// One status message on a progress channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub message: String,
}

/// Forwards stage events into an unbounded Tokio channel.
///
/// Send errors (receiver dropped) are ignored; progress is best-effort.
pub struct ChannelProgress {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Arc<Self> {
        Arc::new(Self { tx })
    }
}

impl ExtractionProgressCallback for ChannelProgress {
    fn on_stage(&self, stage: PipelineStage, message: &str) {
        let _ = self.tx.send(ProgressEvent {
            stage,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCallback {
        stages: AtomicUsize,
        completed: AtomicUsize,
    }

    impl ExtractionProgressCallback for CountingCallback {
        fn on_stage(&self, _stage: PipelineStage, _message: &str) {
            self.stages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _labels_found: usize, paired: usize) {
            self.completed.store(paired, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start("catalog.pdf");
        cb.on_stage(PipelineStage::Rendering, "rendering 3 pages");
        cb.on_run_complete(3, 3);
    }

    #[test]
    fn arc_dyn_callback_receives_events() {
        let counter = Arc::new(CountingCallback {
            stages: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        });
        let cb: ProgressCallback = counter.clone();
        cb.on_stage(PipelineStage::ValidatingInput, "checking");
        cb.on_stage(PipelineStage::Extracting, "reading text");
        cb.on_run_complete(2, 2);
        assert_eq!(counter.stages.load(Ordering::SeqCst), 2);
        assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn legal_transitions() {
        use PipelineStage::*;
        assert!(Idle.can_transition_to(ValidatingInput));
        assert!(Rendering.can_transition_to(Pairing));
        assert!(Extracting.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Rendering));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
    }

    #[tokio::test]
    async fn channel_progress_forwards_messages() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let cb = ChannelProgress::new(tx);
        cb.on_stage(PipelineStage::Pairing, "pairing 2 labels");
        drop(cb);

        let event = rx.recv().await.expect("one event");
        assert_eq!(event.stage, PipelineStage::Pairing);
        assert_eq!(event.message, "pairing 2 labels");
        assert!(rx.recv().await.is_none());
    }
}

//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an `Arc<dyn PipelineProgressCallback>` via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! real-time events as the run moves through its stages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a channel, a WebSocket, a database record, or a
//! terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` so a
//! single callback can serve several independent runs at once.
//!
//! The `completed_stages` argument is a monotonically increasing count out
//! of [`crate::run::TOTAL_STAGES`]; UI layers can render it directly as a
//! progress fraction alongside the stage name.

use crate::run::Stage;
use std::sync::Arc;

/// Called by the orchestrator as a run moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Within one run the calls arrive strictly in
/// pipeline order.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once when the run starts, before extraction.
    fn on_run_start(&self, total_stages: usize) {
        let _ = total_stages;
    }

    /// Called just before work on a stage begins. `stage` names the stage
    /// being attempted (the one the run will reach on success).
    fn on_stage_start(&self, stage: Stage, completed_stages: usize, total_stages: usize) {
        let _ = (stage, completed_stages, total_stages);
    }

    /// Called when a stage completes successfully.
    fn on_stage_complete(&self, stage: Stage, completed_stages: usize, total_stages: usize) {
        let _ = (stage, completed_stages, total_stages);
    }

    /// Called when a stage fails (after the failing component's own
    /// retries, if any). The run is terminal after this.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once when the run reaches `Complete`.
    fn on_run_complete(&self, completed_stages: usize, total_stages: usize) {
        let _ = (completed_stages, total_stages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

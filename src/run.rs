//! Run records: the per-conversion state machine and its transition log.
//!
//! A [`PipelineRun`] tracks exactly one document's journey through the
//! pipeline. The stage sequence is fixed:
//!
//! ```text
//! Uploaded → Extracted → Prepared → Summarized → Synthesized → Complete
//!     └──────────┴───────────┴───────────┴────────────┴──▶ Failed
//! ```
//!
//! Only the orchestrator in [`crate::convert`] mutates a run; the pipeline
//! stages themselves are stateless and communicate through return values.
//! `Failed` and `Complete` are terminal — a run that reaches either never
//! transitions again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// Number of productive stages a run passes through on the way to
/// `Complete` (extract, prepare, summarize, synthesize).
pub const TOTAL_STAGES: usize = 4;

/// The stage a pipeline run has reached.
///
/// Each non-terminal value names the *last completed* step; `Uploaded` is
/// the initial state (bytes received, nothing done yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Raw PDF bytes received; no processing yet.
    Uploaded,
    /// Text extraction succeeded.
    Extracted,
    /// Content fitted to the LLM input budget.
    Prepared,
    /// Summary text generated.
    Summarized,
    /// All audio segments synthesized and concatenated.
    Synthesized,
    /// Terminal: a stage failed, nothing further runs.
    Failed,
    /// Terminal: artifact handed to the caller.
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Uploaded => "uploaded",
            Stage::Extracted => "extracted",
            Stage::Prepared => "prepared",
            Stage::Summarized => "summarized",
            Stage::Synthesized => "synthesized",
            Stage::Failed => "failed",
            Stage::Complete => "complete",
        }
    }

    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }

    /// How many productive stages are done once this stage is reached.
    pub fn completed_count(&self) -> usize {
        match self {
            Stage::Uploaded | Stage::Failed => 0,
            Stage::Extracted => 1,
            Stage::Prepared => 2,
            Stage::Summarized => 3,
            Stage::Synthesized | Stage::Complete => TOTAL_STAGES,
        }
    }

    /// The stage that legally follows this one on the success path.
    pub(crate) fn successor(&self) -> Option<Stage> {
        match self {
            Stage::Uploaded => Some(Stage::Extracted),
            Stage::Extracted => Some(Stage::Prepared),
            Stage::Prepared => Some(Stage::Summarized),
            Stage::Summarized => Some(Stage::Synthesized),
            Stage::Synthesized => Some(Stage::Complete),
            Stage::Failed | Stage::Complete => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a run's transition log.
#[derive(Debug, Clone, Serialize)]
pub struct StageTransition {
    /// The stage entered.
    pub stage: Stage,
    /// Wall-clock time of the transition.
    pub at: SystemTime,
}

/// What went wrong, recorded on the run when it fails.
///
/// The full error value is returned to the caller alongside the run (see
/// [`crate::error::PipelineFailure`]); this record keeps only the failing
/// stage and a rendered message so the run stays `Clone + Serialize` for
/// UI consumption.
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    /// The stage that was being attempted when the run failed.
    pub stage: Stage,
    /// Human-readable error description.
    pub message: String,
}

/// The mutable record of a single pipeline run.
///
/// Created by the orchestrator when bytes arrive, advanced after each
/// successful stage, and terminal at `Complete` or `Failed`. Invalid
/// transitions (skipping a stage, advancing a terminal run) are rejected
/// in debug builds and ignored in release builds.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    id: Uuid,
    stage: Stage,
    transitions: Vec<StageTransition>,
    failure: Option<StageFailure>,
}

impl PipelineRun {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Uploaded,
            transitions: vec![StageTransition {
                stage: Stage::Uploaded,
                at: SystemTime::now(),
            }],
            failure: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The stage the run is currently in.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Monotonically increasing count of completed productive stages,
    /// out of [`TOTAL_STAGES`]. A failed run keeps the count of the
    /// stages it completed before failing.
    pub fn completed_stages(&self) -> usize {
        self.transitions
            .iter()
            .map(|t| t.stage.completed_count())
            .max()
            .unwrap_or(0)
    }

    /// The full transition log, in order, starting at `Uploaded`.
    pub fn transitions(&self) -> &[StageTransition] {
        &self.transitions
    }

    /// The recorded failure, if the run is `Failed`.
    pub fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    /// Advance to the next stage on the success path.
    pub(crate) fn advance(&mut self, to: Stage) {
        debug_assert_eq!(
            self.stage.successor(),
            Some(to),
            "illegal stage transition {} → {}",
            self.stage,
            to
        );
        if self.stage.successor() != Some(to) {
            return;
        }
        self.stage = to;
        self.transitions.push(StageTransition {
            stage: to,
            at: SystemTime::now(),
        });
    }

    /// Terminate the run at `Failed`, recording which stage was being
    /// attempted and why.
    pub(crate) fn fail(&mut self, attempted: Stage, message: impl Into<String>) {
        debug_assert!(!self.stage.is_terminal(), "run already terminal");
        if self.stage.is_terminal() {
            return;
        }
        self.stage = Stage::Failed;
        self.failure = Some(StageFailure {
            stage: attempted,
            message: message.into(),
        });
        self.transitions.push(StageTransition {
            stage: Stage::Failed,
            at: SystemTime::now(),
        });
    }
}

/// Cooperative cancellation flag for a run.
///
/// Cloneable; hand one clone to the UI layer and put another in the
/// [`crate::config::PipelineConfig`]. The orchestrator checks the flag
/// before each stage begins — an in-flight service call is never aborted,
/// it runs to completion or to its own deadline, and the run refuses to
/// proceed afterwards.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_walks_the_success_path() {
        let mut run = PipelineRun::new();
        assert_eq!(run.stage(), Stage::Uploaded);
        assert_eq!(run.completed_stages(), 0);

        for (stage, expected) in [
            (Stage::Extracted, 1),
            (Stage::Prepared, 2),
            (Stage::Summarized, 3),
            (Stage::Synthesized, 4),
        ] {
            run.advance(stage);
            assert_eq!(run.stage(), stage);
            assert_eq!(run.completed_stages(), expected);
        }

        run.advance(Stage::Complete);
        assert!(run.is_terminal());
        assert_eq!(run.completed_stages(), TOTAL_STAGES);
        assert_eq!(run.transitions().len(), 6);
    }

    #[test]
    fn failure_is_terminal_and_keeps_progress() {
        let mut run = PipelineRun::new();
        run.advance(Stage::Extracted);
        run.fail(Stage::Prepared, "length limit must be positive");

        assert_eq!(run.stage(), Stage::Failed);
        assert!(run.is_terminal());
        assert_eq!(run.completed_stages(), 1);
        let failure = run.failure().unwrap();
        assert_eq!(failure.stage, Stage::Prepared);
        assert!(failure.message.contains("length limit"));
    }

    #[test]
    fn completed_count_is_monotone_over_the_sequence() {
        let stages = [
            Stage::Uploaded,
            Stage::Extracted,
            Stage::Prepared,
            Stage::Summarized,
            Stage::Synthesized,
            Stage::Complete,
        ];
        let counts: Vec<usize> = stages.iter().map(|s| s.completed_count()).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "got {counts:?}");
    }

    #[test]
    fn cancellation_handle_is_shared_between_clones() {
        let handle = CancellationHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_cancelled());
        handle.cancel();
        assert!(clone.is_cancelled());
    }
}

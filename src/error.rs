//! Error types for the pdf2audio library.
//!
//! Each pipeline component raises its own tagged error type so callers and
//! tests can match on the most specific failure without string-parsing:
//!
//! * [`ExtractionError`] — no extraction strategy produced usable text.
//! * [`PreparationError`] — the length limit handed to the preparer was
//!   invalid (a configuration bug, not a document property).
//! * [`SummarizationError`] / [`SynthesisError`] — a remote service call
//!   failed after local retry handling; retryability is already resolved.
//! * [`ServiceError`] — the normalized `{category, message}` value that
//!   crosses every provider boundary. The orchestrator and the tests never
//!   see a provider SDK's own error hierarchy, only this.
//!
//! The orchestrator wraps whichever component error occurred into
//! [`PipelineError`] *unchanged* — it records the failing stage but never
//! reclassifies — and returns it to the caller together with the terminal
//! run record as a [`PipelineFailure`].

use crate::run::{PipelineRun, Stage};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// ── Normalized service errors ────────────────────────────────────────────

/// Coarse classification of a remote AI-service failure.
///
/// The category alone decides retryability; provider-specific status codes
/// and SDK exception types are mapped into it at the client boundary and
/// never travel further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorCategory {
    /// HTTP 429 — back off and retry.
    RateLimited,
    /// The request deadline elapsed before a response arrived.
    Timeout,
    /// 5xx-class response: the provider is unhealthy, retry may help.
    ServerError,
    /// Connection-level failure (DNS, reset, TLS).
    Network,
    /// The request itself was rejected (400/422) — retrying cannot help.
    InvalidRequest,
    /// Credentials missing, invalid, or unauthorized (401/403).
    Auth,
    /// The provider refused the content on policy grounds.
    ContentPolicy,
    /// The provider answered 200 with an empty or unusable payload.
    EmptyResponse,
}

impl ServiceErrorCategory {
    /// Whether a failure of this category is expected to succeed on retry.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ServiceErrorCategory::RateLimited
                | ServiceErrorCategory::Timeout
                | ServiceErrorCategory::ServerError
                | ServiceErrorCategory::Network
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceErrorCategory::RateLimited => "rate limited",
            ServiceErrorCategory::Timeout => "timeout",
            ServiceErrorCategory::ServerError => "server error",
            ServiceErrorCategory::Network => "network error",
            ServiceErrorCategory::InvalidRequest => "invalid request",
            ServiceErrorCategory::Auth => "authentication error",
            ServiceErrorCategory::ContentPolicy => "content policy rejection",
            ServiceErrorCategory::EmptyResponse => "empty response",
        }
    }
}

impl fmt::Display for ServiceErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized remote-service failure: what happened, in which category,
/// and (for rate limits) how long the server asked us to wait.
#[derive(Debug, Clone, Error)]
#[error("{category}: {message}")]
pub struct ServiceError {
    pub category: ServiceErrorCategory,
    pub message: String,
    /// Server-specified delay before retrying (`Retry-After`), if any.
    pub retry_after: Option<Duration>,
}

impl ServiceError {
    pub fn new(category: ServiceErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

/// One extraction strategy's failure, kept so the final error can report
/// every attempted method and its cause.
#[derive(Debug, Clone)]
pub struct StrategyFailure {
    /// Strategy name, e.g. `"pdf-extract"` or `"lopdf"`.
    pub strategy: &'static str,
    /// Why it failed, as reported by the underlying library.
    pub detail: String,
}

fn render_attempts(attempts: &[StrategyFailure]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.strategy, a.detail))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Text extraction failed across the whole strategy list.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The byte buffer handed to the extractor was empty.
    #[error("PDF byte buffer is empty")]
    EmptyInput,

    /// The document parsed, but no strategy found a usable text layer
    /// (scanned or image-only PDF). Kept distinct from a parse failure:
    /// silently summarizing an empty string would be a far worse outcome
    /// than this error.
    #[error(
        "no usable text layer: {strategies} extraction method(s) parsed the document \
         but produced fewer than {min_chars} non-whitespace characters \
         (scanned or image-only PDF?)"
    )]
    NoTextLayer { strategies: usize, min_chars: usize },

    /// Every strategy raised. Carries each attempt's cause.
    #[error("all extraction methods failed: {}", render_attempts(.attempts))]
    AllStrategiesFailed { attempts: Vec<StrategyFailure> },
}

impl ExtractionError {
    /// True when the document had no text layer (as opposed to not being
    /// parseable at all).
    pub fn is_no_text_layer(&self) -> bool {
        matches!(self, ExtractionError::NoTextLayer { .. })
    }
}

// ── Preparation ──────────────────────────────────────────────────────────

/// Content preparation rejected its configuration.
#[derive(Debug, Error)]
pub enum PreparationError {
    /// The maximum input length must be positive.
    #[error("maximum input length must be positive (got {given})")]
    InvalidLimit { given: usize },
}

// ── Summarization ────────────────────────────────────────────────────────

/// The LLM call failed, after retries where the failure warranted them.
///
/// `is_retryable()` reports whether the *final* failure was transient:
/// `true` means every attempt hit a transient error and the budget ran
/// out; `false` means a permanent error stopped the client immediately.
#[derive(Debug, Error)]
#[error("summarization failed after {attempts} attempt(s): {source}")]
pub struct SummarizationError {
    /// Attempts actually made (1 for a non-retryable first failure).
    pub attempts: u32,
    #[source]
    pub source: ServiceError,
}

impl SummarizationError {
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

// ── Synthesis ────────────────────────────────────────────────────────────

/// A TTS chunk call failed; the whole run fails with it. Partial audio is
/// never surfaced as a result.
#[derive(Debug, Error)]
#[error("synthesis of chunk {chunk_index} failed after {attempts} attempt(s): {source}")]
pub struct SynthesisError {
    /// Zero-based index of the chunk that exhausted its attempts.
    pub chunk_index: usize,
    pub attempts: u32,
    #[source]
    pub source: ServiceError,
}

impl SynthesisError {
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

// ── Pipeline level ───────────────────────────────────────────────────────

/// Everything `convert` can fail with: the component errors, re-surfaced
/// unchanged, plus input-resolution and orchestration failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The payload does not start with the `%PDF` magic prefix.
    #[error("Input is not a valid PDF ('{name}')\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: [u8; 4] },

    /// The payload exceeds the configured size cap.
    #[error(
        "PDF too large: {size} bytes (limit {limit} bytes)\nRaise the size cap if this is intentional."
    )]
    FileTooLarge { size: usize, limit: usize },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Orchestration errors ──────────────────────────────────────────
    /// A required service client could not be constructed.
    #[error("{service} service is not configured.\n{hint}")]
    ServiceNotConfigured { service: &'static str, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was cancelled before the named stage began.
    #[error("run cancelled before reaching stage '{stage}'")]
    Cancelled { stage: Stage },

    /// Could not create or write the output audio file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    // ── Component errors, unchanged ───────────────────────────────────
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Preparation(#[from] PreparationError),

    #[error(transparent)]
    Summarization(#[from] SummarizationError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

/// What the caller of [`crate::convert`] receives on any failure: the
/// terminal run record (stage = `Failed` with the failing stage and
/// message recorded, except for post-run output-write failures, which
/// carry the completed run) together with the component error, unchanged.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    /// The terminal run record.
    pub run: PipelineRun,
    /// The error exactly as the failing component raised it.
    pub error: PipelineError,
}

impl PipelineFailure {
    /// The stage that was being attempted when the run failed.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.run.failure().map(|f| f.stage)
    }
}

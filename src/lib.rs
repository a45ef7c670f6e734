//! # pdf2audio
//!
//! Turn a scientific PDF into a short narrated audio summary.
//!
//! ## Why this crate?
//!
//! Reading a paper takes an hour; a good three-minute spoken summary fits
//! in a commute. This crate extracts the PDF's text layer, asks an LLM
//! for an audio-first summary bounded to a target spoken duration, and
//! synthesizes it with a TTS voice — handling the unglamorous parts
//! (extraction fallbacks, input budgets, rate limits, request-size caps,
//! ordered audio chunking) so callers just get an MP3 or a precise error.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Extract     text layer via pdf-extract, lopdf fallback
//!  ├─ 2. Prepare     fit to the LLM input budget (sentence-safe cuts)
//!  ├─ 3. Summarize   LLM call with retry/backoff, duration-bounded prompt
//!  ├─ 4. Synthesize  TTS per sentence-chunk, sequential, ordered concat
//!  └─ 5. Output      single audio artifact + run record + stats
//! ```
//!
//! The four stages run strictly in sequence — each output feeds the next
//! stage — while independent runs share nothing and can execute
//! concurrently. Progress and cancellation are exposed through
//! [`PipelineProgressCallback`] and [`CancellationHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2audio::{convert, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Services auto-configured from ANTHROPIC_API_KEY / ELEVENLABS_API_KEY
//!     let config = PipelineConfig::default();
//!     let bytes = std::fs::read("paper.pdf")?;
//!     let output = convert(bytes, &config).await?;
//!     std::fs::write("summary.mp3", &output.artifact.bytes)?;
//!     eprintln!(
//!         "{} pages → {} words → ~{:.0}s of audio (est. ${:.2})",
//!         output.document.page_count,
//!         output.summary.word_count,
//!         output.artifact.duration_estimate_secs,
//!         output.stats.estimated_cost_usd,
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2audio` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! pdf2audio = { version = "0.3", default-features = false }
//! ```
//!
//! ## Testing against fakes
//!
//! The remote services are injected behind two narrow traits,
//! [`LlmService`] and [`TtsService`]. Hand fakes to
//! [`PipelineConfigBuilder::llm`](config::PipelineConfigBuilder::llm) /
//! [`PipelineConfigBuilder::tts`](config::PipelineConfigBuilder::tts) and
//! the whole pipeline — retries, chunking, sequencing — runs without a
//! network.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod providers;
pub mod retry;
pub mod run;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AudioFormat, PipelineConfig, PipelineConfigBuilder};
pub use convert::{convert, convert_file, convert_sync, convert_to_file};
pub use error::{
    ExtractionError, PipelineError, PipelineFailure, PreparationError, ServiceError,
    ServiceErrorCategory, StrategyFailure, SummarizationError, SynthesisError,
};
pub use output::{
    AudioArtifact, Document, ExtractionMethod, PipelineOutput, PipelineStats, PreparedContent,
    SummaryResult,
};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use providers::{AnthropicLlm, ElevenLabsTts};
pub use retry::RetryPolicy;
pub use run::{CancellationHandle, PipelineRun, Stage, StageFailure, StageTransition, TOTAL_STAGES};
pub use service::{LlmService, SharedLlm, SharedTts, TtsService};

//! Pipeline stages for PDF-to-audio conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. add an extraction strategy) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prepare ──▶ summarize ──▶ synthesize
//! (path/URL) (pdf text)  (budget)     (LLM)        (TTS)
//! ```
//!
//! 1. [`input`]      — canonicalise a user-supplied path or URL to raw
//!    PDF bytes (library callers can skip this and pass bytes directly)
//! 2. [`extract`]    — pull the text layer out of the PDF, trying an
//!    ordered list of strategies; CPU-bound, run under `spawn_blocking`
//! 3. [`prepare`]    — fit the text to the LLM input budget; pure
//! 4. [`summarize`]  — drive the LLM call with retry/backoff
//! 5. [`synthesize`] — chunk the summary, drive the TTS calls
//!    sequentially, concatenate the audio segments in order
//!
//! Stages 4 and 5 are the only ones with network I/O; their retries are
//! invisible to the orchestrator except as added latency.

pub mod extract;
pub mod input;
pub mod prepare;
pub mod summarize;
pub mod synthesize;

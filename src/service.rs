//! The injected AI-service seam.
//!
//! The pipeline never talks to a provider SDK directly. It sees exactly two
//! capabilities — "prompt in, summary text out" and "text chunk in, audio
//! bytes out" — behind trait objects, so the retry, chunking, and
//! sequencing logic is testable against fakes and swapping a provider
//! touches nothing but the client in [`crate::providers`].
//!
//! Implementations must map their provider's failures into
//! [`ServiceError`](crate::error::ServiceError) with the category already
//! resolved; nothing downstream inspects status codes.

use crate::error::ServiceError;
use async_trait::async_trait;
use std::sync::Arc;

/// A remote large-language-model service.
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Send one prompt, return the generated text.
    ///
    /// A single request/response — no retry here. The summarization client
    /// owns retries; implementations only normalize errors and enforce
    /// their own per-call deadline.
    async fn summarize(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// A remote text-to-speech service.
#[async_trait]
pub trait TtsService: Send + Sync {
    /// Synthesize one bounded-length text chunk into encoded audio bytes.
    ///
    /// Single request/response; the synthesis client owns chunking and
    /// retries. The voice and output format are implementation
    /// configuration, fixed at construction time.
    async fn synthesize(&self, text_chunk: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Shared handle to an LLM service.
pub type SharedLlm = Arc<dyn LlmService>;

/// Shared handle to a TTS service.
pub type SharedTts = Arc<dyn TtsService>;

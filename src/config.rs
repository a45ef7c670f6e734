//! Configuration types for PDF-to-audio conversion.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built
//! via its [`PipelineConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share configs across runs, serialise the scalar
//! parts for logging, and diff two runs to understand why their outputs
//! differ.
//!
//! Credentials never live here: the provider clients receive their API
//! keys explicitly (constructor parameter or environment variable read at
//! service-resolution time), and the pipeline stages take every limit as
//! a plain parameter — no global state is consulted mid-run.

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use crate::run::CancellationHandle;
use crate::service::{SharedLlm, SharedTts};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for a PDF-to-audio pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2audio::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .target_duration_secs(180)
///     .max_input_chars(200_000)
///     .voice_id("21m00Tcm4TlvDq8ikWAM")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum characters of extracted text handed to the LLM. Default: 396 000.
    ///
    /// Derived from a 100k-token input window at the ~4 chars/token
    /// heuristic, minus headroom for the instruction prompt. Longer
    /// documents are truncated at a paragraph or sentence boundary, never
    /// mid-word.
    pub max_input_chars: usize,

    /// Minimum non-whitespace characters for extracted text to count as a
    /// usable text layer. Default: 100.
    ///
    /// Below this the extractor reports a missing text layer instead of
    /// passing near-empty text downstream — a scanned PDF should fail
    /// loudly at extraction, not produce a hallucinated summary.
    pub min_viable_text_chars: usize,

    /// Target spoken duration of the summary in seconds. Default: 180.
    ///
    /// Three minutes is the sweet spot for a paper summary: long enough to
    /// cover findings and methodology, short enough that the TTS cost and
    /// listener attention hold up.
    pub target_duration_secs: u64,

    /// Speaking rate used for word budgets and duration estimates.
    /// Default: 150 words/minute (clear narration pace).
    pub words_per_minute: u32,

    /// LLM model identifier. If `None`, the provider default is used.
    pub model: Option<String>,

    /// Maximum tokens the LLM may generate. Default: 2 000.
    ///
    /// Roughly six minutes of speech at 300 wpm — comfortably above any
    /// target duration this pipeline is asked for, so the summary is never
    /// silently cut off mid-sentence by the token cap.
    pub max_output_tokens: usize,

    /// Sampling temperature for the summary completion. Default: 0.1.
    ///
    /// Low temperature keeps the model factual and consistent — exactly
    /// what you want when compressing someone else's results.
    pub temperature: f32,

    /// TTS voice identifier. Default: `21m00Tcm4TlvDq8ikWAM` (Rachel).
    pub voice_id: String,

    /// TTS model identifier. Default: `eleven_multilingual_v2`.
    pub tts_model_id: String,

    /// Encoded audio output format. Default: 44.1 kHz / 128 kbps MP3.
    pub output_format: AudioFormat,

    /// Per-request character limit of the TTS service. Default: 5 000.
    ///
    /// Summaries longer than this are split into sentence-boundary chunks,
    /// synthesized sequentially, and concatenated in order.
    pub tts_char_limit: usize,

    /// Maximum retry attempts on a transient service failure. Default: 3.
    ///
    /// Most 429/5xx/timeout errors clear within a few seconds. Permanent
    /// errors (bad API key, policy rejection) are never retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s, each delay jittered
    /// so independent runs don't retry in lockstep.
    pub retry_backoff_ms: u64,

    /// Upper bound on any single retry delay in milliseconds. Default: 30 000.
    pub retry_max_backoff_ms: u64,

    /// Jitter factor applied to each retry delay, `0.0..=1.0`. Default: 0.25.
    pub retry_jitter: f32,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub llm_timeout_secs: u64,

    /// Per-TTS-chunk-call timeout in seconds. Default: 60.
    pub tts_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Maximum accepted PDF payload size in bytes. Default: 10 MiB.
    pub max_pdf_bytes: usize,

    /// Pre-constructed LLM service. If `None`, an Anthropic client is
    /// built from `ANTHROPIC_API_KEY` at run start.
    pub llm: Option<SharedLlm>,

    /// Pre-constructed TTS service. If `None`, an ElevenLabs client is
    /// built from `ELEVENLABS_API_KEY` at run start.
    pub tts: Option<SharedTts>,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<ProgressCallback>,

    /// Optional cancellation flag, checked before each stage.
    pub cancellation: Option<CancellationHandle>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 396_000,
            min_viable_text_chars: 100,
            target_duration_secs: 180,
            words_per_minute: 150,
            model: None,
            max_output_tokens: 2_000,
            temperature: 0.1,
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            tts_model_id: "eleven_multilingual_v2".to_string(),
            output_format: AudioFormat::default(),
            tts_char_limit: 5_000,
            max_retries: 3,
            retry_backoff_ms: 500,
            retry_max_backoff_ms: 30_000,
            retry_jitter: 0.25,
            llm_timeout_secs: 120,
            tts_timeout_secs: 60,
            download_timeout_secs: 120,
            max_pdf_bytes: 10 * 1024 * 1024,
            llm: None,
            tts: None,
            progress_callback: None,
            cancellation: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("max_input_chars", &self.max_input_chars)
            .field("min_viable_text_chars", &self.min_viable_text_chars)
            .field("target_duration_secs", &self.target_duration_secs)
            .field("words_per_minute", &self.words_per_minute)
            .field("model", &self.model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .field("voice_id", &self.voice_id)
            .field("tts_model_id", &self.tts_model_id)
            .field("output_format", &self.output_format)
            .field("tts_char_limit", &self.tts_char_limit)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("llm", &self.llm.as_ref().map(|_| "<dyn LlmService>"))
            .field("tts", &self.tts.as_ref().map(|_| "<dyn TtsService>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Target word budget for the summary, at the configured speaking rate.
    pub fn target_words(&self) -> usize {
        (self.target_duration_secs as usize * self.words_per_minute as usize) / 60
    }

    pub(crate) fn retry_policy(&self) -> crate::retry::RetryPolicy {
        crate::retry::RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff_ms: self.retry_backoff_ms,
            max_backoff_ms: self.retry_max_backoff_ms,
            jitter: self.retry_jitter,
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn min_viable_text_chars(mut self, n: usize) -> Self {
        self.config.min_viable_text_chars = n.max(1);
        self
    }

    pub fn target_duration_secs(mut self, secs: u64) -> Self {
        self.config.target_duration_secs = secs.max(1);
        self
    }

    pub fn words_per_minute(mut self, wpm: u32) -> Self {
        self.config.words_per_minute = wpm.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn voice_id(mut self, voice: impl Into<String>) -> Self {
        self.config.voice_id = voice.into();
        self
    }

    pub fn tts_model_id(mut self, model: impl Into<String>) -> Self {
        self.config.tts_model_id = model.into();
        self
    }

    pub fn output_format(mut self, format: AudioFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn tts_char_limit(mut self, n: usize) -> Self {
        self.config.tts_char_limit = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn retry_max_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_max_backoff_ms = ms;
        self
    }

    pub fn retry_jitter(mut self, factor: f32) -> Self {
        self.config.retry_jitter = factor.clamp(0.0, 1.0);
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm_timeout_secs = secs;
        self
    }

    pub fn tts_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tts_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_pdf_bytes(mut self, n: usize) -> Self {
        self.config.max_pdf_bytes = n;
        self
    }

    pub fn llm(mut self, llm: SharedLlm) -> Self {
        self.config.llm = Some(llm);
        self
    }

    pub fn tts(mut self, tts: SharedTts) -> Self {
        self.config.tts = Some(tts);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancellation(mut self, handle: CancellationHandle) -> Self {
        self.config.cancellation = Some(handle);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.max_input_chars == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.tts_char_limit == 0 {
            return Err(PipelineError::InvalidConfig(
                "tts_char_limit must be ≥ 1".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoded audio output format, in the TTS provider's naming scheme.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioFormat {
    /// 44.1 kHz / 128 kbps MP3 (default; good narration quality).
    #[default]
    Mp3_44100_128,
    /// 22.05 kHz / 32 kbps MP3 (small files, preview quality).
    Mp3_22050_32,
    /// Raw 24 kHz 16-bit PCM for downstream processing.
    Pcm_24000,
}

impl AudioFormat {
    /// The provider-side format identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3_44100_128 => "mp3_44100_128",
            AudioFormat::Mp3_22050_32 => "mp3_22050_32",
            AudioFormat::Pcm_24000 => "pcm_24000",
        }
    }

    /// File extension for the concatenated artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3_44100_128 | AudioFormat::Mp3_22050_32 => "mp3",
            AudioFormat::Pcm_24000 => "pcm",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

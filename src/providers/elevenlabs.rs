//! ElevenLabs text-to-speech client implementing [`TtsService`].
//!
//! One bounded text chunk in, one encoded audio segment out. Chunking and
//! retries belong to the synthesis client; this module issues single
//! requests, enforces its deadline, and normalizes failures.

use crate::config::{AudioFormat, PipelineConfig};
use crate::error::{ServiceError, ServiceErrorCategory};
use crate::providers::{classify_status, classify_transport, parse_retry_after};
use crate::service::TtsService;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";
/// Environment variable optionally overriding the voice.
pub const VOICE_ID_ENV: &str = "ELEVENLABS_VOICE_ID";

/// TTS client for the ElevenLabs text-to-speech API.
pub struct ElevenLabsTts {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    voice_id: String,
    model_id: String,
    output_format: AudioFormat,
}

impl ElevenLabsTts {
    /// Default voice: "Rachel", a clear general-purpose narration voice.
    pub const DEFAULT_VOICE_ID: &'static str = "21m00Tcm4TlvDq8ikWAM";
    /// Default TTS model.
    pub const DEFAULT_MODEL_ID: &'static str = "eleven_multilingual_v2";

    /// Create a client with the default voice, model, format, and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: build_http(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            voice_id: Self::DEFAULT_VOICE_ID.to_string(),
            model_id: Self::DEFAULT_MODEL_ID.to_string(),
            output_format: AudioFormat::default(),
        }
    }

    /// Create a client from `ELEVENLABS_API_KEY`, honouring
    /// `ELEVENLABS_VOICE_ID` when set.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())?;
        let mut client = Self::new(key);
        if let Ok(voice) = std::env::var(VOICE_ID_ENV) {
            if !voice.is_empty() {
                client = client.with_voice(voice);
            }
        }
        Some(client)
    }

    /// Apply voice, model, format, and timeout from a pipeline
    /// configuration.
    pub fn configured(api_key: impl Into<String>, config: &PipelineConfig) -> Self {
        Self::new(api_key)
            .with_voice(config.voice_id.clone())
            .with_model(config.tts_model_id.clone())
            .with_output_format(config.output_format)
            .with_timeout(Duration::from_secs(config.tts_timeout_secs))
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_output_format(mut self, format: AudioFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = build_http(timeout);
        self
    }

    /// Override the API base URL (gateways, proxies, mock servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// The voice this client synthesizes with.
    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.base_url.trim_end_matches('/'),
            self.voice_id,
            self.output_format.as_str()
        )
    }

    /// Cheap connectivity check: synthesize a two-word phrase and confirm
    /// non-empty audio comes back. Costs a few characters of quota.
    pub async fn probe(&self) -> Result<(), ServiceError> {
        let audio = self.synthesize("Testing connection.").await?;
        if audio.is_empty() {
            return Err(ServiceError::new(
                ServiceErrorCategory::EmptyResponse,
                "elevenlabs: probe returned no audio",
            ));
        }
        Ok(())
    }
}

fn build_http(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("pdf2audio/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to construct reqwest::Client for the TTS service")
}

#[async_trait]
impl TtsService for ElevenLabsTts {
    async fn synthesize(&self, text_chunk: &str) -> Result<Vec<u8>, ServiceError> {
        let payload = json!({
            "text": text_chunk,
            "model_id": self.model_id,
        });

        debug!(
            voice = %self.voice_id,
            chunk_chars = text_chunk.len(),
            "sending synthesis request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_transport("elevenlabs", &e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status("elevenlabs", status, retry_after, &body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| {
                ServiceError::new(
                    ServiceErrorCategory::Network,
                    format!("elevenlabs: failed reading audio body: {e}"),
                )
            })?
            .to_vec();

        if audio.is_empty() {
            return Err(ServiceError::new(
                ServiceErrorCategory::EmptyResponse,
                "elevenlabs: empty audio payload",
            ));
        }

        debug!(audio_bytes = audio.len(), "synthesis response received");
        Ok(audio)
    }
}

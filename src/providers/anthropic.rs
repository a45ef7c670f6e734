//! Anthropic Messages API client implementing [`LlmService`].
//!
//! One prompt in, one text completion out. Retry policy lives in the
//! summarization client, not here — this module only issues a single
//! request per call, enforces its own deadline through the HTTP client,
//! and maps every failure into the normalized
//! [`ServiceError`](crate::error::ServiceError).

use crate::config::PipelineConfig;
use crate::error::{ServiceError, ServiceErrorCategory};
use crate::providers::{classify_status, classify_transport, parse_retry_after};
use crate::service::LlmService;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// LLM client for the Anthropic Messages API.
pub struct AnthropicLlm {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_output_tokens: usize,
    temperature: f32,
}

impl AnthropicLlm {
    /// Default model: current Sonnet-class model, the accuracy/cost sweet
    /// spot for scientific summarization.
    pub const DEFAULT_MODEL: &'static str = "claude-sonnet-4-0";

    /// Create a client with default model, limits, and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: build_http(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            max_output_tokens: 2_000,
            temperature: 0.1,
        }
    }

    /// Create a client from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())?;
        Some(Self::new(key))
    }

    /// Apply the model, output budget, temperature, and timeout from a
    /// pipeline configuration.
    pub fn configured(api_key: impl Into<String>, config: &PipelineConfig) -> Self {
        let mut client = Self::new(api_key)
            .with_max_output_tokens(config.max_output_tokens)
            .with_temperature(config.temperature)
            .with_timeout(Duration::from_secs(config.llm_timeout_secs));
        if let Some(ref model) = config.model {
            client = client.with_model(model.clone());
        }
        client
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_output_tokens(mut self, n: usize) -> Self {
        self.max_output_tokens = n;
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t.clamp(0.0, 2.0);
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

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

fn build_http(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("pdf2audio/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to construct reqwest::Client for the LLM service")
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmService for AnthropicLlm {
    async fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
        let payload = json!({
            "model": self.model,
            "max_tokens": self.max_output_tokens,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "sending summarization request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_transport("anthropic", &e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status("anthropic", status, retry_after, &body));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            ServiceError::new(
                ServiceErrorCategory::ServerError,
                format!("anthropic: malformed response body: {e}"),
            )
        })?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(completion_chars = text.len(), "summarization response received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_handles_trailing_slash() {
        let client = AnthropicLlm::new("key").with_base_url("http://localhost:9999/");
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/messages");
    }

    #[test]
    fn configured_applies_pipeline_settings() {
        let config = PipelineConfig::builder()
            .model("claude-haiku-4-0")
            .max_output_tokens(512)
            .build()
            .unwrap();
        let client = AnthropicLlm::configured("key", &config);
        assert_eq!(client.model, "claude-haiku-4-0");
        assert_eq!(client.max_output_tokens, 512);
    }

    #[test]
    fn response_text_joins_only_text_blocks() {
        let raw = r#"{
            "content": [
                {"type": "text", "text": "First part."},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "Second part."}
            ]
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(text, "First part.\nSecond part.");
    }
}

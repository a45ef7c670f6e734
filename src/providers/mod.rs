//! Concrete AI-service clients.
//!
//! Each submodule implements one of the injected service traits over plain
//! HTTP with [`reqwest`]:
//!
//! * [`anthropic`] — [`crate::service::LlmService`] against the Anthropic
//!   Messages API.
//! * [`elevenlabs`] — [`crate::service::TtsService`] against the
//!   ElevenLabs text-to-speech API.
//!
//! Both clients normalize provider failures into
//! [`ServiceError`](crate::error::ServiceError) *here*, at the boundary.
//! The status→category mapping is shared below so the two providers
//! cannot drift apart in what they consider transient.

pub mod anthropic;
pub mod elevenlabs;

pub use anthropic::AnthropicLlm;
pub use elevenlabs::ElevenLabsTts;

use crate::error::{ServiceError, ServiceErrorCategory};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

/// How much of an error body to keep in messages. Provider error payloads
/// are occasionally whole HTML pages; nobody needs those in a log line.
const BODY_SNIPPET_LEN: usize = 240;

/// Map an HTTP error status to a normalized service error.
pub(crate) fn classify_status(
    provider: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> ServiceError {
    let snippet = body_snippet(body);
    let message = if snippet.is_empty() {
        format!("{provider}: HTTP {status}")
    } else {
        format!("{provider}: HTTP {status}: {snippet}")
    };

    let category = if status == StatusCode::TOO_MANY_REQUESTS {
        ServiceErrorCategory::RateLimited
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ServiceErrorCategory::Auth
    } else if status == StatusCode::REQUEST_TIMEOUT {
        ServiceErrorCategory::Timeout
    } else if status.is_server_error() {
        ServiceErrorCategory::ServerError
    } else if is_content_policy(body) {
        ServiceErrorCategory::ContentPolicy
    } else {
        ServiceErrorCategory::InvalidRequest
    };

    let mut err = ServiceError::new(category, message);
    if category == ServiceErrorCategory::RateLimited {
        if let Some(delay) = retry_after {
            err = err.with_retry_after(delay);
        }
    }
    err
}

/// Map a transport-level [`reqwest::Error`] to a normalized service error.
pub(crate) fn classify_transport(provider: &str, error: &reqwest::Error) -> ServiceError {
    let category = if error.is_timeout() {
        ServiceErrorCategory::Timeout
    } else {
        ServiceErrorCategory::Network
    };
    ServiceError::new(category, format!("{provider}: {error}"))
}

/// Parse a `Retry-After` header given in whole seconds. HTTP-date values
/// are rare from AI providers and are ignored.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Providers signal content-policy rejections inside otherwise generic
/// 4xx bodies; detect the common markers so the failure is classified as
/// non-retryable policy rejection rather than a plain bad request.
fn is_content_policy(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("content_policy")
        || lower.contains("content policy")
        || lower.contains("content_filter")
}

fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= BODY_SNIPPET_LEN {
        return trimmed.to_string();
    }
    let mut cut = BODY_SNIPPET_LEN;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &trimmed[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_keeps_server_delay() {
        let err = classify_status(
            "anthropic",
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            "",
        );
        assert_eq!(err.category, ServiceErrorCategory::RateLimited);
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_errors_are_permanent() {
        let err = classify_status(
            "elevenlabs",
            StatusCode::UNAUTHORIZED,
            None,
            r#"{"detail":"invalid api key"}"#,
        );
        assert_eq!(err.category, ServiceErrorCategory::Auth);
        assert!(!err.is_retryable());
        assert!(err.message.contains("invalid api key"));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = classify_status("anthropic", StatusCode::SERVICE_UNAVAILABLE, None, "");
        assert_eq!(err.category, ServiceErrorCategory::ServerError);
        assert!(err.is_retryable());
    }

    #[test]
    fn content_policy_marker_beats_plain_bad_request() {
        let err = classify_status(
            "anthropic",
            StatusCode::BAD_REQUEST,
            None,
            r#"{"error":{"type":"invalid_request_error","message":"blocked by content_policy"}}"#,
        );
        assert_eq!(err.category, ServiceErrorCategory::ContentPolicy);
        assert!(!err.is_retryable());
    }

    #[test]
    fn plain_bad_request_is_invalid_request() {
        let err = classify_status("anthropic", StatusCode::BAD_REQUEST, None, "missing field");
        assert_eq!(err.category, ServiceErrorCategory::InvalidRequest);
    }

    #[test]
    fn retry_after_parses_whole_seconds_only() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn long_bodies_are_snipped() {
        let body = "x".repeat(1000);
        let err = classify_status("anthropic", StatusCode::BAD_REQUEST, None, &body);
        assert!(err.message.len() < 400, "got {} bytes", err.message.len());
        assert!(err.message.ends_with('…'));
    }
}

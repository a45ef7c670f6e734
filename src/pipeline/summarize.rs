//! Summarization: build the prompt, drive the LLM call, validate the
//! reply.
//!
//! This module is intentionally thin — prompt wording lives in
//! [`crate::prompts`] and the backoff loop in [`crate::retry`], so each
//! can change without touching the other. What lives here is the stage
//! contract: transient failures are retried, permanent ones are not, and
//! an empty completion is a failure — the pipeline must never narrate an
//! empty summary as if it were a result.

use crate::config::PipelineConfig;
use crate::error::{ServiceError, ServiceErrorCategory, SummarizationError};
use crate::output::{PreparedContent, SummaryResult};
use crate::pipeline::prepare::{estimate_output_cost_usd, estimate_tokens};
use crate::prompts::build_summary_prompt;
use crate::retry::call_with_retry;
use crate::service::SharedLlm;
use std::time::SystemTime;
use tracing::{info, warn};

/// Generate an audio-ready summary of the prepared content.
pub async fn summarize(
    prepared: &PreparedContent,
    config: &PipelineConfig,
    llm: &SharedLlm,
) -> Result<SummaryResult, SummarizationError> {
    let prompt = build_summary_prompt(
        &prepared.text,
        config.target_duration_secs,
        config.words_per_minute,
    );
    let policy = config.retry_policy();

    info!(
        source_chars = prepared.prepared_chars,
        est_tokens = prepared.estimated_tokens,
        "requesting summary"
    );

    let (raw, attempts) = call_with_retry(&policy, "summarization", || llm.summarize(&prompt))
        .await
        .map_err(|(source, attempts)| SummarizationError { attempts, source })?;

    let text = raw.trim();
    if text.is_empty() {
        return Err(SummarizationError {
            attempts,
            source: ServiceError::new(
                ServiceErrorCategory::EmptyResponse,
                "LLM returned an empty summary",
            ),
        });
    }

    let word_count = text.split_whitespace().count();
    let target_words = config.target_words();
    if target_words > 0 {
        if word_count * 10 < target_words * 7 {
            warn!(word_count, target_words, "summary noticeably shorter than target");
        } else if word_count * 10 > target_words * 13 {
            warn!(word_count, target_words, "summary noticeably longer than target");
        }
    }

    info!(word_count, attempts, "summary generated");

    Ok(SummaryResult {
        text: text.to_string(),
        source_chars: prepared.prepared_chars,
        word_count,
        estimated_cost_usd: prepared.estimated_cost_usd
            + estimate_output_cost_usd(estimate_tokens(text)),
        generated_at: SystemTime::now(),
    })
}

//! Content preparation: fit extracted text to the LLM input budget.
//!
//! Pure functions of their inputs — no I/O, no clock, no configuration
//! reads. Truncation is deterministic and never cuts mid-word: it prefers
//! the last paragraph break inside the budget, then the last sentence
//! end, then the last whitespace. A boundary is only taken when it keeps
//! at least 80% of the budget; below that the cut degrades to the next
//! weaker boundary so a stray `\n\n` near the start of the document
//! cannot throw away most of the allowed content.
//!
//! Token and cost figures are heuristics (≈4 characters per token,
//! Sonnet-class per-token rates). They exist for budgeting and ordering —
//! both are monotone in input length — not for billing.

use crate::error::PreparationError;
use crate::output::PreparedContent;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Rough characters-per-token ratio for English prose.
pub const CHARS_PER_TOKEN: usize = 4;

/// Heuristic API rates in USD per million tokens (Sonnet-class pricing).
const INPUT_USD_PER_MTOK: f64 = 3.0;
const OUTPUT_USD_PER_MTOK: f64 = 15.0;

/// A boundary must keep at least this fraction of the budget to be used.
const BOUNDARY_FLOOR: f64 = 0.8;

/// End-of-sentence position: terminal punctuation, optional closing
/// quote/bracket, then whitespace.
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]["')\]]*\s"#).expect("sentence-end regex is valid"));

/// Estimate the token count of `text` (chars / 4, rounded up).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Input-side cost estimate for a prompt of `tokens` tokens.
pub fn estimate_input_cost_usd(tokens: usize) -> f64 {
    tokens as f64 * INPUT_USD_PER_MTOK / 1_000_000.0
}

/// Output-side cost estimate for a completion of `tokens` tokens.
pub(crate) fn estimate_output_cost_usd(tokens: usize) -> f64 {
    tokens as f64 * OUTPUT_USD_PER_MTOK / 1_000_000.0
}

/// Fit `text` to `max_chars` characters.
///
/// Inputs within the budget pass through unchanged. Longer inputs are
/// truncated at the best boundary inside the budget and flagged; the
/// result never exceeds `max_chars` characters and never ends mid-word.
pub fn prepare(text: &str, max_chars: usize) -> Result<PreparedContent, PreparationError> {
    if max_chars == 0 {
        return Err(PreparationError::InvalidLimit { given: max_chars });
    }

    let original_chars = text.chars().count();
    if original_chars <= max_chars {
        debug!(chars = original_chars, "content fits the input budget");
        let estimated_tokens = estimate_tokens(text);
        return Ok(PreparedContent {
            text: text.to_string(),
            original_chars,
            prepared_chars: original_chars,
            truncated: false,
            estimated_tokens,
            estimated_cost_usd: estimate_input_cost_usd(estimated_tokens),
        });
    }

    // Byte offset of the (max_chars+1)-th character: everything before it
    // is within budget.
    let budget_end = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let prefix = &text[..budget_end];

    let cut = truncation_point(prefix);
    let prepared = prefix[..cut].trim_end().to_string();
    let prepared_chars = prepared.chars().count();

    warn!(
        original_chars,
        prepared_chars, "content exceeds the input budget, truncated"
    );

    let estimated_tokens = estimate_tokens(&prepared);
    Ok(PreparedContent {
        text: prepared,
        original_chars,
        prepared_chars,
        truncated: true,
        estimated_tokens,
        estimated_cost_usd: estimate_input_cost_usd(estimated_tokens),
    })
}

/// Byte offset in `prefix` at which to cut: after the best boundary, or
/// `prefix.len()` when the prefix has no whitespace at all.
fn truncation_point(prefix: &str) -> usize {
    let floor = (prefix.len() as f64 * BOUNDARY_FLOOR) as usize;

    // Paragraph break, if it doesn't cost too much content.
    if let Some(idx) = prefix.rfind("\n\n") {
        if idx >= floor {
            return idx;
        }
    }

    // Sentence end, same condition.
    if let Some(end) = SENTENCE_END
        .find_iter(prefix)
        .map(|m| m.end())
        .filter(|&e| e >= floor)
        .last()
    {
        return end;
    }

    // Any whitespace — mid-word cuts are never acceptable, so no floor.
    if let Some(idx) = prefix.rfind(char::is_whitespace) {
        if idx > 0 {
            return idx;
        }
    }

    // A single unbroken token longer than the whole budget; nothing to do
    // but cut it.
    prefix.len()
}

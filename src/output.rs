//! Output types: the per-run data model and the final result bundle.
//!
//! One of each per run — a [`Document`], a [`PreparedContent`], a
//! [`SummaryResult`], an [`AudioArtifact`] — assembled into a
//! [`PipelineOutput`] together with the terminal run record and timing
//! stats. All of these are plain data: produced once by their stage,
//! never mutated afterwards.

use crate::run::PipelineRun;
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// Which extraction strategy produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtractionMethod {
    /// `pdf-extract`, tried first.
    PdfExtract,
    /// `lopdf` per-page extraction, the fallback.
    Lopdf,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::PdfExtract => "pdf-extract",
            ExtractionMethod::Lopdf => "lopdf",
        }
    }

    /// True when the primary method did not produce the text.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ExtractionMethod::Lopdf)
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The uploaded document and what extraction learned about it.
///
/// Created when bytes arrive; `text`, `method`, and `page_count` are
/// filled in exactly once when extraction succeeds. The raw payload
/// itself is not retained here — it lives only for the duration of the
/// extraction stage.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: Uuid,
    /// Size of the uploaded payload in bytes.
    pub byte_len: usize,
    /// Pages reported by the extraction strategy; 0 until extraction.
    pub page_count: usize,
    /// Extracted plain text; `None` until extraction succeeds.
    pub text: Option<String>,
    /// Strategy that produced the text; `None` until extraction succeeds.
    pub method: Option<ExtractionMethod>,
}

impl Document {
    pub(crate) fn new(byte_len: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            byte_len,
            page_count: 0,
            text: None,
            method: None,
        }
    }

    pub fn is_extracted(&self) -> bool {
        self.text.is_some()
    }
}

/// Extracted text fitted to the summarization input budget.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedContent {
    /// The (possibly truncated) text handed to the LLM.
    pub text: String,
    /// Character count of the original extracted text.
    pub original_chars: usize,
    /// Character count of `text`.
    pub prepared_chars: usize,
    /// Whether truncation occurred.
    pub truncated: bool,
    /// Heuristic token estimate for `text` (chars / 4).
    pub estimated_tokens: usize,
    /// Heuristic input-side API cost estimate, in USD. Monotone in input
    /// length; useful for ordering and budgeting, not for billing.
    pub estimated_cost_usd: f64,
}

/// The generated summary and its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    /// Audio-ready summary text.
    pub text: String,
    /// Characters of prepared content the summary was generated from.
    pub source_chars: usize,
    /// Whitespace-separated word count of the summary.
    pub word_count: usize,
    /// Heuristic total API cost estimate (input + output side), in USD.
    pub estimated_cost_usd: f64,
    /// When the summary came back from the service.
    pub generated_at: SystemTime,
}

/// The synthesized audio: ordered per-chunk segments plus the final
/// concatenated payload.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    /// One encoded segment per synthesized chunk, in chunk order.
    pub segments: Vec<Vec<u8>>,
    /// All segments concatenated, in order — the downloadable file.
    pub bytes: Vec<u8>,
    /// Estimated spoken duration in seconds (word count at the configured
    /// speaking rate).
    pub duration_estimate_secs: f64,
    /// Voice the audio was synthesized with.
    pub voice_id: String,
}

impl AudioArtifact {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total size of the concatenated audio in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Wall-clock accounting for one run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub extract_duration_ms: u64,
    pub prepare_duration_ms: u64,
    pub summarize_duration_ms: u64,
    pub synthesize_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Number of TTS chunks the summary was split into.
    pub chunk_count: usize,
    /// Combined heuristic API cost estimate for the run, in USD.
    pub estimated_cost_usd: f64,
}

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub document: Document,
    pub summary: SummaryResult,
    pub artifact: AudioArtifact,
    /// Terminal run record (stage = `Complete`).
    pub run: PipelineRun,
    pub stats: PipelineStats,
}

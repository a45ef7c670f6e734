//! Speech synthesis: chunk the summary, drive the TTS service, and
//! concatenate the audio.
//!
//! ## Chunking
//!
//! TTS providers cap the characters per request. Summaries over the cap
//! are split at sentence boundaries and packed greedily: each chunk takes
//! as many whole sentences as fit, which yields the minimal chunk count
//! for an ordered split. A single sentence longer than the cap (rare, but
//! LLMs do ramble) degrades to word-boundary packing, and a single word
//! longer than the cap is hard-split as the absolute last resort.
//!
//! ## Ordering
//!
//! Chunks are synthesized strictly sequentially and their segments
//! concatenated in chunk order — out-of-order audio is a correctness bug,
//! not a cosmetic one, so no concurrency is attempted here. If any chunk
//! exhausts its retries the whole stage fails with that chunk's index;
//! partial audio is never returned.

use crate::config::PipelineConfig;
use crate::error::{ServiceError, ServiceErrorCategory, SynthesisError};
use crate::output::AudioArtifact;
use crate::retry::call_with_retry;
use crate::service::SharedTts;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// End-of-sentence position: terminal punctuation, optional closing
/// quote/bracket, then whitespace.
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]["')\]]*\s"#).expect("sentence-end regex is valid"));

/// Synthesize `summary_text` into a single audio artifact.
///
/// Splits the text into provider-sized chunks, synthesizes each in order
/// with retry/backoff, and concatenates the resulting segments.
pub async fn synthesize(
    summary_text: &str,
    config: &PipelineConfig,
    tts: &SharedTts,
) -> Result<AudioArtifact, SynthesisError> {
    let chunks = chunk_text(summary_text, config.tts_char_limit);
    let policy = config.retry_policy();

    info!(
        chunks = chunks.len(),
        chars = summary_text.len(),
        voice = %config.voice_id,
        "starting synthesis"
    );

    let mut segments: Vec<Vec<u8>> = Vec::with_capacity(chunks.len());
    for (chunk_index, chunk) in chunks.iter().enumerate() {
        let label = format!("synthesis chunk {chunk_index}");
        let (audio, attempts) = call_with_retry(&policy, &label, || tts.synthesize(chunk))
            .await
            .map_err(|(source, attempts)| SynthesisError {
                chunk_index,
                attempts,
                source,
            })?;

        if audio.is_empty() {
            return Err(SynthesisError {
                chunk_index,
                attempts,
                source: ServiceError::new(
                    ServiceErrorCategory::EmptyResponse,
                    "TTS service returned no audio for a non-empty chunk",
                ),
            });
        }

        debug!(
            chunk = chunk_index,
            bytes = audio.len(),
            attempts,
            "chunk synthesized"
        );
        segments.push(audio);
    }

    let bytes = segments.concat();
    let word_count = summary_text.split_whitespace().count();
    let duration_estimate_secs =
        word_count as f64 / f64::from(config.words_per_minute.max(1)) * 60.0;

    info!(
        segments = segments.len(),
        total_bytes = bytes.len(),
        est_secs = duration_estimate_secs as u64,
        "synthesis complete"
    );

    Ok(AudioArtifact {
        segments,
        bytes,
        duration_estimate_secs,
        voice_id: config.voice_id.clone(),
    })
}

/// Split `text` into ordered chunks of at most `limit` characters each,
/// cutting at sentence boundaries where possible.
///
/// Greedy packing: a chunk takes whole sentences until the next one
/// wouldn't fit. The concatenation of the chunks (modulo the whitespace
/// collapsed at the joins) reproduces the input in order.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || limit == 0 {
        return Vec::new();
    }
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for sentence in split_sentences(text) {
        let pieces = if sentence.chars().count() > limit {
            split_long_sentence(sentence, limit)
        } else {
            vec![sentence.to_string()]
        };

        for piece in pieces {
            let piece_chars = piece.chars().count();
            if current.is_empty() {
                current = piece;
                current_chars = piece_chars;
            } else if current_chars + 1 + piece_chars <= limit {
                current.push(' ');
                current.push_str(&piece);
                current_chars += 1 + piece_chars;
            } else {
                chunks.push(std::mem::take(&mut current));
                current = piece;
                current_chars = piece_chars;
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split text into whole sentences (trailing fragment included).
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Pack the words of an over-long sentence into `limit`-sized pieces;
/// hard-split any single word that alone exceeds the limit.
fn split_long_sentence(sentence: &str, limit: usize) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for word in sentence.split_whitespace() {
        let word_chars = word.chars().count();

        if word_chars > limit {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for slab in chars.chunks(limit) {
                pieces.push(slab.iter().collect());
            }
            continue;
        }

        if current.is_empty() {
            current = word.to_string();
            current_chars = word_chars;
        } else if current_chars + 1 + word_chars <= limit {
            current.push(' ');
            current.push_str(word);
            current_chars += 1 + word_chars;
        } else {
            pieces.push(std::mem::take(&mut current));
            current = word.to_string();
            current_chars = word_chars;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::TtsService;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("A short summary.", 5_000);
        assert_eq!(chunks, vec!["A short summary.".to_string()]);
    }

    #[test]
    fn no_chunk_exceeds_the_limit() {
        let text = "One sentence here. Another sentence follows! A third? Yes indeed. ".repeat(40);
        for limit in [30, 50, 80, 200] {
            for chunk in chunk_text(&text, limit) {
                assert!(
                    chunk.chars().count() <= limit,
                    "chunk of {} chars exceeds limit {limit}",
                    chunk.chars().count()
                );
            }
        }
    }

    #[test]
    fn concatenation_preserves_order_and_content() {
        let text = "First point. Second point. Third point. Fourth point.";
        let chunks = chunk_text(text, 28);
        assert!(chunks.len() > 1);
        let rejoined = chunks.join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn chunk_count_is_minimal_for_greedy_packing() {
        // Four 12-char sentences; at limit 25 exactly two fit per chunk.
        let text = "Aaaa bbb cc. Dddd eee ff. Gggg hhh ii. Jjjj kkk ll.";
        let chunks = chunk_text(text, 25);
        assert_eq!(chunks.len(), 2, "got {chunks:?}");
    }

    #[test]
    fn over_long_sentence_splits_at_word_boundaries() {
        let sentence = "word ".repeat(50); // one "sentence", no punctuation
        let chunks = chunk_text(sentence.trim(), 24);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 24);
            assert!(!chunk.contains("wordword"), "words merged in {chunk:?}");
        }
    }

    #[test]
    fn giant_unbroken_word_is_hard_split() {
        let word = "x".repeat(100);
        let chunks = chunk_text(&word, 30);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
        assert_eq!(chunks.concat(), word);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(chunk_text("   ", 100).is_empty());
    }

    // ── synthesize() against a recording fake ───────────────────────────

    struct RecordingTts {
        chunks_seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TtsService for RecordingTts {
        async fn synthesize(&self, text_chunk: &str) -> Result<Vec<u8>, crate::error::ServiceError> {
            self.chunks_seen.lock().unwrap().push(text_chunk.to_string());
            Ok(format!("[{text_chunk}]").into_bytes())
        }
    }

    #[tokio::test]
    async fn segments_are_concatenated_in_chunk_order() {
        let tts = Arc::new(RecordingTts {
            chunks_seen: Mutex::new(Vec::new()),
        });
        let config = PipelineConfig::builder()
            .tts_char_limit(28)
            .build()
            .unwrap();

        let text = "First point. Second point. Third point. Fourth point.";
        let shared: SharedTts = tts.clone();
        let artifact = synthesize(text, &config, &shared).await.unwrap();

        let seen = tts.chunks_seen.lock().unwrap().clone();
        assert!(seen.len() > 1);
        assert_eq!(artifact.segment_count(), seen.len());

        let expected: Vec<u8> = seen
            .iter()
            .map(|c| format!("[{c}]").into_bytes())
            .collect::<Vec<_>>()
            .concat();
        assert_eq!(artifact.bytes, expected);
        assert!(artifact.duration_estimate_secs > 0.0);
    }

    #[tokio::test]
    async fn failing_chunk_reports_its_index() {
        struct FailSecondChunk;

        #[async_trait]
        impl TtsService for FailSecondChunk {
            async fn synthesize(
                &self,
                text_chunk: &str,
            ) -> Result<Vec<u8>, crate::error::ServiceError> {
                if text_chunk.contains("Third") || text_chunk.contains("Fourth") {
                    Err(crate::error::ServiceError::new(
                        ServiceErrorCategory::InvalidRequest,
                        "unsupported characters",
                    ))
                } else {
                    Ok(vec![1, 2, 3])
                }
            }
        }

        let config = PipelineConfig::builder()
            .tts_char_limit(28)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        let shared: SharedTts = Arc::new(FailSecondChunk);

        let text = "First point. Second point. Third point. Fourth point.";
        let err = synthesize(text, &config, &shared).await.unwrap_err();
        assert_eq!(err.chunk_index, 1);
        assert_eq!(err.attempts, 1);
        assert!(!err.is_retryable());
    }
}

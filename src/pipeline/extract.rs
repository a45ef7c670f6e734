//! Text extraction: pull the text layer out of raw PDF bytes.
//!
//! ## Strategy list
//!
//! Extraction tries an ordered list of strategies and returns the first
//! usable result:
//!
//! 1. `pdf-extract` — handles the large majority of digital PDFs and
//!    produces the cleanest reading order.
//! 2. `lopdf` — a lower-level per-page walk that succeeds on some
//!    documents whose content streams trip up `pdf-extract`.
//!
//! Both operate entirely on in-memory bytes; nothing touches disk. The
//! shared usable-text predicate (enough non-whitespace characters) is
//! what decides "success": a strategy that parses the document but finds
//! almost no text has *not* succeeded — that is a scanned or image-only
//! PDF, and it must fail loudly here rather than feed an empty string to
//! the summarizer. Adding a third strategy means adding one entry to the
//! list in [`extract`]; the orchestrator never changes.

use crate::error::{ExtractionError, StrategyFailure};
use crate::output::ExtractionMethod;
use tracing::{debug, info, warn};

/// A successful extraction: the text, which strategy produced it, and the
/// page count that strategy observed.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub method: ExtractionMethod,
    pub page_count: usize,
}

/// One way of getting text out of PDF bytes.
///
/// Strategies are infallible to construct and stateless; errors are
/// reported as strings because the only consumer is the aggregate
/// [`ExtractionError`], which records them verbatim per attempt.
trait ExtractionStrategy: Sync {
    fn name(&self) -> &'static str;
    fn method(&self) -> ExtractionMethod;
    fn extract(&self, bytes: &[u8]) -> Result<StrategyOutput, String>;
}

struct StrategyOutput {
    text: String,
    page_count: usize,
}

/// Primary strategy: the `pdf-extract` crate.
struct PdfExtractStrategy;

impl ExtractionStrategy for PdfExtractStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PdfExtract
    }

    fn extract(&self, bytes: &[u8]) -> Result<StrategyOutput, String> {
        // pdf-extract can panic on malformed documents; contain it so a
        // bad upload degrades into the fallback strategy instead of
        // tearing down the worker.
        let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| "panicked while parsing the document".to_string())?
            .map_err(|e| e.to_string())?;

        Ok(StrategyOutput {
            page_count: pages.len(),
            text: join_pages(pages.iter().map(String::as_str)),
        })
    }
}

/// Fallback strategy: walk pages with `lopdf` directly.
struct LopdfStrategy;

impl ExtractionStrategy for LopdfStrategy {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Lopdf
    }

    fn extract(&self, bytes: &[u8]) -> Result<StrategyOutput, String> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
        if doc.is_encrypted() {
            return Err("document is encrypted".to_string());
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err("document has no pages".to_string());
        }

        let mut page_texts = Vec::with_capacity(page_numbers.len());
        let mut failed_pages = 0usize;
        for page in &page_numbers {
            match doc.extract_text(&[*page]) {
                Ok(text) => page_texts.push(text),
                Err(e) => {
                    debug!("lopdf: page {page} unreadable: {e}");
                    failed_pages += 1;
                }
            }
        }

        if page_texts.is_empty() {
            return Err(format!(
                "all {failed_pages} page(s) failed text extraction"
            ));
        }

        Ok(StrategyOutput {
            page_count: page_numbers.len(),
            text: join_pages(page_texts.iter().map(String::as_str)),
        })
    }
}

/// Extract text from PDF bytes, trying each strategy in order.
///
/// Returns the first result passing the usable-text predicate. When every
/// strategy parses the document but none finds usable text, the error is
/// the distinct [`ExtractionError::NoTextLayer`]; when every strategy
/// raises, [`ExtractionError::AllStrategiesFailed`] carries each
/// attempt's cause.
pub fn extract(bytes: &[u8], min_viable_chars: usize) -> Result<Extraction, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::EmptyInput);
    }

    let strategies: [&dyn ExtractionStrategy; 2] = [&PdfExtractStrategy, &LopdfStrategy];

    let mut attempts: Vec<StrategyFailure> = Vec::new();
    let mut parsed_without_text = 0usize;

    for strategy in strategies {
        match strategy.extract(bytes) {
            Ok(output) if is_usable(&output.text, min_viable_chars) => {
                info!(
                    method = strategy.name(),
                    pages = output.page_count,
                    chars = output.text.len(),
                    "extracted text"
                );
                return Ok(Extraction {
                    text: output.text,
                    method: strategy.method(),
                    page_count: output.page_count,
                });
            }
            Ok(output) => {
                let found = non_whitespace_chars(&output.text);
                warn!(
                    "{}: parsed {} page(s) but found only {} non-whitespace character(s)",
                    strategy.name(),
                    output.page_count,
                    found
                );
                parsed_without_text += 1;
            }
            Err(detail) => {
                warn!("{}: {}", strategy.name(), detail);
                attempts.push(StrategyFailure {
                    strategy: strategy.name(),
                    detail,
                });
            }
        }
    }

    if parsed_without_text > 0 {
        Err(ExtractionError::NoTextLayer {
            strategies: parsed_without_text,
            min_chars: min_viable_chars,
        })
    } else {
        Err(ExtractionError::AllStrategiesFailed { attempts })
    }
}

/// The shared usable-text predicate: enough non-whitespace characters to
/// plausibly be a text layer rather than extraction noise.
pub(crate) fn is_usable(text: &str, min_chars: usize) -> bool {
    non_whitespace_chars(text) >= min_chars
}

fn non_whitespace_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Join page texts with blank lines, dropping empty pages.
fn join_pages<'a>(pages: impl Iterator<Item = &'a str>) -> String {
    pages
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

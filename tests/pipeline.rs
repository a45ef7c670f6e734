//! End-to-end pipeline tests against fake AI services.
//!
//! The remote LLM/TTS boundary is injected, so these tests drive the
//! whole pipeline — extraction, budgeting, retries, chunking, stage
//! sequencing — without a network. PDF fixtures are generated with lopdf
//! at test time; no binary files live in the repo.

use async_trait::async_trait;
use pdf2audio::{
    convert, convert_to_file, CancellationHandle, ExtractionError, ExtractionMethod, LlmService,
    PipelineConfig, PipelineError, PipelineProgressCallback, ProgressCallback, ServiceError,
    ServiceErrorCategory, SharedLlm, SharedTts, Stage, TtsService, TOTAL_STAGES,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── PDF fixtures ─────────────────────────────────────────────────────────────

/// Build a small valid PDF whose single page draws `lines` of text.
fn make_test_pdf(lines: &[&str]) -> Vec<u8> {
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut content = String::from("BT /F1 12 Tf 50 760 Td 14 TL\n");
    for line in lines {
        content.push_str(&format!("({line}) Tj T*\n"));
    }
    content.push_str("ET");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => resources,
    });

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    });

    if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
        dict.set("Parent", pages_id);
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A PDF with a readable multi-sentence text layer.
fn paper_pdf() -> Vec<u8> {
    let lines: Vec<String> = (0..40)
        .map(|i| {
            format!(
                "Section {i} reports a measurable improvement over the baseline. \
                 The effect size grows with model capacity."
            )
        })
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    make_test_pdf(&refs)
}

/// A structurally valid PDF whose page has no text operators at all —
/// the shape of a scanned document.
fn scanned_pdf() -> Vec<u8> {
    make_test_pdf(&[])
}

// ── Fake services ────────────────────────────────────────────────────────────

const FAKE_SUMMARY: &str = "This paper asks a simple question. The authors build a clever \
                            instrument to answer it. Their results hold across every dataset \
                            they try. The implications reach well beyond the original field.";

/// LLM fake: fails the first `fail_times` calls with `category`, then
/// answers with `response`.
struct FakeLlm {
    calls: AtomicUsize,
    remaining_failures: AtomicU32,
    category: ServiceErrorCategory,
    response: String,
    last_prompt: Mutex<Option<String>>,
}

impl FakeLlm {
    fn ok() -> Arc<Self> {
        Self::flaky(0, ServiceErrorCategory::ServerError)
    }

    fn flaky(fail_times: u32, category: ServiceErrorCategory) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            remaining_failures: AtomicU32::new(fail_times),
            category,
            response: FAKE_SUMMARY.to_string(),
            last_prompt: Mutex::new(None),
        })
    }

    fn always_failing(category: ServiceErrorCategory) -> Arc<Self> {
        Self::flaky(u32::MAX, category)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmService for FakeLlm {
    async fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ServiceError::new(self.category, "scripted failure"));
        }
        Ok(self.response.clone())
    }
}

/// TTS fake: records every chunk and answers with `<chunk text>` as the
/// "audio"; optionally fails chunks containing a marker substring.
struct FakeTts {
    calls: AtomicUsize,
    chunks: Mutex<Vec<String>>,
    fail_on_marker: Option<(&'static str, ServiceErrorCategory)>,
}

impl FakeTts {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            chunks: Mutex::new(Vec::new()),
            fail_on_marker: None,
        })
    }

    fn failing_on(marker: &'static str, category: ServiceErrorCategory) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            chunks: Mutex::new(Vec::new()),
            fail_on_marker: Some((marker, category)),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TtsService for FakeTts {
    async fn synthesize(&self, text_chunk: &str) -> Result<Vec<u8>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.chunks.lock().unwrap().push(text_chunk.to_string());
        if let Some((marker, category)) = self.fail_on_marker {
            if text_chunk.contains(marker) {
                return Err(ServiceError::new(category, "scripted failure"));
            }
        }
        Ok(format!("<{text_chunk}>").into_bytes())
    }
}

fn test_config(llm: &Arc<FakeLlm>, tts: &Arc<FakeTts>) -> PipelineConfig {
    PipelineConfig::builder()
        .llm(llm.clone() as SharedLlm)
        .tts(tts.clone() as SharedTts)
        .retry_backoff_ms(1)
        .retry_jitter(0.0)
        .min_viable_text_chars(50)
        .build()
        .unwrap()
}

// ── Scenario A: happy path with truncation and chunking ──────────────────────

#[tokio::test]
async fn full_run_truncates_summarizes_and_synthesizes() {
    let llm = FakeLlm::ok();
    let tts = FakeTts::ok();
    let mut config = test_config(&llm, &tts);
    config.max_input_chars = 800; // force truncation
    config.tts_char_limit = 80; // force chunking

    let output = convert(paper_pdf(), &config).await.unwrap();

    // Run record
    assert_eq!(output.run.stage(), Stage::Complete);
    assert_eq!(output.run.completed_stages(), TOTAL_STAGES);
    assert!(output.run.failure().is_none());

    // Extraction
    assert_eq!(output.document.method, Some(ExtractionMethod::PdfExtract));
    assert_eq!(output.document.page_count, 1);
    let extracted_chars = output.document.text.as_ref().unwrap().chars().count();
    assert!(extracted_chars > 800, "fixture too small: {extracted_chars}");

    // Preparation: the summary records how much content it actually saw.
    assert!(output.summary.source_chars <= 800);
    assert!(output.summary.source_chars < extracted_chars);

    // Summarization
    assert_eq!(output.summary.text, FAKE_SUMMARY);
    assert!(output.summary.word_count > 0);
    assert!(output.summary.estimated_cost_usd > 0.0);
    let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("3-minute spoken summary"));
    assert!(prompt.contains("approximately 450 words"));

    // Synthesis: ordered segments, concatenated exactly.
    let chunks = tts.chunks();
    assert!(chunks.len() > 1, "expected chunking, got {chunks:?}");
    assert_eq!(output.artifact.segment_count(), chunks.len());
    let expected: Vec<u8> = chunks
        .iter()
        .map(|c| format!("<{c}>").into_bytes())
        .collect::<Vec<_>>()
        .concat();
    assert_eq!(output.artifact.bytes, expected);
    assert!(output.artifact.duration_estimate_secs > 0.0);
    assert_eq!(output.stats.chunk_count, chunks.len());

    // Rejoining the chunks reproduces the summary (single-space joins).
    assert_eq!(chunks.join(" "), FAKE_SUMMARY);
}

// ── Scenario B: scanned PDF, no text layer ───────────────────────────────────

#[tokio::test]
async fn scanned_pdf_fails_at_extraction_with_no_text_layer() {
    let llm = FakeLlm::ok();
    let tts = FakeTts::ok();
    let config = test_config(&llm, &tts);

    let failure = convert(scanned_pdf(), &config).await.unwrap_err();

    assert_eq!(failure.run.stage(), Stage::Failed);
    assert_eq!(failure.failed_stage(), Some(Stage::Extracted));
    assert_eq!(failure.run.completed_stages(), 0);
    match failure.error {
        PipelineError::Extraction(ref e) => assert!(e.is_no_text_layer(), "got {e:?}"),
        ref other => panic!("expected extraction error, got {other:?}"),
    }

    // No subsequent stage executed.
    assert_eq!(llm.calls(), 0);
    assert_eq!(tts.calls(), 0);
}

#[tokio::test]
async fn non_pdf_bytes_fail_at_extraction_with_every_cause() {
    let llm = FakeLlm::ok();
    let tts = FakeTts::ok();
    let config = test_config(&llm, &tts);

    let failure = convert(b"this is just prose".to_vec(), &config)
        .await
        .unwrap_err();

    assert_eq!(failure.failed_stage(), Some(Stage::Extracted));
    match failure.error {
        PipelineError::Extraction(ExtractionError::AllStrategiesFailed { ref attempts }) => {
            assert_eq!(attempts.len(), 2);
        }
        ref other => panic!("expected AllStrategiesFailed, got {other:?}"),
    }
    assert_eq!(llm.calls(), 0);
    assert_eq!(tts.calls(), 0);
}

// ── Scenario C: non-retryable LLM failure ────────────────────────────────────

#[tokio::test]
async fn auth_error_fails_summarization_without_retry() {
    let llm = FakeLlm::always_failing(ServiceErrorCategory::Auth);
    let tts = FakeTts::ok();
    let config = test_config(&llm, &tts);

    let failure = convert(paper_pdf(), &config).await.unwrap_err();

    assert_eq!(failure.failed_stage(), Some(Stage::Summarized));
    assert_eq!(failure.run.completed_stages(), 2);
    match failure.error {
        PipelineError::Summarization(ref e) => {
            assert!(!e.is_retryable());
            assert_eq!(e.attempts, 1);
        }
        ref other => panic!("expected summarization error, got {other:?}"),
    }

    assert_eq!(llm.calls(), 1, "non-retryable errors must not be retried");
    assert_eq!(tts.calls(), 0, "synthesis must not run after a failure");
}

// ── Retry behaviour through the whole pipeline ───────────────────────────────

#[tokio::test]
async fn transient_llm_failure_then_success_completes() {
    let llm = FakeLlm::flaky(1, ServiceErrorCategory::RateLimited);
    let tts = FakeTts::ok();
    let config = test_config(&llm, &tts);

    let output = convert(paper_pdf(), &config).await.unwrap();

    assert_eq!(output.run.stage(), Stage::Complete);
    assert_eq!(llm.calls(), 2, "one failure, one success");
}

#[tokio::test]
async fn exhausted_transient_failures_fail_retryable() {
    let llm = FakeLlm::always_failing(ServiceErrorCategory::ServerError);
    let tts = FakeTts::ok();
    let mut config = test_config(&llm, &tts);
    config.max_retries = 2;

    let failure = convert(paper_pdf(), &config).await.unwrap_err();

    match failure.error {
        PipelineError::Summarization(ref e) => {
            assert!(e.is_retryable());
            assert_eq!(e.attempts, 3);
        }
        ref other => panic!("expected summarization error, got {other:?}"),
    }
    assert_eq!(llm.calls(), 3);
}

#[tokio::test]
async fn failed_synthesis_chunk_fails_the_run_with_its_index() {
    let llm = FakeLlm::ok();
    // "implications" appears only in the final sentence of the summary.
    let tts = FakeTts::failing_on("implications", ServiceErrorCategory::InvalidRequest);
    let mut config = test_config(&llm, &tts);
    config.tts_char_limit = 80;

    let failure = convert(paper_pdf(), &config).await.unwrap_err();

    assert_eq!(failure.failed_stage(), Some(Stage::Synthesized));
    assert_eq!(failure.run.completed_stages(), 3);
    match failure.error {
        PipelineError::Synthesis(ref e) => {
            assert!(!e.is_retryable());
            assert_eq!(e.attempts, 1);
            // The failing chunk is the last one; earlier chunks succeeded.
            let chunks = tts.chunks();
            assert_eq!(e.chunk_index, chunks.len() - 1);
        }
        ref other => panic!("expected synthesis error, got {other:?}"),
    }
}

// ── Cancellation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_run_refuses_to_start_the_next_stage() {
    let llm = FakeLlm::ok();
    let tts = FakeTts::ok();
    let handle = CancellationHandle::new();
    handle.cancel();

    let mut config = test_config(&llm, &tts);
    config.cancellation = Some(handle);

    let failure = convert(paper_pdf(), &config).await.unwrap_err();

    assert_eq!(failure.failed_stage(), Some(Stage::Extracted));
    assert!(matches!(
        failure.error,
        PipelineError::Cancelled {
            stage: Stage::Extracted
        }
    ));
    assert_eq!(llm.calls(), 0);
    assert_eq!(tts.calls(), 0);
}

// ── Progress reporting ───────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
    completed_counts: Mutex<Vec<usize>>,
}

impl PipelineProgressCallback for EventLog {
    fn on_run_start(&self, _total: usize) {
        self.events.lock().unwrap().push("run_start".into());
    }
    fn on_stage_start(&self, stage: Stage, _c: usize, _t: usize) {
        self.events.lock().unwrap().push(format!("start:{stage}"));
    }
    fn on_stage_complete(&self, stage: Stage, completed: usize, _t: usize) {
        self.events.lock().unwrap().push(format!("done:{stage}"));
        self.completed_counts.lock().unwrap().push(completed);
    }
    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.events.lock().unwrap().push(format!("error:{stage}"));
    }
    fn on_run_complete(&self, _c: usize, _t: usize) {
        self.events.lock().unwrap().push("run_complete".into());
    }
}

#[tokio::test]
async fn progress_events_arrive_in_pipeline_order() {
    let llm = FakeLlm::ok();
    let tts = FakeTts::ok();
    let log = Arc::new(EventLog::default());

    let mut config = test_config(&llm, &tts);
    config.progress_callback = Some(log.clone() as ProgressCallback);

    convert(paper_pdf(), &config).await.unwrap();

    let events = log.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "run_start",
            "start:extracted",
            "done:extracted",
            "start:prepared",
            "done:prepared",
            "start:summarized",
            "done:summarized",
            "start:synthesized",
            "done:synthesized",
            "run_complete",
        ]
    );

    let counts = log.completed_counts.lock().unwrap().clone();
    assert_eq!(counts, vec![1, 2, 3, 4], "completed count must be monotone");
}

#[tokio::test]
async fn failing_stage_reports_an_error_event() {
    let llm = FakeLlm::always_failing(ServiceErrorCategory::Auth);
    let tts = FakeTts::ok();
    let log = Arc::new(EventLog::default());

    let mut config = test_config(&llm, &tts);
    config.progress_callback = Some(log.clone() as ProgressCallback);

    convert(paper_pdf(), &config).await.unwrap_err();

    let events = log.events.lock().unwrap().clone();
    assert_eq!(events.last().unwrap(), "error:summarized");
    assert!(!events.iter().any(|e| e == "run_complete"));
}

// ── File output ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_to_file_writes_the_concatenated_audio() {
    let llm = FakeLlm::ok();
    let tts = FakeTts::ok();
    let config = test_config(&llm, &tts);

    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("paper.pdf");
    tokio::fs::write(&pdf_path, paper_pdf()).await.unwrap();
    let out_path = dir.path().join("nested/paper_summary.mp3");

    let output = convert_to_file(pdf_path.to_str().unwrap(), &out_path, &config)
        .await
        .unwrap();

    let written = tokio::fs::read(&out_path).await.unwrap();
    assert_eq!(written, output.artifact.bytes);
    assert!(!written.is_empty());
}

#[tokio::test]
async fn missing_input_file_fails_before_any_stage() {
    let llm = FakeLlm::ok();
    let tts = FakeTts::ok();
    let config = test_config(&llm, &tts);

    let failure = convert_to_file("/no/such/paper.pdf", "/tmp/out.mp3", &config)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, PipelineError::FileNotFound { .. }));
    assert_eq!(failure.failed_stage(), Some(Stage::Uploaded));
    assert_eq!(llm.calls(), 0);
}

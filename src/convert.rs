//! Conversion entry points and the stage-sequencing orchestrator.
//!
//! ## Orchestration contract
//!
//! The orchestrator is the only code that touches the [`PipelineRun`]
//! record. It drives the four stages strictly in order — each stage's
//! output is the next stage's input, so there is nothing to parallelise
//! inside a run — and on any component failure it records the failing
//! stage, stops, and resurfaces the component's error unchanged. It never
//! interprets or reclassifies errors; retries happen inside the
//! summarization and synthesis stages and are visible here only as
//! latency.
//!
//! Cancellation is checked before each stage begins. An external call
//! already in flight runs to completion or to its own deadline; the
//! orchestrator only refuses to start the next stage.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineFailure};
use crate::output::{Document, PipelineOutput, PipelineStats};
use crate::pipeline::{extract, input, prepare, summarize, synthesize};
use crate::progress::ProgressCallback;
use crate::providers::{anthropic, elevenlabs, AnthropicLlm, ElevenLabsTts};
use crate::run::{PipelineRun, Stage, TOTAL_STAGES};
use crate::service::{SharedLlm, SharedTts};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert raw PDF bytes into a narrated audio summary.
///
/// This is the primary entry point for the library. The byte buffer is
/// consumed: it is only needed during extraction and is released as soon
/// as that stage finishes.
///
/// # Returns
/// `Ok(PipelineOutput)` with the artifact, summary, terminal run record
/// (stage = `Complete`), and stats.
///
/// # Errors
/// `Err(PipelineFailure)` carrying the terminal run record (stage =
/// `Failed`, with the failing stage recorded) and the component error
/// exactly as raised. There is no partial success: a summary without
/// audio is a synthesis-stage failure, not a degraded result.
pub async fn convert(
    pdf_bytes: Vec<u8>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineFailure> {
    let total_start = Instant::now();
    let mut run = PipelineRun::new();
    let cb = config.progress_callback.clone();

    info!(
        run_id = %run.id(),
        bytes = pdf_bytes.len(),
        "starting pipeline run"
    );
    notify(&cb, |c| c.on_run_start(TOTAL_STAGES));

    // ── Step 1: Resolve services ─────────────────────────────────────────
    // Done before any stage so a missing API key fails fast, before we
    // spend CPU on extraction.
    let llm = match resolve_llm(config) {
        Ok(llm) => llm,
        Err(e) => return Err(fail_run(run, &cb, Stage::Uploaded, e)),
    };
    let tts = match resolve_tts(config) {
        Ok(tts) => tts,
        Err(e) => return Err(fail_run(run, &cb, Stage::Uploaded, e)),
    };

    let mut document = Document::new(pdf_bytes.len());

    // ── Step 2: Extract text ─────────────────────────────────────────────
    if let Err(e) = ensure_not_cancelled(config, Stage::Extracted) {
        return Err(fail_run(run, &cb, Stage::Extracted, e));
    }
    notify(&cb, |c| c.on_stage_start(Stage::Extracted, run.completed_stages(), TOTAL_STAGES));

    let extract_start = Instant::now();
    let min_viable = config.min_viable_text_chars;
    // Extraction is CPU-bound; keep it off the async workers.
    let extraction = match tokio::task::spawn_blocking(move || {
        extract::extract(&pdf_bytes, min_viable)
        // `pdf_bytes` is dropped here — the raw payload is not needed
        // beyond this stage.
    })
    .await
    {
        Ok(Ok(extraction)) => extraction,
        Ok(Err(e)) => return Err(fail_run(run, &cb, Stage::Extracted, e.into())),
        Err(join_err) => {
            let e = PipelineError::Internal(format!("extraction task failed: {join_err}"));
            return Err(fail_run(run, &cb, Stage::Extracted, e));
        }
    };
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    document.page_count = extraction.page_count;
    document.method = Some(extraction.method);
    run.advance(Stage::Extracted);
    notify(&cb, |c| c.on_stage_complete(Stage::Extracted, run.completed_stages(), TOTAL_STAGES));
    debug!(
        method = %extraction.method,
        pages = extraction.page_count,
        ms = extract_duration_ms,
        "extraction complete"
    );

    // ── Step 3: Prepare content ──────────────────────────────────────────
    if let Err(e) = ensure_not_cancelled(config, Stage::Prepared) {
        return Err(fail_run(run, &cb, Stage::Prepared, e));
    }
    notify(&cb, |c| c.on_stage_start(Stage::Prepared, run.completed_stages(), TOTAL_STAGES));

    let prepare_start = Instant::now();
    let prepared = match prepare::prepare(&extraction.text, config.max_input_chars) {
        Ok(prepared) => prepared,
        Err(e) => return Err(fail_run(run, &cb, Stage::Prepared, e.into())),
    };
    let prepare_duration_ms = prepare_start.elapsed().as_millis() as u64;

    document.text = Some(extraction.text);
    run.advance(Stage::Prepared);
    notify(&cb, |c| c.on_stage_complete(Stage::Prepared, run.completed_stages(), TOTAL_STAGES));

    // ── Step 4: Summarize ────────────────────────────────────────────────
    if let Err(e) = ensure_not_cancelled(config, Stage::Summarized) {
        return Err(fail_run(run, &cb, Stage::Summarized, e));
    }
    notify(&cb, |c| c.on_stage_start(Stage::Summarized, run.completed_stages(), TOTAL_STAGES));

    let summarize_start = Instant::now();
    let summary = match summarize::summarize(&prepared, config, &llm).await {
        Ok(summary) => summary,
        Err(e) => return Err(fail_run(run, &cb, Stage::Summarized, e.into())),
    };
    let summarize_duration_ms = summarize_start.elapsed().as_millis() as u64;

    run.advance(Stage::Summarized);
    notify(&cb, |c| c.on_stage_complete(Stage::Summarized, run.completed_stages(), TOTAL_STAGES));

    // ── Step 5: Synthesize audio ─────────────────────────────────────────
    if let Err(e) = ensure_not_cancelled(config, Stage::Synthesized) {
        return Err(fail_run(run, &cb, Stage::Synthesized, e));
    }
    notify(&cb, |c| c.on_stage_start(Stage::Synthesized, run.completed_stages(), TOTAL_STAGES));

    let synthesize_start = Instant::now();
    let artifact = match synthesize::synthesize(&summary.text, config, &tts).await {
        Ok(artifact) => artifact,
        Err(e) => return Err(fail_run(run, &cb, Stage::Synthesized, e.into())),
    };
    let synthesize_duration_ms = synthesize_start.elapsed().as_millis() as u64;

    run.advance(Stage::Synthesized);
    notify(&cb, |c| c.on_stage_complete(Stage::Synthesized, run.completed_stages(), TOTAL_STAGES));

    // ── Step 6: Finalize ─────────────────────────────────────────────────
    run.advance(Stage::Complete);
    notify(&cb, |c| c.on_run_complete(run.completed_stages(), TOTAL_STAGES));

    let stats = PipelineStats {
        extract_duration_ms,
        prepare_duration_ms,
        summarize_duration_ms,
        synthesize_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        chunk_count: artifact.segment_count(),
        estimated_cost_usd: summary.estimated_cost_usd,
    };

    info!(
        run_id = %run.id(),
        audio_bytes = artifact.len(),
        est_secs = artifact.duration_estimate_secs as u64,
        total_ms = stats.total_duration_ms,
        "pipeline run complete"
    );

    Ok(PipelineOutput {
        document,
        summary,
        artifact,
        run,
        stats,
    })
}

/// Convert a PDF given as a local file path or an HTTP/HTTPS URL.
pub async fn convert_file(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineFailure> {
    let input_str = input_str.as_ref();
    let bytes = input::load_input(input_str, config.max_pdf_bytes, config.download_timeout_secs)
        .await
        .map_err(|e| {
            let mut run = PipelineRun::new();
            let cb = config.progress_callback.clone();
            notify(&cb, |c| c.on_stage_error(Stage::Uploaded, &e.to_string()));
            run.fail(Stage::Uploaded, e.to_string());
            PipelineFailure { run, error: e }
        })?;
    convert(bytes, config).await
}

/// Convert a PDF and write the audio artifact directly to a file.
///
/// The write is atomic (temp file + rename) so a crash mid-write never
/// leaves a truncated audio file at the destination.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineFailure> {
    let output = convert_file(input_str, config).await?;
    let path = output_path.as_ref();

    // The pipeline run itself succeeded; a failed write surfaces the
    // completed run alongside the I/O error.
    write_atomic(path, &output.artifact.bytes).map_err(|error| PipelineFailure {
        run: output.run.clone(),
        error,
    })?;

    info!("wrote {} bytes to {}", output.artifact.len(), path.display());
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    pdf_bytes: Vec<u8>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineFailure> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        let mut run = PipelineRun::new();
        let error = PipelineError::Internal(format!("failed to create tokio runtime: {e}"));
        run.fail(Stage::Uploaded, error.to_string());
        PipelineFailure { run, error }
    })?;
    runtime.block_on(convert(pdf_bytes, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn notify(cb: &Option<ProgressCallback>, f: impl FnOnce(&dyn crate::progress::PipelineProgressCallback)) {
    if let Some(cb) = cb {
        f(cb.as_ref());
    }
}

/// Terminate the run at `Failed` and package the error for the caller.
fn fail_run(
    mut run: PipelineRun,
    cb: &Option<ProgressCallback>,
    attempted: Stage,
    error: PipelineError,
) -> PipelineFailure {
    notify(cb, |c| c.on_stage_error(attempted, &error.to_string()));
    run.fail(attempted, error.to_string());
    info!(run_id = %run.id(), stage = %attempted, "pipeline run failed: {error}");
    PipelineFailure { run, error }
}

fn ensure_not_cancelled(config: &PipelineConfig, next: Stage) -> Result<(), PipelineError> {
    let cancelled = config
        .cancellation
        .as_ref()
        .is_some_and(|handle| handle.is_cancelled());
    if cancelled {
        Err(PipelineError::Cancelled { stage: next })
    } else {
        Ok(())
    }
}

/// Resolve the LLM service: an injected instance wins, otherwise build
/// the Anthropic client from the environment.
fn resolve_llm(config: &PipelineConfig) -> Result<SharedLlm, PipelineError> {
    if let Some(ref llm) = config.llm {
        return Ok(Arc::clone(llm));
    }
    match std::env::var(anthropic::API_KEY_ENV) {
        Ok(key) if !key.is_empty() => Ok(Arc::new(AnthropicLlm::configured(key, config))),
        _ => Err(PipelineError::ServiceNotConfigured {
            service: "LLM",
            hint: format!(
                "Set {} or inject an LlmService via PipelineConfigBuilder::llm.",
                anthropic::API_KEY_ENV
            ),
        }),
    }
}

/// Resolve the TTS service: an injected instance wins, otherwise build
/// the ElevenLabs client from the environment.
fn resolve_tts(config: &PipelineConfig) -> Result<SharedTts, PipelineError> {
    if let Some(ref tts) = config.tts {
        return Ok(Arc::clone(tts));
    }
    match std::env::var(elevenlabs::API_KEY_ENV) {
        Ok(key) if !key.is_empty() => Ok(Arc::new(ElevenLabsTts::configured(key, config))),
        _ => Err(PipelineError::ServiceNotConfigured {
            service: "TTS",
            hint: format!(
                "Set {} or inject a TtsService via PipelineConfigBuilder::tts.",
                elevenlabs::API_KEY_ENV
            ),
        }),
    }
}

/// Write `bytes` to `path` atomically: temp file in the same directory,
/// then rename over the destination.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let wrap = |source: std::io::Error| PipelineError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }

    let dir = parent.unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(bytes).map_err(wrap)?;
    tmp.persist(path)
        .map_err(|e| wrap(e.error))
        .map(|_| ())
}

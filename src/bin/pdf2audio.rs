//! CLI binary for pdf2audio.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, renders stage progress, and prints a result summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2audio::{
    convert_to_file, AudioFormat, ElevenLabsTts, PipelineConfig, PipelineProgressCallback,
    ProgressCallback, Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Turn a scientific PDF into a short narrated audio summary.
#[derive(Parser, Debug)]
#[command(name = "pdf2audio", version, about, long_about = None)]
struct Cli {
    /// Path or HTTP/HTTPS URL of the PDF to summarize.
    #[arg(required_unless_present = "check")]
    input: Option<String>,

    /// Output audio file. Defaults to `<input stem>_summary.<ext>`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target spoken duration in seconds.
    #[arg(long, default_value_t = 180)]
    duration_secs: u64,

    /// TTS voice identifier.
    #[arg(long, env = "ELEVENLABS_VOICE_ID")]
    voice: Option<String>,

    /// LLM model identifier (provider default when omitted).
    #[arg(long)]
    model: Option<String>,

    /// Maximum characters of extracted text sent to the LLM.
    #[arg(long, default_value_t = 396_000)]
    max_input_chars: usize,

    /// Per-request character limit of the TTS service.
    #[arg(long, default_value_t = 5_000)]
    tts_char_limit: usize,

    /// Maximum retries per transient service failure.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Audio output format.
    #[arg(long, value_parser = parse_format, default_value = "mp3_44100_128")]
    format: AudioFormat,

    /// Probe the configured services and exit.
    #[arg(long)]
    check: bool,

    /// Verbose logging (library debug output).
    #[arg(short, long)]
    verbose: bool,

    /// No progress bar, errors only.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_format(s: &str) -> Result<AudioFormat, String> {
    match s {
        "mp3_44100_128" => Ok(AudioFormat::Mp3_44100_128),
        "mp3_22050_32" => Ok(AudioFormat::Mp3_22050_32),
        "pcm_24000" => Ok(AudioFormat::Pcm_24000),
        other => Err(format!(
            "unknown format '{other}' (expected mp3_44100_128, mp3_22050_32, or pcm_24000)"
        )),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a four-step stage bar with one log line per
/// completed stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos}/{len}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn stage_label(stage: Stage) -> &'static str {
        match stage {
            Stage::Extracted => "extracting text",
            Stage::Prepared => "fitting content to budget",
            Stage::Summarized => "generating summary",
            Stage::Synthesized => "synthesizing audio",
            _ => "working",
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_stages: usize) {
        self.bar.set_length(total_stages as u64);
    }

    fn on_stage_start(&self, stage: Stage, _completed: usize, _total: usize) {
        self.bar.set_message(Self::stage_label(stage).to_string());
    }

    fn on_stage_complete(&self, stage: Stage, completed: usize, total: usize) {
        self.bar.set_position(completed as u64);
        self.bar.println(format!(
            "  {} {:<28} {}",
            green("✓"),
            Self::stage_label(stage),
            dim(&format!("{completed}/{total}"))
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        self.bar.println(format!(
            "  {} {} failed: {error}",
            red("✗"),
            Self::stage_label(stage)
        ));
        self.bar.abandon();
    }

    fn on_run_complete(&self, _completed: usize, _total: usize) {
        self.bar.finish_with_message("done");
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Service check mode ───────────────────────────────────────────────
    if cli.check {
        return run_check(&config).await;
    }

    let input = cli
        .input
        .as_deref()
        .context("missing INPUT (path or URL of a PDF)")?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input, cli.format));

    // ── Run the pipeline ─────────────────────────────────────────────────
    let output = convert_to_file(input, &output_path, &config)
        .await
        .map_err(|failure| {
            let stage = failure
                .failed_stage()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "setup".to_string());
            anyhow::anyhow!("{}", failure.error).context(format!("pipeline failed at '{stage}'"))
        })?;

    if !cli.quiet {
        let minutes = output.artifact.duration_estimate_secs / 60.0;
        println!();
        println!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Audio summary ready: {}", output_path.display()))
        );
        println!(
            "  {} pages, {} extraction → {} summary words → ~{minutes:.1} min of audio",
            output.document.page_count,
            output
                .document
                .method
                .map(|m| m.to_string())
                .unwrap_or_default(),
            output.summary.word_count,
        );
        println!(
            "  {}",
            dim(&format!(
                "{} audio segment(s), {} KiB, est. API cost ${:.2}, {} ms total",
                output.stats.chunk_count,
                output.artifact.len() / 1024,
                output.stats.estimated_cost_usd,
                output.stats.total_duration_ms
            ))
        );
    }

    Ok(())
}

/// Probe the TTS service and confirm the LLM key is present.
async fn run_check(config: &PipelineConfig) -> Result<()> {
    let llm_key = std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());
    match llm_key {
        Some(_) => println!("{} LLM service: key configured", green("✓")),
        None => println!("{} LLM service: ANTHROPIC_API_KEY not set", red("✗")),
    }

    let tts_key = std::env::var("ELEVENLABS_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());
    match tts_key {
        Some(key) => {
            let tts = ElevenLabsTts::configured(key, config);
            match tts.probe().await {
                Ok(()) => println!("{} TTS service: reachable", green("✓")),
                Err(e) => println!("{} TTS service: {e}", red("✗")),
            }
        }
        None => println!("{} TTS service: ELEVENLABS_API_KEY not set", red("✗")),
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .target_duration_secs(cli.duration_secs)
        .max_input_chars(cli.max_input_chars)
        .tts_char_limit(cli.tts_char_limit)
        .max_retries(cli.max_retries)
        .output_format(cli.format);

    if let Some(ref voice) = cli.voice {
        builder = builder.voice_id(voice.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if !cli.quiet {
        let cb = CliProgressCallback::new();
        builder = builder.progress_callback(cb as ProgressCallback);
    }

    builder.build().context("invalid configuration")
}

/// `paper.pdf` → `paper_summary.mp3`; URLs use their last path segment.
fn default_output_path(input: &str, format: AudioFormat) -> PathBuf {
    let name = input
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("summary");
    let stem = name.strip_suffix(".pdf").unwrap_or(name);
    PathBuf::from(format!("{stem}_summary.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_derives_from_input_stem() {
        assert_eq!(
            default_output_path("paper.pdf", AudioFormat::Mp3_44100_128),
            PathBuf::from("paper_summary.mp3")
        );
        assert_eq!(
            default_output_path("https://arxiv.org/pdf/1706.03762.pdf", AudioFormat::Mp3_44100_128),
            PathBuf::from("1706.03762_summary.mp3")
        );
        assert_eq!(
            default_output_path("notes", AudioFormat::Pcm_24000),
            PathBuf::from("notes_summary.pcm")
        );
    }

    #[test]
    fn format_parser_accepts_known_formats() {
        assert_eq!(parse_format("mp3_44100_128"), Ok(AudioFormat::Mp3_44100_128));
        assert!(parse_format("wav").is_err());
    }
}

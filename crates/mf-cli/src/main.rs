//! MasterForge command line
//!
//! Usage:
//!   masterforge analyze mix.wav [--json]
//!   masterforge master mix.wav -o mastered.wav [--genre rock] [--patch patch.json] [--request "more bass"]
//!   masterforge preset jazz

mod wav;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use mf_core::{SettingsPatch, Track, TrackId};
use mf_engine::{
    AnalysisTaskResult, EngineConfig, MasteringEngine, TaskId, TaskState, TaskStatus, request_patch,
};
use mf_master::{canonical_genre, chain_preset, genre_profile};

/// Longest a single task may take before the CLI gives up
const TASK_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Parser)]
#[command(name = "masterforge", version, about = "AI-assisted audio mastering")]
struct Cli {
    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a WAV file
    Analyze {
        input: PathBuf,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Master a WAV file
    Master {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Genre whose targets replace the detected one
        #[arg(short, long)]
        genre: Option<String>,
        /// Settings patch (JSON) applied on top of the suggestions
        #[arg(short, long)]
        patch: Option<PathBuf>,
        /// Plain-language adjustment, e.g. "warmer and wider"
        #[arg(short, long)]
        request: Option<String>,
    },
    /// Show a genre profile and its chain preset
    Preset { genre: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Analyze { input, json } => analyze(config, &input, json),
        Commands::Master {
            input,
            output,
            genre,
            patch,
            request,
        } => master(config, &input, &output, genre.as_deref(), patch.as_deref(), request.as_deref()),
        Commands::Preset { genre } => preset(&genre),
    }
}

fn load_track(engine: &MasteringEngine, input: &Path) -> Result<(TrackId, wav::WavFormat)> {
    let decoded = wav::read_wav(input)?;
    let mut track = Track::from_audio(TrackId::new(), &decoded.audio)
        .with_bit_depth(decoded.format.bits_per_sample);
    if let Some(name) = input.file_name() {
        track = track.with_filename(name.to_string_lossy());
    }
    Ok((engine.insert_track(track, decoded.audio), decoded.format))
}

fn wait(engine: &MasteringEngine, task: &TaskId) -> Result<TaskStatus> {
    let status = engine
        .wait(task, TASK_TIMEOUT)
        .with_context(|| format!("task {task} disappeared"))?;
    match status.state {
        TaskState::Success => Ok(status),
        TaskState::Failure => bail!(
            "task {task} failed: {}",
            status.error.as_deref().unwrap_or("unknown error")
        ),
        state => bail!("task {task} still {state} after {}s", TASK_TIMEOUT.as_secs()),
    }
}

fn run_analysis(engine: &MasteringEngine, track: &TrackId) -> Result<AnalysisTaskResult> {
    let task = engine.analyze(track)?;
    let status = wait(engine, &task)?;
    status
        .result
        .and_then(|result| result.as_analysis().cloned())
        .context("analysis task returned no analysis")
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

fn analyze(config: EngineConfig, input: &Path, json: bool) -> Result<()> {
    let engine = MasteringEngine::new(config);
    let (track, _) = load_track(&engine, input)?;
    let result = run_analysis(&engine, &track)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let analysis = &result.analysis;
    println!("{}", input.display());
    println!(
        "  genre       {} ({:.0}%)",
        analysis.genre,
        analysis.genre_confidence * 100.0
    );
    println!("  tempo       {:.1} BPM", analysis.tempo);
    println!("  key         {}", analysis.key);
    println!("  loudness    {:.1} LUFS", analysis.loudness.lufs_integrated);
    println!("  peak        {:.1} dBFS", analysis.loudness.peak_db);
    println!("  crest DR    {:.1} dB", analysis.loudness.dynamic_range);
    println!("  correlation {:.2}", analysis.stereo_analysis.correlation);
    println!(
        "  masked      {} critical bands",
        analysis.masking_analysis.total_masked_bands
    );
    for recommendation in &analysis.masking_analysis.recommendations {
        println!("    - {recommendation}");
    }
    Ok(())
}

fn master(
    config: EngineConfig,
    input: &Path,
    output: &Path,
    genre: Option<&str>,
    patch_file: Option<&Path>,
    request: Option<&str>,
) -> Result<()> {
    let engine = MasteringEngine::new(config.with_auto_apply(false));
    let (track, format) = load_track(&engine, input)?;

    let mut patch = match run_analysis(&engine, &track) {
        Ok(result) => result.ai_suggestions,
        Err(e) => {
            log::warn!("analysis unavailable ({e:#}), mastering without it");
            genre.map(chain_preset).unwrap_or_default()
        }
    };
    if let Some(path) = patch_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read patch {}", path.display()))?;
        let (file_patch, errors) = SettingsPatch::from_json_str(&text);
        if !errors.is_empty() {
            log::warn!("{} section(s) of {} ignored", errors.len(), path.display());
        }
        patch.overlay(file_patch);
    }
    if let Some(request) = request {
        patch.overlay(request_patch(request));
    }

    let settings = engine.resolve_settings(&track, genre, Some(&patch))?;
    let task = engine.master(&track, Some(settings))?;
    let status = wait(&engine, &task)?;
    let result = status
        .result
        .as_ref()
        .and_then(|r| r.as_mastering())
        .context("mastering task returned no output")?;
    let rendered = engine
        .output(&result.output_id)
        .context("rendered output missing from store")?;

    wav::write_wav(output, &rendered, format)?;

    let report = &result.report;
    println!("{} -> {}", input.display(), output.display());
    println!(
        "  loudness {:.1} -> {:.1} LUFS, peak {:.1} -> {:.1} dBFS",
        report.input_lufs, report.output_lufs, report.input_peak_db, report.output_peak_db
    );
    println!(
        "  {} stages, {} skipped, {} ms, settings {}",
        report.stages_run.len(),
        report.stages_skipped.len(),
        report.elapsed_ms,
        report.fingerprint
    );
    for warning in &report.clamp_warnings {
        println!("  clamped: {warning}");
    }
    Ok(())
}

fn preset(genre: &str) -> Result<()> {
    let profile = genre_profile(genre);
    if canonical_genre(genre).is_none() {
        println!("'{genre}' has no profile of its own, showing {}", profile.name);
    }
    println!("{}: {}", profile.name, profile.description);
    println!(
        "  target {:.0} LUFS, DR {:.0} dB, width {:.1}",
        profile.target_lufs, profile.target_dr, profile.stereo_width
    );
    println!("{}", serde_json::to_string_pretty(&chain_preset(genre))?);
    Ok(())
}

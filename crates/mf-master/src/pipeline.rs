//! Offline mastering pipeline
//!
//! Runs the fixed chain over a whole buffer:
//! 1. EQ
//! 2. Masking correction
//! 3. Compression
//! 4. Saturation
//! 5. Exciter
//! 6. Stereo imaging
//! 7. Loudness normalization
//! 8. Dynamic range shaping
//! 9. Brick-wall limiter
//!
//! Settings are clamped first. Cancellation is checked before every stage;
//! EQ and the limiter always run, the rest run only when configured.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use mf_core::{AnalysisResult, AudioBuffer, MaskingAnalysis, MasteringSettings};
use mf_dsp::integrated_loudness;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::stages::{self, Stage};

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER INPUTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Analysis-derived context for a render
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Critical-band masking picture of the source
    pub masking: Option<MaskingAnalysis>,
    /// Genre used for loudness compliance
    pub genre: Option<String>,
}

impl RenderContext {
    pub fn from_analysis(analysis: &AnalysisResult) -> Self {
        Self {
            masking: Some(analysis.masking_analysis.clone()),
            genre: Some(analysis.genre.clone()),
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }
}

/// Cancellation flag and progress callback for one render
///
/// Progress receives the stage just finished and the overall fraction.
#[derive(Clone, Copy, Default)]
pub struct RenderControl<'a> {
    cancel: Option<&'a AtomicBool>,
    progress: Option<&'a (dyn Fn(Stage, f64) + Sync)>,
}

impl<'a> RenderControl<'a> {
    /// No cancellation, no progress
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_progress(mut self, progress: &'a (dyn Fn(Stage, f64) + Sync)) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn report(&self, stage: Stage, fraction: f64) {
        if let Some(progress) = self.progress {
            progress(stage, fraction);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// What happened during a render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    pub stages_run: Vec<Stage>,
    pub stages_skipped: Vec<Stage>,
    /// Parameters that were clamped into range
    pub clamp_warnings: Vec<String>,
    pub input_lufs: f64,
    pub output_lufs: f64,
    pub input_peak_db: f64,
    pub output_peak_db: f64,
    /// Gain applied by loudness normalization (dB)
    pub loudness_gain_db: Option<f64>,
    pub masking_boosts: usize,
    /// Fingerprint of the clamped settings
    pub fingerprint: String,
    pub elapsed_ms: u64,
}

/// Rendered audio plus its report
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub buffer: AudioBuffer,
    /// Settings after clamping, as rendered
    pub settings: MasteringSettings,
    pub report: RenderReport,
}

/// Stable short fingerprint of a settings value
///
/// First 16 hex digits of the SHA-256 of its JSON form.
pub fn settings_fingerprint(settings: &MasteringSettings) -> PipelineResult<String> {
    let bytes = serde_json::to_vec(settings)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(&digest[..8]))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Offline mastering pipeline
#[derive(Debug, Clone, Default)]
pub struct OfflineMasteringPipeline {
    config: PipelineConfig,
}

impl OfflineMasteringPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render `input` with `settings`
    ///
    /// Deterministic: the same input, settings and context always produce
    /// bit-identical output.
    pub fn run(
        &self,
        input: &AudioBuffer,
        settings: &MasteringSettings,
        context: &RenderContext,
        control: &RenderControl<'_>,
    ) -> PipelineResult<RenderOutput> {
        input.validate()?;
        let start = Instant::now();

        let (settings, warnings) = settings.clamped();
        let fingerprint = settings_fingerprint(&settings)?;

        let mut buffer = input.clone();
        let mut report = RenderReport {
            stages_run: Vec::with_capacity(Stage::ALL.len()),
            stages_skipped: Vec::new(),
            clamp_warnings: warnings.iter().map(ToString::to_string).collect(),
            input_lufs: integrated_loudness(input),
            output_lufs: 0.0,
            input_peak_db: input.peak_db(),
            output_peak_db: 0.0,
            loudness_gain_db: None,
            masking_boosts: 0,
            fingerprint,
            elapsed_ms: 0,
        };

        log::info!(
            "render {}: {} frames, {} ch @ {} Hz",
            report.fingerprint,
            input.frames(),
            input.channels,
            input.sample_rate
        );

        let total = Stage::ALL.len() as f64;
        for (i, stage) in Stage::ALL.into_iter().enumerate() {
            if control.is_cancelled() {
                log::info!("render {} cancelled before {stage}", report.fingerprint);
                return Err(PipelineError::Cancelled);
            }

            if self.run_stage(stage, &mut buffer, &settings, context, &mut report) {
                report.stages_run.push(stage);
            } else {
                log::debug!("stage {stage} skipped");
                report.stages_skipped.push(stage);
            }
            control.report(stage, (i + 1) as f64 / total);
        }

        report.output_lufs = integrated_loudness(&buffer);
        report.output_peak_db = buffer.peak_db();
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        log::info!(
            "render {} done in {} ms: {:.1} → {:.1} LUFS, peak {:.2} dBFS",
            report.fingerprint,
            report.elapsed_ms,
            report.input_lufs,
            report.output_lufs,
            report.output_peak_db
        );

        Ok(RenderOutput {
            buffer,
            settings,
            report,
        })
    }

    /// Run one stage; false when it had nothing to do
    fn run_stage(
        &self,
        stage: Stage,
        buffer: &mut AudioBuffer,
        settings: &MasteringSettings,
        context: &RenderContext,
        report: &mut RenderReport,
    ) -> bool {
        match stage {
            Stage::Eq => {
                stages::apply_eq(buffer, &settings.eq_settings);
                true
            }
            Stage::Masking => {
                let (Some(masking), Some(analysis)) = (settings.masking_settings, &context.masking)
                else {
                    return false;
                };
                if !masking.auto_correct {
                    return false;
                }
                let boosts = stages::masking_boosts(analysis, &masking, &self.config);
                if boosts.is_empty() {
                    return false;
                }
                report.masking_boosts = boosts.len();
                stages::apply_masking(buffer, &boosts);
                true
            }
            Stage::Compression => match &settings.compression_settings {
                Some(comp) => {
                    stages::apply_compression(buffer, comp);
                    true
                }
                None => false,
            },
            Stage::Saturation => match &settings.saturation_settings {
                Some(sat) => {
                    stages::apply_saturation(buffer, sat);
                    true
                }
                None => false,
            },
            Stage::Exciter => match &settings.exciter_settings {
                Some(exciter) => {
                    stages::apply_exciter(buffer, exciter);
                    true
                }
                None => false,
            },
            Stage::Stereo => settings
                .stereo_settings
                .is_some_and(|stereo| stages::apply_stereo(buffer, &stereo)),
            Stage::Loudness => {
                let Some(loudness) = settings.loudness_settings else {
                    return false;
                };
                let gain = stages::loudness_gain(buffer, &loudness, context.genre.as_deref(), &self.config);
                match gain {
                    Some(gain) => {
                        buffer.apply_gain(gain);
                        report.loudness_gain_db = Some(gain);
                        true
                    }
                    None => false,
                }
            }
            Stage::DynamicRange => {
                let Some(dr) = settings.dynamic_range_settings else {
                    return false;
                };
                match stages::dynamic_range_compressor(buffer, &dr, &self.config) {
                    Some(comp) => {
                        stages::apply_compression(buffer, &comp);
                        true
                    }
                    None => false,
                }
            }
            Stage::Limiter => {
                stages::apply_limiter(buffer, &settings.limiter());
                true
            }
        }
    }
}

//! The nine mastering stages
//!
//! Each stage transforms an [`AudioBuffer`] in place. Per-channel stages run
//! channels in parallel; channels never interact there, so output does not
//! depend on scheduling.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use mf_core::{
    AudioBuffer, CompressionSettings, DynamicRangeSettings, EqSettings, ExciterSettings,
    LimitingSettings, LoudnessSettings, MaskingAnalysis, MaskingSettings, SaturationSettings,
    StereoSettings, linear_to_db,
};
use mf_dsp::{
    BiquadCoeffs, BiquadTDF2, BrickwallLimiter, Compressor, Exciter, FrameProcessor,
    MonoProcessor, Saturator, StereoImager, StereoProcessor, correlation, integrated_loudness,
};

use crate::config::PipelineConfig;
use crate::presets::genre_profile;

// ═══════════════════════════════════════════════════════════════════════════════
// STAGE IDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Pipeline stage, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Eq,
    Masking,
    Compression,
    Saturation,
    Exciter,
    Stereo,
    Loudness,
    DynamicRange,
    Limiter,
}

impl Stage {
    /// Fixed processing order
    pub const ALL: [Stage; 9] = [
        Stage::Eq,
        Stage::Masking,
        Stage::Compression,
        Stage::Saturation,
        Stage::Exciter,
        Stage::Stereo,
        Stage::Loudness,
        Stage::DynamicRange,
        Stage::Limiter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Eq => "eq",
            Stage::Masking => "masking",
            Stage::Compression => "compression",
            Stage::Saturation => "saturation",
            Stage::Exciter => "exciter",
            Stage::Stereo => "stereo",
            Stage::Loudness => "loudness",
            Stage::DynamicRange => "dynamic_range",
            Stage::Limiter => "limiter",
        }
    }

    /// Position in [`Stage::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Run a fresh mono processor over every channel
fn per_channel<P, F>(buffer: &mut AudioBuffer, make: F)
where
    P: MonoProcessor,
    F: Fn() -> P + Sync,
{
    let mut planar = buffer.to_planar();
    planar.par_iter_mut().for_each(|channel| make().process_block(channel));
    buffer.write_planar(&planar);
}

/// Cascade of biquads over every channel
fn apply_filters(buffer: &mut AudioBuffer, coeffs: &[BiquadCoeffs]) {
    let mut planar = buffer.to_planar();
    planar.par_iter_mut().for_each(|channel| {
        for c in coeffs {
            BiquadTDF2::with_coeffs(*c).process_block(channel);
        }
    });
    buffer.write_planar(&planar);
}

// ═══════════════════════════════════════════════════════════════════════════════
// STAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// 1. Ten-band parametric EQ
pub fn apply_eq(buffer: &mut AudioBuffer, eq: &EqSettings) {
    let sr = buffer.sample_rate as f64;
    let coeffs: Vec<BiquadCoeffs> = eq
        .bands
        .iter()
        .filter(|band| band.gain != 0.0)
        .map(|band| BiquadCoeffs::from_band(band, sr))
        .collect();
    apply_filters(buffer, &coeffs);
}

/// A peaking boost derived from a masked critical band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskingBoost {
    pub center_hz: f64,
    pub q: f64,
    pub gain_db: f64,
}

/// Boosts for the most severely masked bands
///
/// Gain scales linearly with `sensitivity`; empty when boosting is off.
pub fn masking_boosts(
    masking: &MaskingAnalysis,
    settings: &MaskingSettings,
    config: &PipelineConfig,
) -> Vec<MaskingBoost> {
    let gain_db = settings.sensitivity.clamp(0.0, 1.0) * config.masking_boost_db;
    if !settings.boost_masked_frequencies || gain_db <= 0.0 {
        return Vec::new();
    }

    let mut masked: Vec<_> = masking
        .bands
        .iter()
        .filter(|b| b.is_masked && b.center_hz > config.masking_min_center_hz && b.bandwidth() > 0.0)
        .collect();
    masked.sort_by(|a, b| (b.threshold_db - b.energy_db).total_cmp(&(a.threshold_db - a.energy_db)));

    masked
        .into_iter()
        .take(config.max_masking_bands)
        .map(|b| MaskingBoost {
            center_hz: b.center_hz,
            q: b.center_hz / b.bandwidth(),
            gain_db,
        })
        .collect()
}

/// 2. Masking correction
pub fn apply_masking(buffer: &mut AudioBuffer, boosts: &[MaskingBoost]) {
    let sr = buffer.sample_rate as f64;
    let coeffs: Vec<BiquadCoeffs> = boosts
        .iter()
        .map(|b| BiquadCoeffs::peaking(b.center_hz, b.q, b.gain_db, sr))
        .collect();
    apply_filters(buffer, &coeffs);
}

/// 3. Stereo-linked compression
pub fn apply_compression(buffer: &mut AudioBuffer, settings: &CompressionSettings) {
    let mut comp = Compressor::from_settings(settings, buffer.sample_rate as f64);
    comp.process_interleaved(&mut buffer.samples, buffer.channels);
}

/// 4. Saturation
pub fn apply_saturation(buffer: &mut AudioBuffer, settings: &SaturationSettings) {
    per_channel(buffer, || Saturator::from_settings(settings));
}

/// 5. Harmonic exciter
pub fn apply_exciter(buffer: &mut AudioBuffer, settings: &ExciterSettings) {
    let sr = buffer.sample_rate as f64;
    per_channel(buffer, || Exciter::new(settings, sr));
}

/// 6. Width, phase correction and bass mono on the first two channels
///
/// Returns false (and leaves the buffer alone) for mono input.
pub fn apply_stereo(buffer: &mut AudioBuffer, settings: &StereoSettings) -> bool {
    if buffer.channels < 2 {
        return false;
    }
    let mut left = buffer.channel(0);
    let mut right = buffer.channel(1);

    let mut imager = StereoImager::from_settings(settings, buffer.sample_rate as f64);
    if settings.phase_correction {
        let corr = correlation(&left, &right);
        if corr < 0.0 {
            log::info!("phase correction: L/R correlation {corr:.2}, inverting right channel");
            imager.set_invert_right(true);
        }
    }

    imager.process_block(&mut left, &mut right);
    buffer.set_channel(0, &left);
    buffer.set_channel(1, &right);
    true
}

/// Gain (dB) that moves the buffer to its loudness target, if any
///
/// With `genre_compliance` the genre's target replaces `target_lufs`.
pub fn loudness_gain(
    buffer: &AudioBuffer,
    settings: &LoudnessSettings,
    genre: Option<&str>,
    config: &PipelineConfig,
) -> Option<f64> {
    if !settings.auto_adjust {
        return None;
    }
    let measured = integrated_loudness(buffer);
    if measured <= config.loudness_floor_lufs {
        log::debug!("loudness: input at {measured:.1} LUFS, too quiet to normalize");
        return None;
    }

    let target = loudness_target(settings, genre);
    let cap = config.loudness_gain_cap_db;
    let gain = (target - measured).clamp(-cap, cap);
    log::debug!("loudness: {measured:.1} LUFS → {target:.1} LUFS ({gain:+.1} dB)");
    Some(gain)
}

/// Loudness target (LUFS), honouring genre compliance
pub fn loudness_target(settings: &LoudnessSettings, genre: Option<&str>) -> f64 {
    match genre {
        Some(genre) if settings.genre_compliance => genre_profile(genre).target_lufs,
        _ => settings.target_lufs,
    }
}

/// Compressor that brings the crest factor toward the target, if needed
pub fn dynamic_range_compressor(
    buffer: &AudioBuffer,
    settings: &DynamicRangeSettings,
    config: &PipelineConfig,
) -> Option<CompressionSettings> {
    dynamic_range_shaping(linear_to_db(buffer.rms()), buffer.peak_db(), settings, config)
}

/// Crest-factor shaping from measured levels
///
/// Threshold sits half the target above RMS; ratio grows with the excess
/// crest factor up to `dr_max_ratio`.
pub fn dynamic_range_shaping(
    rms_db: f64,
    peak_db: f64,
    settings: &DynamicRangeSettings,
    config: &PipelineConfig,
) -> Option<CompressionSettings> {
    if !settings.auto_optimize {
        return None;
    }
    let dr = peak_db - rms_db;
    if dr <= settings.target_dr + config.dr_margin_db {
        return None;
    }

    Some(CompressionSettings {
        threshold: rms_db + settings.target_dr / 2.0,
        ratio: (1.0 + (dr - settings.target_dr) / 2.0).min(config.dr_max_ratio),
        attack: if settings.preserve_transients {
            config.dr_attack_preserve
        } else {
            config.dr_attack_tight
        },
        release: config.dr_release,
        makeup_gain: 0.0,
    })
}

/// 9. Brick-wall limiter
pub fn apply_limiter(buffer: &mut AudioBuffer, settings: &LimitingSettings) {
    let mut limiter = BrickwallLimiter::new(settings.ceiling, settings.release, buffer.sample_rate as f64);
    limiter.process_interleaved(&mut buffer.samples, buffer.channels);
}

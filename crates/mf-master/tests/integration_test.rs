//! Offline pipeline integration tests
//!
//! Renders resolved settings end to end:
//! - Determinism across runs
//! - Limiter ceiling on hot input
//! - Mono input through the stereo stage
//! - Loudness normalization and genre compliance
//! - Masking correction from analysis context

use std::f64::consts::PI;

use mf_core::{
    AudioBuffer, CriticalBand, LimitingSettings, LoudnessSettings, MaskingAnalysis,
    MaskingSettings, MasteringSettings, db_to_linear,
};
use mf_dsp::integrated_loudness;
use mf_master::{
    OfflineMasteringPipeline, RenderContext, RenderControl, SettingsResolver, Stage, chain_preset,
};

fn tone_mix(seconds: f64, gain: f64, channels: usize) -> AudioBuffer {
    let sr = 44100.0;
    let frames = (seconds * sr) as usize;
    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f64 / sr;
        let base = 0.5 * (2.0 * PI * 80.0 * t).sin()
            + 0.3 * (2.0 * PI * 440.0 * t).sin()
            + 0.1 * (2.0 * PI * 3500.0 * t).sin();
        for ch in 0..channels {
            let detune = 0.05 * (2.0 * PI * (660.0 + 7.0 * ch as f64) * t).sin();
            samples.push(gain * (base + detune));
        }
    }
    AudioBuffer::from_interleaved(samples, channels, 44100).unwrap()
}

fn render(audio: &AudioBuffer, settings: &MasteringSettings, context: &RenderContext) -> mf_master::RenderOutput {
    OfflineMasteringPipeline::default()
        .run(audio, settings, context, &RenderControl::none())
        .unwrap()
}

#[test]
fn test_full_chain_is_deterministic() {
    let audio = tone_mix(1.0, 0.8, 2);
    let settings = SettingsResolver::new().resolve(None, Some("rock"), Some(&chain_preset("rock")));
    let context = RenderContext::default().with_genre("rock");

    let a = render(&audio, &settings, &context);
    let b = render(&audio, &settings, &context);
    assert_eq!(a.buffer.samples, b.buffer.samples);
    assert_eq!(a.report.fingerprint, b.report.fingerprint);
}

#[test]
fn test_ceiling_holds_on_hot_input() {
    let audio = tone_mix(1.0, 2.5, 2);
    let mut settings = SettingsResolver::new().resolve(None, Some("electronic"), Some(&chain_preset("electronic")));
    settings.limiting_settings = Some(LimitingSettings {
        ceiling: -0.3,
        release: 0.05,
    });

    let out = render(&audio, &settings, &RenderContext::default().with_genre("electronic"));
    let ceiling = db_to_linear(-0.3);
    assert!(out.buffer.peak() <= ceiling, "peak {} over {}", out.buffer.peak(), ceiling);
    assert!(out.buffer.samples.iter().all(|s| s.is_finite()));
    assert!(out.report.stages_run.contains(&Stage::Limiter));
}

#[test]
fn test_mono_skips_stereo_stage() {
    let audio = tone_mix(0.5, 0.5, 1);
    let out = render(&audio, &MasteringSettings::neutral(), &RenderContext::default());
    assert_eq!(out.buffer.channels, 1);
    assert_eq!(out.buffer.frames(), audio.frames());
    assert!(out.report.stages_skipped.contains(&Stage::Stereo));
}

#[test]
fn test_loudness_reaches_target() {
    let audio = tone_mix(2.0, 0.05, 2);
    let settings = MasteringSettings {
        loudness_settings: Some(LoudnessSettings::default()),
        ..Default::default()
    };

    let out = render(&audio, &settings, &RenderContext::default());
    assert!(integrated_loudness(&audio) < -20.0);
    assert!((out.report.output_lufs + 14.0).abs() < 0.5, "output {} LUFS", out.report.output_lufs);
    assert!(out.report.loudness_gain_db.unwrap() > 0.0);
}

#[test]
fn test_genre_compliance_overrides_target() {
    let audio = tone_mix(2.0, 0.05, 2);
    let settings = MasteringSettings {
        loudness_settings: Some(LoudnessSettings {
            target_lufs: -9.0,
            auto_adjust: true,
            genre_compliance: true,
        }),
        ..Default::default()
    };

    // Classical targets -23 LUFS
    let out = render(&audio, &settings, &RenderContext::default().with_genre("classical"));
    assert!((out.report.output_lufs + 23.0).abs() < 0.5, "output {} LUFS", out.report.output_lufs);
}

#[test]
fn test_silence_is_left_quiet() {
    let audio = AudioBuffer::from_interleaved(vec![0.0; 44100 * 2], 2, 44100).unwrap();
    let out = render(&audio, &MasteringSettings::neutral(), &RenderContext::default());
    assert!(out.report.stages_skipped.contains(&Stage::Loudness));
    assert!(out.buffer.samples.iter().all(|s| *s == 0.0));
}

#[test]
fn test_masking_correction_uses_context() {
    let audio = tone_mix(0.5, 0.3, 2);
    let masking = MaskingAnalysis {
        bands: vec![
            CriticalBand {
                low_hz: 1080.0,
                high_hz: 1270.0,
                center_hz: 1170.0,
                energy_db: -70.0,
                threshold_db: -40.0,
                is_masked: true,
            },
            CriticalBand {
                low_hz: 2320.0,
                high_hz: 2700.0,
                center_hz: 2500.0,
                energy_db: -60.0,
                threshold_db: -50.0,
                is_masked: true,
            },
        ],
        recommendations: Vec::new(),
        total_masked_bands: 2,
    };
    let settings = MasteringSettings {
        masking_settings: Some(MaskingSettings {
            auto_correct: true,
            boost_masked_frequencies: true,
            sensitivity: 0.5,
        }),
        ..Default::default()
    };
    let context = RenderContext {
        masking: Some(masking),
        genre: None,
    };

    let out = render(&audio, &settings, &context);
    assert_eq!(out.report.masking_boosts, 2);
    assert!(out.report.stages_run.contains(&Stage::Masking));

    let without = render(&audio, &settings, &RenderContext::default());
    assert!(without.report.stages_skipped.contains(&Stage::Masking));
}

#[test]
fn test_low_sample_rate_keeps_canonical_eq() {
    let source = tone_mix(1.0, 0.6, 2);
    let audio = AudioBuffer::from_interleaved(source.samples, 2, 22050).unwrap();
    let mut settings = MasteringSettings::neutral();
    // 12 kHz and 16 kHz sit above Nyquist here
    settings.eq_settings.bands[8].gain = 3.0;
    settings.eq_settings.bands[9].gain = 4.0;

    let out = render(&audio, &settings, &RenderContext::default());
    assert!(out.settings.eq_settings.is_valid());
    let frequencies: Vec<f64> = out.settings.eq_settings.bands.iter().map(|b| b.frequency).collect();
    let expected: Vec<f64> = settings.eq_settings.bands.iter().map(|b| b.frequency).collect();
    assert_eq!(frequencies, expected);
    assert!(out.buffer.samples.iter().all(|s| s.is_finite()));
    assert!(out.buffer.peak() <= db_to_linear(out.settings.limiter().ceiling));
}

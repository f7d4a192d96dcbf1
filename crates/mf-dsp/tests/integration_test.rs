//! DSP Integration Tests
//!
//! Chains the mastering processors the way the offline renderer does and
//! checks signal integrity:
//! - EQ → Compressor → Saturator → Exciter → Stereo → Limiter
//! - No NaN/Inf on noise and full-scale input
//! - Limiter ceiling holds after every other stage

use mf_core::{
    CompressionSettings, EqSettings, ExciterSettings, HarmonicsMode, SaturationType,
    StereoSettings, db_to_linear,
};
use mf_dsp::biquad::{BiquadCoeffs, BiquadTDF2};
use mf_dsp::{
    BrickwallLimiter, Compressor, Exciter, FrameProcessor, MonoProcessor, Saturator,
    StereoImager, StereoProcessor,
};

const SAMPLE_RATE: f64 = 48000.0;

/// Generate test sine wave
fn generate_sine(samples: usize, freq: f64) -> Vec<f64> {
    (0..samples)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            (2.0 * std::f64::consts::PI * freq * t).sin()
        })
        .collect()
}

/// Generate white noise
fn generate_noise(samples: usize) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    (0..samples)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            i.hash(&mut hasher);
            let h = hasher.finish();
            (h as f64 / u64::MAX as f64) * 2.0 - 1.0
        })
        .collect()
}

/// Check signal has no NaN or Infinity
fn is_valid_signal(signal: &[f64]) -> bool {
    signal.iter().all(|&x| x.is_finite())
}

fn peak(signal: &[f64]) -> f64 {
    signal.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

fn run_chain(left: &mut [f64], right: &mut [f64], ceiling_db: f64) {
    let mut eq = EqSettings::default();
    eq.bands[0].gain = 6.0;
    eq.bands[5].gain = -3.0;
    eq.bands[9].gain = 4.0;

    for channel in [&mut *left, &mut *right] {
        for band in &eq.bands {
            let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::from_band(band, SAMPLE_RATE));
            filter.process_block(channel);
        }
    }

    let mut comp = Compressor::from_settings(
        &CompressionSettings {
            threshold: -18.0,
            ratio: 4.0,
            makeup_gain: 6.0,
            ..Default::default()
        },
        SAMPLE_RATE,
    );
    let mut sat = Saturator::new(SaturationType::Tape, 2.0, 0.4);
    let exciter_settings = ExciterSettings {
        drive: 2.0,
        frequency: 4000.0,
        harmonics: HarmonicsMode::Both,
        mix: 0.3,
    };
    let mut exciter_l = Exciter::new(&exciter_settings, SAMPLE_RATE);
    let mut exciter_r = Exciter::new(&exciter_settings, SAMPLE_RATE);
    let mut imager = StereoImager::from_settings(
        &StereoSettings {
            width: 1.6,
            phase_correction: false,
            bass_mono_freq: 120.0,
        },
        SAMPLE_RATE,
    );
    let mut limiter = BrickwallLimiter::new(ceiling_db, 0.05, SAMPLE_RATE);

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let mut frame = [*l, *r];
        comp.process_frame(&mut frame);
        frame[0] = exciter_l.process_sample(sat.process_sample(frame[0]));
        frame[1] = exciter_r.process_sample(sat.process_sample(frame[1]));
        let (nl, nr) = imager.process_sample(frame[0], frame[1]);
        let mut frame = [nl, nr];
        limiter.process_frame(&mut frame);
        *l = frame[0];
        *r = frame[1];
    }
}

#[test]
fn test_full_chain_on_noise() {
    let mut left = generate_noise(48000);
    let mut right: Vec<f64> = generate_noise(48001)[1..].to_vec();
    run_chain(&mut left, &mut right, -1.0);

    assert!(is_valid_signal(&left));
    assert!(is_valid_signal(&right));
    assert!(peak(&left) <= db_to_linear(-1.0));
    assert!(peak(&right) <= db_to_linear(-1.0));
}

#[test]
fn test_full_chain_on_hot_sine() {
    let mut left: Vec<f64> = generate_sine(48000, 100.0).iter().map(|x| x * 1.5).collect();
    let mut right = generate_sine(48000, 1000.0);
    run_chain(&mut left, &mut right, -0.3);

    let ceiling = db_to_linear(-0.3);
    assert!(peak(&left) <= ceiling);
    assert!(peak(&right) <= ceiling);
    assert!(peak(&left) > 0.5, "chain should not collapse the signal");
}

#[test]
fn test_chain_is_deterministic() {
    let input = generate_noise(12000);
    let mut a = (input.clone(), input.clone());
    let mut b = (input.clone(), input);
    run_chain(&mut a.0, &mut a.1, -0.3);
    run_chain(&mut b.0, &mut b.1, -0.3);
    assert_eq!(a, b);
}

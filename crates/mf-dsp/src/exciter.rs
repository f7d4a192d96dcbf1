//! Harmonic exciter
//!
//! Isolates the band above a corner frequency, drives it through a
//! harmonic generator and adds the high-passed result back on top of the
//! dry signal.

use mf_core::{ExciterSettings, HarmonicsMode};

use crate::biquad::{BiquadCoeffs, BiquadTDF2};
use crate::{MonoProcessor, Processor};

const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Single-channel exciter
#[derive(Debug, Clone)]
pub struct Exciter {
    harmonics: HarmonicsMode,
    drive: f64,
    mix: f64,
    /// Band isolation before the generator
    pre: BiquadTDF2,
    /// Removes DC and sub-band products after the generator
    post: BiquadTDF2,
}

impl Exciter {
    pub fn new(settings: &ExciterSettings, sample_rate: f64) -> Self {
        let coeffs = BiquadCoeffs::highpass(settings.frequency, BUTTERWORTH_Q, sample_rate);
        Self {
            harmonics: settings.harmonics,
            drive: settings.drive,
            mix: settings.mix.clamp(0.0, 1.0),
            pre: BiquadTDF2::with_coeffs(coeffs),
            post: BiquadTDF2::with_coeffs(coeffs),
        }
    }

    /// Update parameters, keeping filter state
    pub fn set_params(&mut self, settings: &ExciterSettings, sample_rate: f64) {
        let coeffs = BiquadCoeffs::highpass(settings.frequency, BUTTERWORTH_Q, sample_rate);
        self.pre.set_coeffs(coeffs);
        self.post.set_coeffs(coeffs);
        self.harmonics = settings.harmonics;
        self.drive = settings.drive;
        self.mix = settings.mix.clamp(0.0, 1.0);
    }

    #[inline]
    fn generate(&self, h: f64) -> f64 {
        let v = self.drive * h;
        match self.harmonics {
            HarmonicsMode::Even => v.abs(),
            HarmonicsMode::Odd => v.tanh(),
            HarmonicsMode::Both => 0.5 * (v.abs() + v.tanh()),
        }
    }
}

impl Processor for Exciter {
    fn reset(&mut self) {
        self.pre.reset();
        self.post.reset();
    }
}

impl MonoProcessor for Exciter {
    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        let band = self.pre.process_sample(input);
        let harmonics = self.post.process_sample(self.generate(band));
        input + self.mix * harmonics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f64 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_zero_mix_is_dry() {
        let settings = ExciterSettings::default();
        let mut exciter = Exciter::new(&settings, 48000.0);
        let input = sine(5000.0, 1024);
        let mut out = input.clone();
        exciter.process_block(&mut out);
        assert_eq!(input, out);
    }

    #[test]
    fn test_low_content_untouched() {
        let settings = ExciterSettings {
            mix: 1.0,
            frequency: 5000.0,
            ..Default::default()
        };
        let mut exciter = Exciter::new(&settings, 48000.0);
        let input = sine(80.0, 48000);
        let mut out = input.clone();
        exciter.process_block(&mut out);
        let diff = input
            .iter()
            .zip(out.iter())
            .skip(24000)
            .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()));
        assert!(diff < 0.01, "exciter changed bass by {diff}");
    }

    fn tone_magnitude(signal: &[f64], freq: f64) -> f64 {
        let (mut re, mut im) = (0.0, 0.0);
        for (n, x) in signal.iter().enumerate() {
            let phase = 2.0 * PI * freq * n as f64 / 48000.0;
            re += x * phase.cos();
            im -= x * phase.sin();
        }
        2.0 * (re * re + im * im).sqrt() / signal.len() as f64
    }

    #[test]
    fn test_even_mode_adds_second_harmonic() {
        let settings = ExciterSettings {
            mix: 0.5,
            drive: 2.0,
            frequency: 3000.0,
            harmonics: HarmonicsMode::Even,
        };
        let mut exciter = Exciter::new(&settings, 48000.0);
        let input = sine(4000.0, 9600);
        let mut out = input.clone();
        exciter.process_block(&mut out);

        let added: Vec<f64> = out.iter().zip(input.iter()).map(|(o, i)| o - i).skip(4800).collect();
        assert!(tone_magnitude(&added, 8000.0) > 0.05);
        assert!(tone_magnitude(&added, 4000.0) < 0.01);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}

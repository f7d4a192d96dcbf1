//! Stereo imaging
//!
//! Features:
//! - Mid/side width scaling (0 = mono, 1 = unchanged, 2 = double side)
//! - Bass mono: the side channel is high-passed with a Linkwitz-Riley
//!   (two cascaded Butterworth) filter so lows collapse to mono
//! - Pearson correlation helper for analysis and phase correction

use mf_core::StereoSettings;

use crate::biquad::{BiquadCoeffs, BiquadTDF2};
use crate::{MonoProcessor, Processor, StereoProcessor};

const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Linkwitz-Riley high-pass made of two identical Butterworth sections
#[derive(Debug, Clone)]
struct LinkwitzRileyHighpass {
    stage1: BiquadTDF2,
    stage2: BiquadTDF2,
}

impl LinkwitzRileyHighpass {
    fn new(freq: f64, sample_rate: f64) -> Self {
        let coeffs = BiquadCoeffs::highpass(freq, BUTTERWORTH_Q, sample_rate);
        Self {
            stage1: BiquadTDF2::with_coeffs(coeffs),
            stage2: BiquadTDF2::with_coeffs(coeffs),
        }
    }

    fn set_freq(&mut self, freq: f64, sample_rate: f64) {
        let coeffs = BiquadCoeffs::highpass(freq, BUTTERWORTH_Q, sample_rate);
        self.stage1.set_coeffs(coeffs);
        self.stage2.set_coeffs(coeffs);
    }

    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let y = self.stage1.process_sample(x);
        self.stage2.process_sample(y)
    }

    fn reset(&mut self) {
        self.stage1.reset();
        self.stage2.reset();
    }
}

/// Stereo width + bass mono processor
#[derive(Debug, Clone)]
pub struct StereoImager {
    width: f64,
    /// Polarity of the right channel (-1 when phase-corrected)
    right_polarity: f64,
    bass_mono: Option<LinkwitzRileyHighpass>,
    sample_rate: f64,
}

impl StereoImager {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            width: 1.0,
            right_polarity: 1.0,
            bass_mono: None,
            sample_rate,
        }
    }

    pub fn from_settings(settings: &StereoSettings, sample_rate: f64) -> Self {
        let mut imager = Self::new(sample_rate);
        imager.set_width(settings.width);
        imager.set_bass_mono(settings.bass_mono_freq);
        imager
    }

    /// Set width (0 = mono, 1 = normal, 2 = double)
    pub fn set_width(&mut self, width: f64) {
        self.width = width.max(0.0);
    }

    /// Corner for bass mono; 0 disables
    pub fn set_bass_mono(&mut self, freq: f64) {
        if freq <= 0.0 {
            self.bass_mono = None;
            return;
        }
        match self.bass_mono.as_mut() {
            Some(hp) => hp.set_freq(freq, self.sample_rate),
            None => self.bass_mono = Some(LinkwitzRileyHighpass::new(freq, self.sample_rate)),
        }
    }

    /// Flip the right channel's polarity before M/S processing
    pub fn set_invert_right(&mut self, invert: bool) {
        self.right_polarity = if invert { -1.0 } else { 1.0 };
    }
}

impl Processor for StereoImager {
    fn reset(&mut self) {
        if let Some(hp) = self.bass_mono.as_mut() {
            hp.reset();
        }
    }
}

impl StereoProcessor for StereoImager {
    #[inline]
    fn process_sample(&mut self, left: f64, right: f64) -> (f64, f64) {
        let right = right * self.right_polarity;
        let mid = (left + right) * 0.5;
        let mut side = (left - right) * 0.5;

        if let Some(hp) = self.bass_mono.as_mut() {
            side = hp.process(side);
        }
        side *= self.width;

        (mid + side, mid - side)
    }
}

/// Pearson correlation of two equal-length signals (1.0 when either is constant)
pub fn correlation(left: &[f64], right: &[f64]) -> f64 {
    let n = left.len().min(right.len());
    if n == 0 {
        return 1.0;
    }
    let mean_l = left[..n].iter().sum::<f64>() / n as f64;
    let mean_r = right[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_l, mut var_r) = (0.0, 0.0, 0.0);
    for (l, r) in left[..n].iter().zip(&right[..n]) {
        let dl = l - mean_l;
        let dr = r - mean_r;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }

    let denom = (var_l * var_r).sqrt();
    if denom < 1e-20 {
        1.0
    } else {
        (cov / denom).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_unity_width_is_transparent() {
        let mut imager = StereoImager::new(48000.0);
        let (l, r) = imager.process_sample(0.3, -0.1);
        assert_relative_eq!(l, 0.3, epsilon = 1e-12);
        assert_relative_eq!(r, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_width_is_mono() {
        let mut imager = StereoImager::new(48000.0);
        imager.set_width(0.0);
        let (l, r) = imager.process_sample(0.5, -0.1);
        assert_relative_eq!(l, r);
        assert_relative_eq!(l, 0.2);
    }

    #[test]
    fn test_bass_mono_removes_low_side() {
        let settings = StereoSettings {
            width: 1.0,
            phase_correction: false,
            bass_mono_freq: 200.0,
        };
        let mut imager = StereoImager::from_settings(&settings, 48000.0);

        // 50 Hz with opposite polarity is pure side content
        let mut max_side: f64 = 0.0;
        for i in 0..48000 {
            let x = 0.5 * (2.0 * PI * 50.0 * i as f64 / 48000.0).sin();
            let (l, r) = imager.process_sample(x, -x);
            if i > 24000 {
                max_side = max_side.max(((l - r) * 0.5).abs());
            }
        }
        assert!(max_side < 0.05, "side still {max_side}");
    }

    #[test]
    fn test_correlation() {
        let a: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.1).sin()).collect();
        let b: Vec<f64> = a.iter().map(|x| -x).collect();
        assert_relative_eq!(correlation(&a, &a), 1.0, epsilon = 1e-12);
        assert_relative_eq!(correlation(&a, &b), -1.0, epsilon = 1e-12);
        assert_eq!(correlation(&[0.0; 10], &a[..10]), 1.0);
    }
}

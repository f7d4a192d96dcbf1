//! Dynamics processors
//!
//! Features:
//! - Feed-forward compressor with stereo-linked peak detection
//! - Brick-wall limiter with instant attack and a hard output guarantee

use mf_core::{CompressionSettings, db_to_linear, linear_to_db};

use crate::{FrameProcessor, Processor};

/// One-pole coefficient for a time constant in seconds
#[inline]
pub fn time_coeff(seconds: f64, sample_rate: f64) -> f64 {
    let samples = seconds * sample_rate;
    if samples <= 0.0 {
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}

/// Feed-forward compressor, hard knee, linked across channels
#[derive(Debug, Clone)]
pub struct Compressor {
    /// Threshold (dB)
    threshold: f64,
    ratio: f64,
    attack_coeff: f64,
    release_coeff: f64,
    /// Makeup (linear)
    makeup: f64,
    /// Smoothed gain reduction (dB, >= 0)
    gain_reduction: f64,
    sample_rate: f64,
}

impl Compressor {
    pub fn new(sample_rate: f64) -> Self {
        Self::from_settings(&CompressionSettings::default(), sample_rate)
    }

    pub fn from_settings(settings: &CompressionSettings, sample_rate: f64) -> Self {
        let mut comp = Self {
            threshold: 0.0,
            ratio: 1.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            makeup: 1.0,
            gain_reduction: 0.0,
            sample_rate,
        };
        comp.set_params(
            settings.threshold,
            settings.ratio,
            settings.attack,
            settings.release,
            settings.makeup_gain,
        );
        comp
    }

    /// Update parameters without touching the envelope
    pub fn set_params(&mut self, threshold: f64, ratio: f64, attack: f64, release: f64, makeup_db: f64) {
        self.threshold = threshold;
        self.ratio = ratio.max(1.0);
        self.attack_coeff = time_coeff(attack, self.sample_rate);
        self.release_coeff = time_coeff(release, self.sample_rate);
        self.makeup = db_to_linear(makeup_db);
    }

    /// Static curve: gain reduction (dB) for a detector level
    #[inline]
    pub fn static_reduction(&self, level_db: f64) -> f64 {
        let over = level_db - self.threshold;
        if over > 0.0 {
            over * (1.0 - 1.0 / self.ratio)
        } else {
            0.0
        }
    }

    /// Current gain reduction (dB)
    pub fn gain_reduction(&self) -> f64 {
        self.gain_reduction
    }

    /// Gain for the next frame given its detector peak
    #[inline]
    fn next_gain(&mut self, peak: f64) -> f64 {
        let target = self.static_reduction(linear_to_db(peak));
        let coeff = if target > self.gain_reduction {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain_reduction = coeff * self.gain_reduction + (1.0 - coeff) * target;
        db_to_linear(-self.gain_reduction) * self.makeup
    }
}

impl Processor for Compressor {
    fn reset(&mut self) {
        self.gain_reduction = 0.0;
    }
}

impl FrameProcessor for Compressor {
    #[inline]
    fn process_frame(&mut self, frame: &mut [f64]) {
        let peak = frame.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
        let gain = self.next_gain(peak);
        for s in frame.iter_mut() {
            *s *= gain;
        }
    }
}

/// Brick-wall limiter
///
/// Attack is instantaneous, so the gain never lets a sample past the
/// ceiling; a final clamp absorbs rounding.
#[derive(Debug, Clone)]
pub struct BrickwallLimiter {
    /// Ceiling (linear)
    ceiling: f64,
    release_coeff: f64,
    gain: f64,
    sample_rate: f64,
}

impl BrickwallLimiter {
    pub fn new(ceiling_db: f64, release: f64, sample_rate: f64) -> Self {
        Self {
            ceiling: db_to_linear(ceiling_db),
            release_coeff: time_coeff(release, sample_rate),
            gain: 1.0,
            sample_rate,
        }
    }

    pub fn set_params(&mut self, ceiling_db: f64, release: f64) {
        self.ceiling = db_to_linear(ceiling_db);
        self.release_coeff = time_coeff(release, self.sample_rate);
    }

    /// Ceiling as linear amplitude
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Current gain reduction (dB)
    pub fn gain_reduction(&self) -> f64 {
        -linear_to_db(self.gain)
    }
}

impl Processor for BrickwallLimiter {
    fn reset(&mut self) {
        self.gain = 1.0;
    }
}

impl FrameProcessor for BrickwallLimiter {
    #[inline]
    fn process_frame(&mut self, frame: &mut [f64]) {
        let peak = frame.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
        let required = if peak > self.ceiling {
            self.ceiling / peak
        } else {
            1.0
        };

        if required < self.gain {
            self.gain = required;
        } else {
            // Release moves toward `required` from below and never passes it
            self.gain = self.release_coeff * self.gain + (1.0 - self.release_coeff) * required;
        }

        let ceiling = self.ceiling;
        for s in frame.iter_mut() {
            *s = (*s * self.gain).clamp(-ceiling, ceiling);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compressor_reduces_loud_signal() {
        let settings = CompressionSettings {
            threshold: -12.0,
            ratio: 4.0,
            ..Default::default()
        };
        let mut comp = Compressor::from_settings(&settings, 48000.0);

        let mut frame = [0.8, 0.8];
        for _ in 0..4800 {
            frame = [0.8, 0.8];
            comp.process_frame(&mut frame);
        }
        // 0.8 is -1.94 dB, 10.06 dB over; 3/4 of that is removed
        assert_relative_eq!(comp.gain_reduction(), 7.545, epsilon = 0.05);
        assert!(frame[0] < 0.8);
        assert_eq!(frame[0], frame[1]);
    }

    #[test]
    fn test_compressor_below_threshold() {
        let mut comp = Compressor::new(48000.0);
        let mut frame = [0.1];
        for _ in 0..1000 {
            frame = [0.1];
            comp.process_frame(&mut frame);
        }
        assert_relative_eq!(frame[0], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_makeup_gain() {
        let settings = CompressionSettings {
            threshold: 0.0,
            makeup_gain: 6.0,
            ..Default::default()
        };
        let mut comp = Compressor::from_settings(&settings, 48000.0);
        let mut frame = [0.25];
        comp.process_frame(&mut frame);
        assert_relative_eq!(frame[0], 0.25 * db_to_linear(6.0), epsilon = 1e-12);
    }

    #[test]
    fn test_limiter_never_exceeds_ceiling() {
        let mut limiter = BrickwallLimiter::new(-0.3, 0.05, 48000.0);
        let ceiling = db_to_linear(-0.3);
        let mut samples: Vec<f64> = (0..48000)
            .map(|i| 1.8 * (i as f64 * 0.05).sin() * if i % 1000 < 10 { 2.0 } else { 1.0 })
            .collect();
        limiter.process_interleaved(&mut samples, 2);
        let peak = samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
        assert!(peak <= ceiling, "peak {peak} above ceiling {ceiling}");
        assert!(limiter.gain_reduction() > 0.0);
    }

    #[test]
    fn test_limiter_releases() {
        let mut limiter = BrickwallLimiter::new(-6.0, 0.01, 48000.0);
        let mut loud = [1.0];
        limiter.process_frame(&mut loud);
        assert_relative_eq!(loud[0], db_to_linear(-6.0), epsilon = 1e-12);

        let mut quiet = [0.1];
        for _ in 0..48000 {
            quiet = [0.1];
            limiter.process_frame(&mut quiet);
        }
        assert_relative_eq!(quiet[0], 0.1, epsilon = 1e-6);
    }
}

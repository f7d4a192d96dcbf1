//! Biquad filter implementation using Transposed Direct Form II
//!
//! TDF-II keeps quantization noise low in floating point.
//! Coefficients follow the RBJ audio EQ cookbook, normalized by a0.

use std::f64::consts::PI;

use mf_core::{EqBand, EqBandType, bounds};

use crate::{MonoProcessor, Processor};

/// Biquad coefficients
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

struct Prototype {
    cos_omega: f64,
    alpha: f64,
}

impl Prototype {
    fn new(freq: f64, q: f64, sample_rate: f64) -> Self {
        // Keep the center strictly inside (0, nyquist)
        let freq = freq.clamp(1.0, sample_rate * 0.499);
        let omega = 2.0 * PI * freq / sample_rate;
        Self {
            cos_omega: omega.cos(),
            alpha: omega.sin() / (2.0 * q.max(1e-3)),
        }
    }
}

impl BiquadCoeffs {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Calculate lowpass filter coefficients
    pub fn lowpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let Prototype { cos_omega, alpha } = Prototype::new(freq, q, sample_rate);
        Self::normalized(
            (1.0 - cos_omega) / 2.0,
            1.0 - cos_omega,
            (1.0 - cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Calculate highpass filter coefficients
    pub fn highpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let Prototype { cos_omega, alpha } = Prototype::new(freq, q, sample_rate);
        Self::normalized(
            (1.0 + cos_omega) / 2.0,
            -(1.0 + cos_omega),
            (1.0 + cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Calculate peaking EQ filter coefficients
    pub fn peaking(freq: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let Prototype { cos_omega, alpha } = Prototype::new(freq, q, sample_rate);
        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos_omega,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_omega,
            1.0 - alpha / a,
        )
    }

    /// Calculate low shelf filter coefficients
    pub fn low_shelf(freq: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let Prototype { cos_omega, alpha } = Prototype::new(freq, q, sample_rate);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
            a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha),
            (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
            (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha,
        )
    }

    /// Calculate high shelf filter coefficients
    pub fn high_shelf(freq: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let Prototype { cos_omega, alpha } = Prototype::new(freq, q, sample_rate);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
            a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
            (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
        )
    }

    /// Coefficients for an EQ band of the given shape
    pub fn eq_band(
        band_type: EqBandType,
        freq: f64,
        q: f64,
        gain_db: f64,
        sample_rate: f64,
    ) -> Self {
        let freq = freq.min(sample_rate * bounds::EQ_MAX_FREQ_RATIO);
        match band_type {
            EqBandType::LowShelf => Self::low_shelf(freq, q, gain_db, sample_rate),
            EqBandType::Peak => Self::peaking(freq, q, gain_db, sample_rate),
            EqBandType::HighShelf => Self::high_shelf(freq, q, gain_db, sample_rate),
        }
    }

    /// Coefficients for a settings EQ band
    pub fn from_band(band: &EqBand, sample_rate: f64) -> Self {
        Self::eq_band(band.band_type, band.frequency, band.q, band.gain, sample_rate)
    }

    /// Bypass (unity gain, no filtering)
    pub fn bypass() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

/// Transposed Direct Form II biquad filter
#[derive(Debug, Clone)]
pub struct BiquadTDF2 {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl BiquadTDF2 {
    pub fn new() -> Self {
        Self::with_coeffs(BiquadCoeffs::bypass())
    }

    pub fn with_coeffs(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Swap coefficients while keeping filter state
    #[inline]
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }
}

impl Default for BiquadTDF2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for BiquadTDF2 {
    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl MonoProcessor for BiquadTDF2 {
    #[inline(always)]
    fn process_sample(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.z1;
        self.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.z2;
        self.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f64, sample_rate: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    fn steady_peak(filter: &mut BiquadTDF2, input: &[f64]) -> f64 {
        let mut out = input.to_vec();
        filter.process_block(&mut out);
        out[out.len() / 2..]
            .iter()
            .fold(0.0_f64, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_zero_gain_is_transparent() {
        let input = sine(1000.0, 48000.0, 4800);
        for band_type in [EqBandType::LowShelf, EqBandType::Peak, EqBandType::HighShelf] {
            let mut filter =
                BiquadTDF2::with_coeffs(BiquadCoeffs::eq_band(band_type, 1000.0, 1.0, 0.0, 48000.0));
            let mut out = input.clone();
            filter.process_block(&mut out);
            for (a, b) in input.iter().zip(out.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_peaking_gain_at_center() {
        let input = sine(1000.0, 48000.0, 48000);
        let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::peaking(1000.0, 1.0, 6.0, 48000.0));
        let peak = steady_peak(&mut filter, &input);
        assert_relative_eq!(peak, 10.0_f64.powf(6.0 / 20.0), epsilon = 0.01);
    }

    #[test]
    fn test_lowpass_attenuates_highs() {
        let input = sine(10000.0, 48000.0, 48000);
        let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::lowpass(200.0, 0.707, 48000.0));
        assert!(steady_peak(&mut filter, &input) < 0.01);
    }

    #[test]
    fn test_highpass_attenuates_lows() {
        let input = sine(50.0, 48000.0, 48000);
        let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::highpass(3000.0, 0.707, 48000.0));
        assert!(steady_peak(&mut filter, &input) < 0.01);
    }

    #[test]
    fn test_band_above_nyquist_is_limited() {
        let limited = BiquadCoeffs::eq_band(EqBandType::HighShelf, 16000.0, 0.7, 4.0, 22050.0);
        let at_limit = BiquadCoeffs::eq_band(EqBandType::HighShelf, 22050.0 * 0.45, 0.7, 4.0, 22050.0);
        assert_eq!(limited, at_limit);

        let input = sine(1000.0, 22050.0, 22050);
        let mut filter = BiquadTDF2::with_coeffs(limited);
        let peak = steady_peak(&mut filter, &input);
        assert!(peak.is_finite() && peak < 2.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = BiquadTDF2::with_coeffs(BiquadCoeffs::lowpass(500.0, 0.707, 48000.0));
        filter.process_sample(1.0);
        filter.reset();
        assert_eq!(filter.process_sample(0.0), 0.0);
    }
}

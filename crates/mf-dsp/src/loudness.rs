//! Loudness measurement
//!
//! ITU-R BS.1770-4 integrated loudness:
//! - K-weighting (high shelf + RLB high-pass) designed for the actual rate
//! - 400 ms gating blocks with 75% overlap, built from 100 ms sub-blocks
//! - Absolute gate at -70 LUFS, relative gate 10 LU below the ungated mean

use mf_core::AudioBuffer;

use crate::biquad::{BiquadCoeffs, BiquadTDF2};
use crate::{MonoProcessor, Processor};

/// Floor reported for silence or fully gated programme
pub const LUFS_FLOOR: f64 = -70.0;

const ABSOLUTE_GATE: f64 = -70.0;
const RELATIVE_GATE: f64 = -10.0;

/// K-weighting pre-filter for one channel
#[derive(Debug, Clone)]
pub struct KWeighting {
    shelf: BiquadTDF2,
    highpass: BiquadTDF2,
}

impl KWeighting {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            shelf: BiquadTDF2::with_coeffs(BiquadCoeffs::high_shelf(
                1681.974_450_955_533,
                0.707_175_236_955_419_6,
                3.999_843_853_973_347,
                sample_rate,
            )),
            highpass: BiquadTDF2::with_coeffs(BiquadCoeffs::highpass(
                38.135_470_876_024_44,
                0.500_327_037_323_877_3,
                sample_rate,
            )),
        }
    }
}

impl Processor for KWeighting {
    fn reset(&mut self) {
        self.shelf.reset();
        self.highpass.reset();
    }
}

impl MonoProcessor for KWeighting {
    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        let shelved = self.shelf.process_sample(input);
        self.highpass.process_sample(shelved)
    }
}

#[inline]
fn power_to_lufs(power: f64) -> f64 {
    -0.691 + 10.0 * power.max(1e-20).log10()
}

/// Integrated loudness of a buffer (LUFS, floored at -70)
pub fn integrated_loudness(buffer: &AudioBuffer) -> f64 {
    let channels = buffer.channels;
    let sub_block = (buffer.sample_rate as usize / 10).max(1);
    if channels == 0 || buffer.frames() < sub_block * 4 {
        return LUFS_FLOOR;
    }

    let mut filters: Vec<KWeighting> = (0..channels)
        .map(|_| KWeighting::new(buffer.sample_rate as f64))
        .collect();

    // Summed channel mean-square per 100 ms sub-block
    let mut sub_blocks = Vec::with_capacity(buffer.frames() / sub_block + 1);
    let mut acc = 0.0;
    let mut count = 0usize;
    for frame in buffer.samples.chunks_exact(channels) {
        for (s, filter) in frame.iter().zip(filters.iter_mut()) {
            let y = filter.process_sample(*s);
            acc += y * y;
        }
        count += 1;
        if count == sub_block {
            sub_blocks.push(acc / count as f64);
            acc = 0.0;
            count = 0;
        }
    }

    // 400 ms blocks, hop 100 ms
    let blocks: Vec<f64> = sub_blocks
        .windows(4)
        .map(|w| w.iter().sum::<f64>() / 4.0)
        .filter(|&p| power_to_lufs(p) > ABSOLUTE_GATE)
        .collect();
    if blocks.is_empty() {
        return LUFS_FLOOR;
    }

    let ungated = blocks.iter().sum::<f64>() / blocks.len() as f64;
    let relative = power_to_lufs(ungated) + RELATIVE_GATE;
    let gated: Vec<f64> = blocks
        .into_iter()
        .filter(|&p| power_to_lufs(p) > relative)
        .collect();
    if gated.is_empty() {
        return LUFS_FLOOR;
    }

    power_to_lufs(gated.iter().sum::<f64>() / gated.len() as f64).max(LUFS_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn sine_buffer(freq: f64, amplitude: f64, seconds: f64, channels: usize) -> AudioBuffer {
        let sr = 48000;
        let frames = (seconds * sr as f64) as usize;
        let mut samples = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            let s = amplitude * (2.0 * PI * freq * i as f64 / sr as f64).sin();
            for _ in 0..channels {
                samples.push(s);
            }
        }
        AudioBuffer::from_interleaved(samples, channels, sr).unwrap()
    }

    #[test]
    fn test_reference_tone() {
        // A 1 kHz sine peaking at -20 dBFS in one channel reads -23 LUFS
        let buffer = sine_buffer(1000.0, 0.1, 5.0, 1);
        let lufs = integrated_loudness(&buffer);
        assert_abs_diff_eq!(lufs, -23.0, epsilon = 0.5);
    }

    #[test]
    fn test_stereo_adds_3db() {
        let mono = integrated_loudness(&sine_buffer(1000.0, 0.1, 3.0, 1));
        let stereo = integrated_loudness(&sine_buffer(1000.0, 0.1, 3.0, 2));
        assert_abs_diff_eq!(stereo - mono, 3.01, epsilon = 0.05);
    }

    #[test]
    fn test_silence_and_short_input() {
        assert_eq!(integrated_loudness(&sine_buffer(1000.0, 0.0, 2.0, 2)), LUFS_FLOOR);
        assert_eq!(integrated_loudness(&sine_buffer(1000.0, 0.5, 0.2, 1)), LUFS_FLOOR);
    }

    #[test]
    fn test_gain_shifts_loudness() {
        let mut buffer = sine_buffer(440.0, 0.2, 3.0, 2);
        let before = integrated_loudness(&buffer);
        buffer.apply_gain(-6.0);
        let after = integrated_loudness(&buffer);
        assert_abs_diff_eq!(before - after, 6.0, epsilon = 0.05);
    }
}

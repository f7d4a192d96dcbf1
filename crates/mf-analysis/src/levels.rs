//! Level measurements

use mf_core::{AudioBuffer, LoudnessData, linear_to_db};
use mf_dsp::integrated_loudness;

/// RMS/peak/LUFS summary of a buffer
pub fn measure(buffer: &AudioBuffer) -> LoudnessData {
    let rms_db = linear_to_db(buffer.rms());
    let peak_db = linear_to_db(buffer.peak());
    LoudnessData {
        rms_db,
        peak_db,
        lufs_approx: rms_db + 3.0,
        lufs_integrated: integrated_loudness(buffer),
        dynamic_range: peak_db - rms_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_sine_levels() {
        let samples: Vec<f64> = (0..96000)
            .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f64 / 48000.0).sin())
            .collect();
        let buffer = AudioBuffer::from_interleaved(samples, 1, 48000).unwrap();
        let data = measure(&buffer);

        assert_abs_diff_eq!(data.peak_db, -6.02, epsilon = 0.01);
        assert_abs_diff_eq!(data.rms_db, -9.03, epsilon = 0.01);
        // Crest factor of a sine is 3.01 dB
        assert_abs_diff_eq!(data.dynamic_range, 3.01, epsilon = 0.01);
        assert_abs_diff_eq!(data.lufs_approx, data.rms_db + 3.0);
        assert!(data.lufs_integrated > -15.0 && data.lufs_integrated < -8.0);
    }
}

//! Feature extraction end to end

use approx::assert_abs_diff_eq;
use mf_analysis::{AnalysisConfig, FeatureExtractor};
use mf_core::{AudioBuffer, BandLabel};

const SAMPLE_RATE: u32 = 44100;

fn generate_sine(seconds: f64, freq: f64, amp: f64) -> Vec<f64> {
    (0..(seconds * SAMPLE_RATE as f64) as usize)
        .map(|i| amp * (2.0 * std::f64::consts::PI * freq * i as f64 / SAMPLE_RATE as f64).sin())
        .collect()
}

fn generate_noise(samples: usize, seed: u64) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    (0..samples)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            (seed, i).hash(&mut hasher);
            let h = hasher.finish();
            ((h as f64 / u64::MAX as f64) * 2.0 - 1.0) * 0.3
        })
        .collect()
}

#[test]
fn test_mono_sine_analysis() {
    let audio = AudioBuffer::from_interleaved(generate_sine(2.0, 440.0, 0.5), 1, SAMPLE_RATE).unwrap();
    let result = FeatureExtractor::default().extract(&audio).unwrap();

    assert_abs_diff_eq!(result.loudness.peak_db, -6.02, epsilon = 0.05);
    assert!(result.stereo_analysis.is_mono);
    assert_abs_diff_eq!(result.spectral_features.spectral_centroid, 440.0, epsilon = 50.0);
    assert_abs_diff_eq!(result.frequency_analysis.dominant_frequency, 440.0, epsilon = 11.0);
    assert_eq!(result.spectral_features.mfcc_mean.len(), 13);
    assert!(!result.genre.is_empty());
    assert!((0.0..=1.0).contains(&result.genre_confidence));
    assert!(result.tempo >= 60.0 && result.tempo <= 180.0);
    assert!(result.key.starts_with("A "));
}

#[test]
fn test_stereo_noise_analysis() {
    let frames = SAMPLE_RATE as usize * 2;
    let left = generate_noise(frames, 1);
    let right = generate_noise(frames, 2);
    let audio = AudioBuffer::from_channels(&[left, right], SAMPLE_RATE).unwrap();
    let result = FeatureExtractor::default().extract(&audio).unwrap();

    let stereo = &result.stereo_analysis;
    assert!(!stereo.is_mono);
    // Uncorrelated channels: side and mid carry equal energy
    assert_abs_diff_eq!(stereo.width, 1.0, epsilon = 0.1);
    assert!(stereo.correlation.abs() < 0.1);
    assert!(stereo.phase_coherence < 0.8);
    assert!(stereo.recommendations.iter().any(|r| r.starts_with("Low stereo correlation")));

    // White noise is bright against a pink reference
    let fa = &result.frequency_analysis;
    assert_eq!(fa.band("sub_bass").map(|b| b.label), Some(BandLabel::Boost));
    assert_eq!(fa.band("brilliance").map(|b| b.label), Some(BandLabel::Cut));
    assert!(result.spectral_features.spectral_centroid > 5000.0);
    assert!(result.spectral_features.zero_crossing_rate > 0.3);
}

#[test]
fn test_result_serializes() {
    let audio = AudioBuffer::from_interleaved(generate_sine(1.2, 1000.0, 0.3), 1, SAMPLE_RATE).unwrap();
    let extractor = FeatureExtractor::new(AnalysisConfig::default());
    let result = extractor.extract(&audio).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["loudness"]["lufs_integrated"].is_number());
    assert_eq!(json["frequency_analysis"]["bands"].as_array().map(Vec::len), Some(7));
    assert!(json["masking_analysis"]["total_masked_bands"].is_number());
    assert_eq!(json["stereo_analysis"]["is_mono"], true);
}

//! Frame-based spectral descriptors
//!
//! One STFT pass over the mono mix produces:
//! - MFCC mean/std (mel filterbank, dB power, orthonormal DCT-II)
//! - Spectral centroid and rolloff (non-silent frames)
//! - Zero-crossing rate
//! - A spectral-flux onset envelope for tempo estimation

use mf_core::SpectralFeatures;

use crate::config::AnalysisConfig;
use crate::stft::Stft;

/// Frames whose summed magnitude is below this are treated as silent
const SILENT_FRAME: f64 = 1e-6;

/// Spectral descriptors plus the onset envelope they were computed with
#[derive(Debug, Clone)]
pub struct SpectralPass {
    pub features: SpectralFeatures,
    /// Positive spectral flux per frame
    pub onset_envelope: Vec<f64>,
    /// Frames per second of the onset envelope
    pub frame_rate: f64,
}

/// Hz → mel (HTK)
#[inline]
fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

#[inline]
fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank: `bands` rows of `bins` weights
pub fn mel_filterbank(bands: usize, bins: usize, fft_size: usize, sample_rate: f64) -> Vec<Vec<f64>> {
    let max_mel = hz_to_mel(sample_rate / 2.0);
    let edges: Vec<f64> = (0..bands + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (bands + 1) as f64))
        .collect();
    let bin_hz = sample_rate / fft_size as f64;

    (0..bands)
        .map(|b| {
            let (lo, center, hi) = (edges[b], edges[b + 1], edges[b + 2]);
            (0..bins)
                .map(|k| {
                    let f = k as f64 * bin_hz;
                    if f <= lo || f >= hi {
                        0.0
                    } else if f <= center {
                        (f - lo) / (center - lo)
                    } else {
                        (hi - f) / (hi - center)
                    }
                })
                .collect()
        })
        .collect()
}

/// Orthonormal DCT-II of `input`, first `count` coefficients
pub fn dct_ii(input: &[f64], count: usize) -> Vec<f64> {
    let m = input.len() as f64;
    (0..count)
        .map(|n| {
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, x)| x * (std::f64::consts::PI * n as f64 * (i as f64 + 0.5) / m).cos())
                .sum();
            let norm = if n == 0 { (1.0 / m).sqrt() } else { (2.0 / m).sqrt() };
            sum * norm
        })
        .collect()
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Zero-crossing rate of one frame (crossings per sample)
fn frame_zcr(frame: &[f64]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / frame.len() as f64
}

/// Run the spectral pass over a mono signal
pub fn analyze(mono: &[f64], sample_rate: f64, config: &AnalysisConfig) -> SpectralPass {
    let mut stft = Stft::new(config.spectral_fft_size);
    let fft_size = stft.size();
    let hop = config.spectral_hop.max(1);
    let bins = stft.bins();
    let filterbank = mel_filterbank(config.mel_bands, bins, fft_size, sample_rate);
    let freqs: Vec<f64> = (0..bins).map(|k| stft.bin_hz(k, sample_rate)).collect();

    let mut mfcc_frames: Vec<Vec<f64>> = Vec::new();
    let mut centroids = Vec::new();
    let mut rolloffs = Vec::new();
    let mut onset_envelope = Vec::new();
    let mut previous_log: Option<Vec<f64>> = None;
    let mut mel = vec![0.0; config.mel_bands];

    stft.for_each_frame(mono, hop, |mags| {
        // Mel power in dB → MFCC
        for (energy, weights) in mel.iter_mut().zip(&filterbank) {
            *energy = weights
                .iter()
                .zip(mags)
                .map(|(w, m)| w * m * m)
                .sum::<f64>();
        }
        let log_mel: Vec<f64> = mel.iter().map(|e| 10.0 * e.max(1e-10).log10()).collect();
        mfcc_frames.push(dct_ii(&log_mel, config.mfcc_count));

        // Onset strength: positive log-magnitude flux
        let log_mag: Vec<f64> = mags.iter().map(|m| (1.0 + 1000.0 * m).ln()).collect();
        let flux = match previous_log.as_ref() {
            Some(prev) => log_mag
                .iter()
                .zip(prev)
                .map(|(c, p)| (c - p).max(0.0))
                .sum::<f64>(),
            None => 0.0,
        };
        onset_envelope.push(flux);
        previous_log = Some(log_mag);

        let total: f64 = mags.iter().sum();
        if total < SILENT_FRAME {
            return;
        }
        let weighted: f64 = mags.iter().zip(&freqs).map(|(m, f)| m * f).sum();
        centroids.push(weighted / total);

        let threshold = total * config.rolloff_percent;
        let mut cumulative = 0.0;
        let rolloff_bin = mags
            .iter()
            .position(|m| {
                cumulative += m;
                cumulative >= threshold
            })
            .unwrap_or(bins - 1);
        rolloffs.push(freqs[rolloff_bin]);
    });

    let zcrs: Vec<f64> = if mono.len() >= fft_size {
        (0..=(mono.len() - fft_size) / hop)
            .map(|i| frame_zcr(&mono[i * hop..i * hop + fft_size]))
            .collect()
    } else {
        vec![frame_zcr(mono)]
    };

    let coeffs = config.mfcc_count;
    let mut mfcc_mean = vec![0.0; coeffs];
    let mut mfcc_std = vec![0.0; coeffs];
    for c in 0..coeffs {
        let series: Vec<f64> = mfcc_frames.iter().map(|f| f[c]).collect();
        (mfcc_mean[c], mfcc_std[c]) = mean_std(&series);
    }

    SpectralPass {
        features: SpectralFeatures {
            mfcc_mean,
            mfcc_std,
            spectral_centroid: mean_std(&centroids).0,
            spectral_rolloff: mean_std(&rolloffs).0,
            zero_crossing_rate: mean_std(&zcrs).0,
        },
        onset_envelope,
        frame_rate: sample_rate / hop as f64,
    }
}

//! Rule-based genre classification
//!
//! Each genre accumulates a score from threshold tests on spectral and
//! tempo features; the best score wins, earlier genres winning ties.

use serde::{Deserialize, Serialize};

use mf_core::SpectralFeatures;

/// Genre reported when no rule fires strongly
pub const FALLBACK_GENRE: &str = "pop";
const FALLBACK_CONFIDENCE: f64 = 0.5;
/// Best score below this falls back
const MIN_SCORE: f64 = 0.3;

/// Candidate genres in tie-break order
pub const GENRES: [&str; 5] = ["electronic", "rock", "jazz", "hip-hop", "pop"];

/// Classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreEstimate {
    pub genre: String,
    /// [0, 1]
    pub confidence: f64,
}

#[inline]
fn within(value: f64, low: f64, high: f64) -> bool {
    value > low && value < high
}

/// Raw score per genre, in [`GENRES`] order
pub fn scores(features: &SpectralFeatures, tempo: f64) -> [f64; 5] {
    let centroid = features.spectral_centroid;
    let rolloff = features.spectral_rolloff;
    let zcr = features.zero_crossing_rate;
    let mfcc = |i: usize| features.mfcc_mean.get(i).copied().unwrap_or(0.0);
    let mfcc1_spread = features.mfcc_std.get(1).copied().unwrap_or(0.0);

    let rules: [&[(bool, f64)]; 5] = [
        // electronic
        &[
            (centroid > 1800.0, 0.4),
            (zcr > 0.05, 0.3),
            (within(tempo, 110.0, 180.0), 0.3),
            (rolloff > 2500.0, 0.3),
            (mfcc(2) > 10.0, 0.4),
            (mfcc1_spread > 20.0, 0.3),
        ],
        // rock
        &[
            (within(centroid, 1500.0, 3000.0), 0.2),
            (within(tempo, 100.0, 160.0), 0.2),
            (rolloff > 3000.0, 0.3),
            (mfcc(2) < 0.0, 0.3),
        ],
        // jazz
        &[
            (centroid < 1500.0, 0.2),
            (within(tempo, 80.0, 120.0), 0.2),
            (zcr < 0.03, 0.3),
            (mfcc1_spread < 15.0, 0.2),
            (rolloff < 2000.0, 0.3),
        ],
        // hip-hop
        &[
            (within(tempo, 70.0, 100.0), 0.3),
            (centroid < 1800.0, 0.2),
            (mfcc(0) > 0.0, 0.3),
            (rolloff < 2500.0, 0.2),
        ],
        // pop
        &[
            (within(tempo, 90.0, 130.0), 0.2),
            (within(centroid, 1000.0, 2500.0), 0.3),
            (within(zcr, 0.03, 0.08), 0.3),
            (mfcc(1).abs() < 0.5, 0.2),
        ],
    ];

    rules.map(|genre| genre.iter().filter(|(hit, _)| *hit).map(|(_, w)| w).sum())
}

/// Classify from spectral features and tempo
pub fn classify(features: &SpectralFeatures, tempo: f64) -> GenreEstimate {
    let scores = scores(features, tempo);
    let (best, score) = scores
        .iter()
        .enumerate()
        .fold((0usize, f64::NEG_INFINITY), |acc, (i, &s)| if s > acc.1 { (i, s) } else { acc });

    if score < MIN_SCORE {
        return GenreEstimate {
            genre: FALLBACK_GENRE.to_string(),
            confidence: FALLBACK_CONFIDENCE,
        };
    }

    GenreEstimate {
        genre: GENRES[best].to_string(),
        confidence: score.min(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn features(centroid: f64, rolloff: f64, zcr: f64, mfcc: [f64; 3], mfcc1_std: f64) -> SpectralFeatures {
        let mut mfcc_mean = vec![0.0; 13];
        mfcc_mean[..3].copy_from_slice(&mfcc);
        let mut mfcc_std = vec![0.0; 13];
        mfcc_std[1] = mfcc1_std;
        SpectralFeatures {
            mfcc_mean,
            mfcc_std,
            spectral_centroid: centroid,
            spectral_rolloff: rolloff,
            zero_crossing_rate: zcr,
        }
    }

    #[test]
    fn test_bright_fast_track_is_electronic() {
        let f = features(3500.0, 6000.0, 0.09, [-100.0, 40.0, 15.0], 25.0);
        let estimate = classify(&f, 128.0);
        assert_eq!(estimate.genre, "electronic");
        // 0.4 + 0.3 + 0.3 + 0.3 + 0.4 + 0.3, capped
        assert_eq!(estimate.confidence, 1.0);
    }

    #[test]
    fn test_dark_slow_track_is_jazz() {
        let f = features(900.0, 1500.0, 0.02, [-200.0, 60.0, 5.0], 8.0);
        let estimate = classify(&f, 100.0);
        assert_eq!(estimate.genre, "jazz");
        assert_abs_diff_eq!(estimate.confidence, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hip_hop_tempo_and_low_end() {
        let f = features(1600.0, 2200.0, 0.04, [5.0, 30.0, 5.0], 17.0);
        let s = scores(&f, 85.0);
        // tempo, centroid, mfcc0 and rolloff all hit
        assert_abs_diff_eq!(s[3], 1.0, epsilon = 1e-12);
        assert_eq!(classify(&f, 85.0).genre, "hip-hop");
    }

    #[test]
    fn test_weak_evidence_falls_back_to_pop() {
        // Every value sits on a rule boundary (exclusive comparisons)
        let f = features(1000.0, 2500.0, 0.03, [-50.0, 30.0, 5.0], 17.0);
        let s = scores(&f, 200.0);
        assert!(s.iter().all(|&x| x < MIN_SCORE));
        let estimate = classify(&f, 200.0);
        assert_eq!(estimate.genre, FALLBACK_GENRE);
        assert_eq!(estimate.confidence, 0.5);
    }

    #[test]
    fn test_ties_prefer_earlier_genre() {
        // electronic: rolloff 0.3; rock: 0.3 via mfcc2 < 0
        let f = features(1000.0, 2800.0, 0.03, [-50.0, 30.0, -1.0], 17.0);
        let s = scores(&f, 200.0);
        assert_abs_diff_eq!(s[0], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(s[1], 0.3, epsilon = 1e-12);
        assert_eq!(classify(&f, 200.0).genre, "electronic");
    }
}

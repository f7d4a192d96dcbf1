//! Analysis configuration

use serde::{Deserialize, Serialize};

/// Tunables for the feature extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Only the first N seconds are analyzed
    pub max_analysis_seconds: f64,
    /// Shorter input is rejected
    pub min_duration: f64,
    /// Input whose peak is below this is treated as silence (dBFS)
    pub silence_threshold_db: f64,

    /// STFT size for spectral descriptors
    pub spectral_fft_size: usize,
    pub spectral_hop: usize,
    pub mfcc_count: usize,
    pub mel_bands: usize,
    /// Fraction of spectral magnitude below the rolloff frequency
    pub rolloff_percent: f64,

    /// STFT size for the named-band spectrum
    pub band_fft_size: usize,
    pub band_seconds: f64,

    /// STFT size for critical-band masking
    pub masking_fft_size: usize,
    pub masking_hop: usize,
    pub masking_seconds: f64,
    /// Absolute audibility floor (dB)
    pub masking_floor_db: f64,

    /// Cross-correlation lag searched for phase coherence (ms)
    pub coherence_max_lag_ms: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_analysis_seconds: 30.0,
            min_duration: 1.0,
            silence_threshold_db: -100.0,
            spectral_fft_size: 2048,
            spectral_hop: 512,
            mfcc_count: 13,
            mel_bands: 40,
            rolloff_percent: 0.85,
            band_fft_size: 4096,
            band_seconds: 10.0,
            masking_fft_size: 1024,
            masking_hop: 512,
            masking_seconds: 15.0,
            masking_floor_db: -60.0,
            coherence_max_lag_ms: 1.0,
        }
    }
}

impl AnalysisConfig {
    pub fn with_max_seconds(mut self, seconds: f64) -> Self {
        self.max_analysis_seconds = seconds;
        self
    }

    pub fn with_masking_floor(mut self, db: f64) -> Self {
        self.masking_floor_db = db;
        self
    }
}

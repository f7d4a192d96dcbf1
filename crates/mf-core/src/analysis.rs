//! Analysis result snapshot

use serde::{Deserialize, Serialize};

/// Level measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoudnessData {
    pub rms_db: f64,
    pub peak_db: f64,
    /// RMS-based loudness estimate (rms_db + 3)
    pub lufs_approx: f64,
    /// Gated, K-weighted integrated loudness
    pub lufs_integrated: f64,
    /// Crest factor (peak_db - rms_db)
    pub dynamic_range: f64,
}

/// Frame-averaged spectral descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    pub mfcc_mean: Vec<f64>,
    pub mfcc_std: Vec<f64>,
    /// Hz
    pub spectral_centroid: f64,
    /// Hz
    pub spectral_rolloff: f64,
    pub zero_crossing_rate: f64,
}

/// Boost/cut hint for a named band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandLabel {
    Boost,
    Cut,
    Ok,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandEnergy {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
    /// Mean spectral magnitude in the band
    pub energy: f64,
    /// Fraction of the summed energy of all bands
    pub share: f64,
    pub label: BandLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyAnalysis {
    pub bands: Vec<BandEnergy>,
    pub dominant_frequency: f64,
}

impl FrequencyAnalysis {
    pub fn band(&self, name: &str) -> Option<&BandEnergy> {
        self.bands.iter().find(|b| b.name == name)
    }
}

/// One psychoacoustic critical band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalBand {
    pub low_hz: f64,
    pub high_hz: f64,
    pub center_hz: f64,
    pub energy_db: f64,
    /// Masking threshold this band was compared against
    pub threshold_db: f64,
    pub is_masked: bool,
}

impl CriticalBand {
    pub fn bandwidth(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaskingAnalysis {
    pub bands: Vec<CriticalBand>,
    /// Ranked, most severe first
    pub recommendations: Vec<String>,
    pub total_masked_bands: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoAnalysis {
    /// Side energy relative to mid energy
    pub width: f64,
    /// L/R Pearson correlation
    pub correlation: f64,
    /// (R - L) / (R + L) of mean channel energy
    pub balance: f64,
    pub mid_energy_db: f64,
    pub side_energy_db: f64,
    pub phase_coherence: f64,
    pub is_mono: bool,
    pub recommendations: Vec<String>,
}

/// Immutable result of one feature extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub loudness: LoudnessData,
    pub spectral_features: SpectralFeatures,
    pub frequency_analysis: FrequencyAnalysis,
    pub masking_analysis: MaskingAnalysis,
    pub stereo_analysis: StereoAnalysis,
    pub genre: String,
    pub genre_confidence: f64,
    /// BPM
    pub tempo: f64,
    pub key: String,
    /// Seconds of audio the analysis covered
    pub analyzed_duration: f64,
}

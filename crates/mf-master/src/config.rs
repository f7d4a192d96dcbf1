//! Pipeline configuration

use serde::{Deserialize, Serialize};

/// Algorithm constants for the offline pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest loudness correction in either direction (dB)
    pub loudness_gain_cap_db: f64,
    /// Input measuring at or below this is left alone (LUFS)
    pub loudness_floor_lufs: f64,

    /// Masking boost at full sensitivity (dB)
    pub masking_boost_db: f64,
    /// At most this many masked bands are boosted
    pub max_masking_bands: usize,
    /// Masked bands centred at or below this are ignored (Hz)
    pub masking_min_center_hz: f64,

    /// Crest factor must exceed the target by this much before shaping (dB)
    pub dr_margin_db: f64,
    pub dr_max_ratio: f64,
    /// Attack when transients are preserved (s)
    pub dr_attack_preserve: f64,
    /// Attack when transients are not preserved (s)
    pub dr_attack_tight: f64,
    pub dr_release: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            loudness_gain_cap_db: 24.0,
            loudness_floor_lufs: -70.0,
            masking_boost_db: 4.0,
            max_masking_bands: 6,
            masking_min_center_hz: 100.0,
            dr_margin_db: 2.0,
            dr_max_ratio: 10.0,
            dr_attack_preserve: 0.01,
            dr_attack_tight: 0.001,
            dr_release: 0.1,
        }
    }
}

impl PipelineConfig {
    pub fn with_loudness_cap(mut self, db: f64) -> Self {
        self.loudness_gain_cap_db = db.abs();
        self
    }

    pub fn with_masking_boost(mut self, db: f64, max_bands: usize) -> Self {
        self.masking_boost_db = db;
        self.max_masking_bands = max_bands;
        self
    }
}

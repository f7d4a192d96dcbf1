//! Parameter snapshots sent to the audio callback
//!
//! A [`PreviewParams`] is a fixed-size `Copy` value: it crosses the command
//! ring without allocating and is resolved on the controller thread, where
//! clamping and analysis lookups may allocate.

use mf_core::{
    AnalysisResult, CANONICAL_EQ_BANDS, CompressionSettings, EQ_BAND_COUNT, EqBand,
    ExciterSettings, LimitingSettings, MaskingAnalysis, MasteringSettings, SaturationSettings,
    StereoSettings,
};
use mf_master::PipelineConfig;
use mf_master::stages::{self, MaskingBoost};

/// Most masking boosts the preview chain carries
pub const MAX_PREVIEW_BOOSTS: usize = 8;

const IDLE_BOOST: MaskingBoost = MaskingBoost {
    center_hz: 1000.0,
    q: 1.0,
    gain_db: 0.0,
};

/// Analysis values the preview needs for its static stages
#[derive(Debug, Clone, Default)]
pub struct PreviewAnalysis {
    pub lufs_integrated: f64,
    pub rms_db: f64,
    pub peak_db: f64,
    /// L/R correlation of the source
    pub correlation: f64,
    pub masking: Option<MaskingAnalysis>,
    pub genre: Option<String>,
}

impl PreviewAnalysis {
    pub fn from_analysis(analysis: &AnalysisResult) -> Self {
        Self {
            lufs_integrated: analysis.loudness.lufs_integrated,
            rms_db: analysis.loudness.rms_db,
            peak_db: analysis.loudness.peak_db,
            correlation: analysis.stereo_analysis.correlation,
            masking: Some(analysis.masking_analysis.clone()),
            genre: Some(analysis.genre.clone()),
        }
    }
}

/// Resolved per-stage parameters for one settings value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewParams {
    pub eq: [EqBand; EQ_BAND_COUNT],
    pub masking: [MaskingBoost; MAX_PREVIEW_BOOSTS],
    pub masking_count: usize,
    pub compression: Option<CompressionSettings>,
    pub saturation: Option<SaturationSettings>,
    pub exciter: Option<ExciterSettings>,
    pub stereo: Option<StereoSettings>,
    pub invert_right: bool,
    /// Static loudness correction (dB)
    pub loudness_gain_db: f64,
    pub dynamic_range: Option<CompressionSettings>,
    pub limiter: LimitingSettings,
}

/// The canonical 10-band layout, all bands flat
pub fn canonical_eq() -> [EqBand; EQ_BAND_COUNT] {
    CANONICAL_EQ_BANDS.map(|(frequency, band_type, q)| EqBand {
        frequency,
        gain: 0.0,
        q,
        band_type,
    })
}

impl Default for PreviewParams {
    fn default() -> Self {
        Self {
            eq: canonical_eq(),
            masking: [IDLE_BOOST; MAX_PREVIEW_BOOSTS],
            masking_count: 0,
            compression: None,
            saturation: None,
            exciter: None,
            stereo: None,
            invert_right: false,
            loudness_gain_db: 0.0,
            dynamic_range: None,
            limiter: LimitingSettings::default(),
        }
    }
}

impl PreviewParams {
    /// Resolve settings for a stream at `sample_rate`
    ///
    /// Loudness, masking, phase correction and dynamic-range shaping need
    /// the analysis; without it those stages stay idle.
    pub fn from_settings(
        settings: &MasteringSettings,
        analysis: Option<&PreviewAnalysis>,
        sample_rate: u32,
    ) -> Self {
        let (settings, _) = settings.clamped();
        let config = PipelineConfig::default();
        let mut params = Self::default();

        for (dst, src) in params.eq.iter_mut().zip(&settings.eq_settings.bands) {
            *dst = *src;
        }
        params.compression = settings.compression_settings;
        params.saturation = settings.saturation_settings;
        params.exciter = settings.exciter_settings;
        params.stereo = settings.stereo_settings;
        params.limiter = settings.limiter();

        let Some(analysis) = analysis else {
            return params;
        };

        if let (Some(masking), Some(bands)) = (settings.masking_settings, &analysis.masking) {
            if masking.auto_correct {
                let boosts = stages::masking_boosts(bands, &masking, &config);
                for (slot, boost) in params.masking.iter_mut().zip(&boosts) {
                    *slot = *boost;
                }
                params.masking_count = boosts.len().min(MAX_PREVIEW_BOOSTS);
            }
        }

        params.invert_right = settings
            .stereo_settings
            .is_some_and(|s| s.phase_correction && analysis.correlation < 0.0);

        if let Some(loudness) = settings.loudness_settings {
            if loudness.auto_adjust && analysis.lufs_integrated > config.loudness_floor_lufs {
                let target = stages::loudness_target(&loudness, analysis.genre.as_deref());
                let cap = config.loudness_gain_cap_db;
                params.loudness_gain_db = (target - analysis.lufs_integrated).clamp(-cap, cap);
            }
        }

        params.dynamic_range = settings.dynamic_range_settings.and_then(|dr| {
            stages::dynamic_range_shaping(analysis.rms_db, analysis.peak_db, &dr, &config)
        });

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use mf_core::{EqSettings, LoudnessSettings};

    fn analysis(lufs: f64) -> PreviewAnalysis {
        PreviewAnalysis {
            lufs_integrated: lufs,
            rms_db: -20.0,
            peak_db: -6.0,
            correlation: 0.8,
            masking: None,
            genre: Some("jazz".to_string()),
        }
    }

    #[test]
    fn test_eq_layout_matches_offline() {
        let params = PreviewParams::from_settings(&MasteringSettings::neutral(), None, 48000);
        let offline = EqSettings::default();
        assert_eq!(params.eq.to_vec(), offline.bands);
    }

    #[test]
    fn test_static_loudness_gain() {
        let settings = MasteringSettings::neutral();
        let params = PreviewParams::from_settings(&settings, Some(&analysis(-30.0)), 48000);
        assert_abs_diff_eq!(params.loudness_gain_db, 16.0);

        let mut compliant = settings.clone();
        compliant.loudness_settings = Some(LoudnessSettings {
            genre_compliance: true,
            ..Default::default()
        });
        let params = PreviewParams::from_settings(&compliant, Some(&analysis(-30.0)), 48000);
        assert_abs_diff_eq!(params.loudness_gain_db, 12.0);

        let params = PreviewParams::from_settings(&settings, None, 48000);
        assert_eq!(params.loudness_gain_db, 0.0);
    }

    #[test]
    fn test_phase_correction_follows_analysis() {
        let mut settings = MasteringSettings::neutral();
        settings.stereo_settings = Some(StereoSettings {
            phase_correction: true,
            ..Default::default()
        });
        let mut out_of_phase = analysis(-20.0);
        out_of_phase.correlation = -0.6;
        assert!(PreviewParams::from_settings(&settings, Some(&out_of_phase), 48000).invert_right);
        assert!(!PreviewParams::from_settings(&settings, Some(&analysis(-20.0)), 48000).invert_right);
    }
}

//! Mastering suggestions
//!
//! The engine asks a [`SuggestionProvider`] for a settings patch after each
//! analysis and for every adjustment request. An AI service plugs in here;
//! [`RuleBasedSuggestions`] is the built-in fallback.

use mf_core::{
    AnalysisResult, BandLabel, CompressionSettings, DynamicRangeSettings, EqBandPatch, EqPatch,
    ExciterSettings, HarmonicsMode, LimitingSettings, LoudnessSettings, MaskingSettings,
    SaturationSettings, SaturationType, SettingsPatch, StereoSettings,
};
use mf_master::chain_preset;

/// Source of settings patches
pub trait SuggestionProvider: Send + Sync {
    /// Patch for a freshly analyzed track, optionally steered by a request
    fn suggest(&self, analysis: &AnalysisResult, request: Option<&str>) -> SettingsPatch;

    /// Patch for a plain-language adjustment of existing settings
    fn adjust(&self, request: &str) -> SettingsPatch {
        request_patch(request)
    }
}

/// Genre chain presets plus keyword-driven adjustments
#[derive(Debug, Clone, Default)]
pub struct RuleBasedSuggestions;

impl RuleBasedSuggestions {
    pub fn new() -> Self {
        Self
    }
}

impl SuggestionProvider for RuleBasedSuggestions {
    fn suggest(&self, analysis: &AnalysisResult, request: Option<&str>) -> SettingsPatch {
        let mut patch = chain_preset(&analysis.genre);

        // Correct bands the analysis flagged far off the reference balance
        let corrections: Vec<EqBandPatch> = analysis
            .frequency_analysis
            .bands
            .iter()
            .filter_map(|band| {
                let center = (band.low_hz * band.high_hz).sqrt();
                match band.label {
                    BandLabel::Boost => Some(EqBandPatch::gain(center, 1.5)),
                    BandLabel::Cut => Some(EqBandPatch::gain(center, -1.5)),
                    BandLabel::Ok => None,
                }
            })
            .collect();
        if !corrections.is_empty() {
            patch.overlay(SettingsPatch {
                eq_settings: Some(EqPatch { bands: corrections }),
                ..Default::default()
            });
        }

        if analysis.stereo_analysis.correlation < 0.0 {
            patch.overlay(SettingsPatch {
                stereo_settings: Some(StereoSettings {
                    width: 1.0,
                    phase_correction: true,
                    bass_mono_freq: 100.0,
                }),
                ..Default::default()
            });
        }

        if let Some(request) = request {
            patch.overlay(request_patch(request));
        }
        patch
    }
}

fn mentions(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Patch for a free-text request such as "more bass, a bit wider"
///
/// Unrecognized text gives an empty patch.
pub fn request_patch(request: &str) -> SettingsPatch {
    let text = request.to_lowercase();
    let mut patch = SettingsPatch::default();
    let mut bands = Vec::new();

    if mentions(&text, &["less bass", "reduce bass", "too boomy", "muddy"]) {
        bands.push(EqBandPatch::gain(60.0, -3.0));
        bands.push(EqBandPatch::gain(250.0, -1.5));
    } else if mentions(&text, &["more bass", "bass", "low end", "bottom"]) {
        bands.push(EqBandPatch::gain(60.0, 3.0));
        bands.push(EqBandPatch::gain(120.0, 1.5));
    }

    if mentions(&text, &["bright", "treble", "air", "sparkle", "presence"]) {
        bands.push(EqBandPatch::gain(8000.0, 2.0));
        bands.push(EqBandPatch::gain(16000.0, 2.0));
        patch.exciter_settings = Some(ExciterSettings {
            drive: 3.0,
            frequency: 4000.0,
            harmonics: HarmonicsMode::Even,
            mix: 0.4,
        });
    }

    if mentions(&text, &["warm", "vintage", "analog"]) {
        bands.push(EqBandPatch::gain(250.0, 1.5));
        bands.push(EqBandPatch::gain(12000.0, -1.0));
        patch.exciter_settings = Some(ExciterSettings {
            drive: 2.0,
            frequency: 2000.0,
            harmonics: HarmonicsMode::Odd,
            mix: 0.3,
        });
        patch.saturation_settings = Some(SaturationSettings {
            drive: 1.5,
            saturation_type: SaturationType::Tape,
            mix: 0.3,
        });
    }

    if mentions(&text, &["clean", "transparent"]) {
        patch.saturation_settings = Some(SaturationSettings {
            mix: 0.0,
            ..Default::default()
        });
    }

    if mentions(&text, &["narrow", "less wide", "more mono"]) {
        patch.stereo_settings = Some(StereoSettings {
            width: 0.8,
            phase_correction: true,
            bass_mono_freq: 150.0,
        });
    } else if mentions(&text, &["wide", "stereo", "space"]) {
        patch.stereo_settings = Some(StereoSettings {
            width: 1.3,
            phase_correction: true,
            bass_mono_freq: 120.0,
        });
    }
    if mentions(&text, &["phase", "correlation"]) {
        patch.stereo_settings = Some(StereoSettings {
            width: 1.0,
            phase_correction: true,
            bass_mono_freq: 100.0,
        });
    }

    if mentions(&text, &["less compression", "less compressed", "more dynamic", "gentle"]) {
        patch.compression_settings = Some(CompressionSettings {
            threshold: -18.0,
            ratio: 1.5,
            attack: 0.02,
            release: 0.25,
            makeup_gain: 0.0,
        });
    } else if mentions(&text, &["punch", "compress", "tight"]) {
        patch.compression_settings = Some(CompressionSettings {
            threshold: -8.0,
            ratio: 4.0,
            attack: 0.003,
            release: 0.1,
            makeup_gain: 0.0,
        });
    }

    if mentions(&text, &["punch", "impact"]) {
        patch.dynamic_range_settings = Some(DynamicRangeSettings {
            target_dr: 10.0,
            auto_optimize: true,
            preserve_transients: true,
        });
    }

    if mentions(&text, &["louder", "loud", "volume"]) {
        patch.loudness_settings = Some(LoudnessSettings {
            target_lufs: -10.0,
            auto_adjust: true,
            genre_compliance: false,
        });
        patch.limiting_settings = Some(LimitingSettings {
            ceiling: -0.1,
            release: 0.05,
        });
    } else if mentions(&text, &["quieter", "softer"]) {
        patch.loudness_settings = Some(LoudnessSettings {
            target_lufs: -18.0,
            auto_adjust: true,
            genre_compliance: false,
        });
    }

    if mentions(&text, &["mask", "clarity", "detail"]) {
        patch.masking_settings = Some(MaskingSettings {
            auto_correct: true,
            boost_masked_frequencies: true,
            sensitivity: 0.8,
        });
    }

    if !bands.is_empty() {
        patch.eq_settings = Some(EqPatch { bands });
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_core::MasteringSettings;

    #[test]
    fn test_more_bass() {
        let patch = request_patch("Give me more bass please");
        let settings = MasteringSettings::neutral().apply_patch(&patch);
        assert_eq!(settings.eq_settings.bands[0].gain, 3.0);
        assert_eq!(settings.eq_settings.bands[1].gain, 1.5);
        assert!(patch.compression_settings.is_none());
    }

    #[test]
    fn test_less_bass_wins_over_bass() {
        let patch = request_patch("less bass");
        let settings = MasteringSettings::neutral().apply_patch(&patch);
        assert_eq!(settings.eq_settings.bands[0].gain, -3.0);
    }

    #[test]
    fn test_wider_and_narrower() {
        assert_eq!(request_patch("wider").stereo_settings.map(|s| s.width), Some(1.3));
        assert_eq!(request_patch("narrower").stereo_settings.map(|s| s.width), Some(0.8));
    }

    #[test]
    fn test_compression_requests() {
        let punchy = request_patch("punchier drums");
        assert_eq!(punchy.compression_settings.map(|c| c.ratio), Some(4.0));
        assert!(punchy.dynamic_range_settings.is_some());

        let relaxed = request_patch("less compression");
        assert_eq!(relaxed.compression_settings.map(|c| c.ratio), Some(1.5));

        let more = request_patch("more compression");
        assert_eq!(more.compression_settings.map(|c| c.ratio), Some(4.0));
    }

    #[test]
    fn test_brighter_and_warmer() {
        let bright = request_patch("brighter");
        assert_eq!(bright.exciter_settings.map(|e| e.harmonics), Some(HarmonicsMode::Even));
        let warm = request_patch("warmer");
        assert_eq!(warm.exciter_settings.map(|e| e.harmonics), Some(HarmonicsMode::Odd));
        assert_eq!(warm.saturation_settings.map(|s| s.saturation_type), Some(SaturationType::Tape));
    }

    #[test]
    fn test_louder() {
        let patch = request_patch("LOUDER");
        assert_eq!(patch.loudness_settings.map(|l| l.target_lufs), Some(-10.0));
    }

    #[test]
    fn test_unrecognized_request_is_empty() {
        assert!(request_patch("make it sound like a sunset").is_empty());
    }
}

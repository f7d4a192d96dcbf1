//! Settings resolution
//!
//! neutral defaults → genre targets → AI patch. The result always carries a
//! valid 10-band EQ.

use mf_core::{
    AnalysisResult, DynamicRangeSettings, LoudnessSettings, MasteringSettings, SettingsPatch,
};

use crate::presets::{canonical_genre, genre_profile, normalize_genre};

/// Builds fully populated settings from defaults, genre and suggestions
#[derive(Debug, Clone, Default)]
pub struct SettingsResolver;

impl SettingsResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve settings
    ///
    /// When `genre` is `None` the analysis genre label (if any) selects the
    /// profile.
    pub fn resolve(
        &self,
        analysis: Option<&AnalysisResult>,
        genre: Option<&str>,
        patch: Option<&SettingsPatch>,
    ) -> MasteringSettings {
        let mut settings = MasteringSettings::neutral();

        let genre = genre
            .filter(|g| !g.trim().is_empty())
            .or_else(|| analysis.map(|a| a.genre.as_str()));
        if let Some(genre) = genre {
            self.apply_genre_targets(&mut settings, genre);
        }

        if let Some(patch) = patch.filter(|p| !p.is_empty()) {
            settings = settings.apply_patch(patch);
        }

        debug_assert!(settings.eq_settings.is_valid());
        settings
    }

    /// Overlay a genre's loudness and dynamic-range targets
    pub fn apply_genre_targets(&self, settings: &mut MasteringSettings, genre: &str) {
        let profile = genre_profile(genre);
        if canonical_genre(genre).is_none() {
            log::debug!(
                "genre '{}' has no profile, using {} targets",
                normalize_genre(genre),
                profile.name
            );
        }

        let loudness = settings.loudness_settings.get_or_insert_with(LoudnessSettings::default);
        loudness.target_lufs = profile.target_lufs;
        let dynamics = settings
            .dynamic_range_settings
            .get_or_insert_with(DynamicRangeSettings::default);
        dynamics.target_dr = profile.target_dr;
    }
}

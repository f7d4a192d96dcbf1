//! Genre profiles and chain presets
//!
//! Genre names are normalized (case, `hip hop` spellings) and mapped through
//! an alias table onto seven profiles. Unknown genres use the pop profile.

use mf_core::{
    CompressionSettings, EqBandPatch, EqPatch, LimitingSettings, SaturationSettings,
    SaturationType, SettingsPatch, StereoSettings,
};

/// Per-genre mastering standard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenreProfile {
    pub name: &'static str,
    pub target_lufs: f64,
    pub target_dr: f64,
    /// Tonal target per canonical EQ band (dB)
    pub eq_curve: [f64; 10],
    pub compression: CompressionSettings,
    pub stereo_width: f64,
    pub description: &'static str,
}

const fn compression(threshold: f64, ratio: f64, attack: f64, release: f64) -> CompressionSettings {
    CompressionSettings {
        threshold,
        ratio,
        attack,
        release,
        makeup_gain: 0.0,
    }
}

/// Profiles, fallback first
pub const GENRE_PROFILES: [GenreProfile; 7] = [
    GenreProfile {
        name: "pop",
        target_lufs: -14.0,
        target_dr: 8.0,
        eq_curve: [0.0, 1.0, 0.0, 0.0, 0.5, 1.0, 1.5, 2.0, 1.0, 1.5],
        compression: compression(-8.0, 3.0, 0.003, 0.1),
        stereo_width: 1.2,
        description: "Bright, punchy, competitive loudness with enhanced presence and air",
    },
    GenreProfile {
        name: "rock",
        target_lufs: -11.0,
        target_dr: 6.0,
        eq_curve: [1.0, 2.0, 0.5, 0.0, 0.0, 1.0, 2.5, 2.0, 1.0, 0.5],
        compression: compression(-6.0, 4.0, 0.001, 0.05),
        stereo_width: 1.1,
        description: "Powerful low end, aggressive midrange, controlled dynamics",
    },
    GenreProfile {
        name: "jazz",
        target_lufs: -18.0,
        target_dr: 14.0,
        eq_curve: [-1.0, 0.0, 0.0, 0.5, 1.0, 1.5, 1.0, 2.0, 2.5, 2.0],
        compression: compression(-16.0, 2.0, 0.01, 0.3),
        stereo_width: 1.3,
        description: "Natural dynamics, warm midrange, extended highs, wide image",
    },
    GenreProfile {
        name: "electronic",
        target_lufs: -12.0,
        target_dr: 5.0,
        eq_curve: [2.0, 1.5, 0.0, -0.5, 0.0, 0.5, 1.0, 3.0, 2.0, 3.0],
        compression: compression(-4.0, 6.0, 0.001, 0.03),
        stereo_width: 1.4,
        description: "Deep sub-bass, crisp highs, tight dynamics, wide field",
    },
    GenreProfile {
        name: "classical",
        target_lufs: -23.0,
        target_dr: 20.0,
        eq_curve: [0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 0.5, 1.5, 2.0, 1.5],
        compression: compression(-20.0, 1.5, 0.05, 0.5),
        stereo_width: 1.5,
        description: "Natural dynamics, subtle enhancement, original character preserved",
    },
    GenreProfile {
        name: "hip-hop",
        target_lufs: -10.0,
        target_dr: 4.0,
        eq_curve: [3.0, 2.5, 1.0, 0.0, -0.5, 0.0, 1.5, 2.5, 1.5, 2.0],
        compression: compression(-3.0, 8.0, 0.001, 0.02),
        stereo_width: 1.0,
        description: "Massive sub-bass, punchy drums, aggressive limiting, controlled width",
    },
    GenreProfile {
        name: "country",
        target_lufs: -16.0,
        target_dr: 10.0,
        eq_curve: [0.0, 0.5, 0.5, 1.0, 1.5, 2.0, 2.5, 2.0, 1.5, 1.0],
        compression: compression(-10.0, 3.0, 0.005, 0.15),
        stereo_width: 1.2,
        description: "Warm midrange, clear vocals, natural dynamics, moderate loudness",
    },
];

const ALIASES: [(&str, &str); 14] = [
    ("alternative", "rock"),
    ("metal", "rock"),
    ("punk", "rock"),
    ("indie", "pop"),
    ("r&b", "pop"),
    ("soul", "pop"),
    ("dance", "electronic"),
    ("techno", "electronic"),
    ("house", "electronic"),
    ("ambient", "electronic"),
    ("folk", "country"),
    ("blues", "jazz"),
    ("rap", "hip-hop"),
    ("trap", "hip-hop"),
];

/// Lowercase, trimmed, with `hip hop` / `hiphop` / `hip_hop` folded to `hip-hop`
pub fn normalize_genre(genre: &str) -> String {
    let lower = genre.trim().to_lowercase();
    match lower.as_str() {
        "hip hop" | "hiphop" | "hip_hop" => "hip-hop".to_string(),
        _ => lower,
    }
}

/// Profile name a genre resolves to, if it is known at all
pub fn canonical_genre(genre: &str) -> Option<&'static str> {
    let normalized = normalize_genre(genre);
    if let Some(profile) = GENRE_PROFILES.iter().find(|p| p.name == normalized) {
        return Some(profile.name);
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, target)| *target)
}

/// Profile for a genre; unknown genres get the pop profile
pub fn genre_profile(genre: &str) -> &'static GenreProfile {
    let name = canonical_genre(genre).unwrap_or(GENRE_PROFILES[0].name);
    GENRE_PROFILES
        .iter()
        .find(|p| p.name == name)
        .unwrap_or(&GENRE_PROFILES[0])
}

fn eq(bands: &[(f64, f64, f64)]) -> EqPatch {
    EqPatch {
        bands: bands
            .iter()
            .map(|&(frequency, gain, q)| EqBandPatch {
                q: Some(q),
                ..EqBandPatch::gain(frequency, gain)
            })
            .collect(),
    }
}

fn rock_chain() -> SettingsPatch {
    SettingsPatch {
        eq_settings: Some(eq(&[(100.0, 2.0, 0.7), (3000.0, -2.0, 1.0), (10000.0, 3.0, 0.7)])),
        compression_settings: Some(CompressionSettings {
            threshold: -8.0,
            ratio: 4.0,
            attack: 0.003,
            release: 0.1,
            makeup_gain: 3.0,
        }),
        saturation_settings: Some(SaturationSettings {
            drive: 1.5,
            saturation_type: SaturationType::Tube,
            mix: 0.3,
        }),
        limiting_settings: Some(LimitingSettings {
            ceiling: -0.3,
            release: 0.05,
        }),
        ..Default::default()
    }
}

fn electronic_chain() -> SettingsPatch {
    SettingsPatch {
        eq_settings: Some(eq(&[(60.0, 4.0, 0.7), (8000.0, 2.0, 0.7)])),
        compression_settings: Some(CompressionSettings {
            threshold: -6.0,
            ratio: 6.0,
            attack: 0.001,
            release: 0.05,
            makeup_gain: 2.0,
        }),
        stereo_settings: Some(StereoSettings {
            width: 1.3,
            ..Default::default()
        }),
        limiting_settings: Some(LimitingSettings {
            ceiling: -0.1,
            release: 0.03,
        }),
        ..Default::default()
    }
}

fn jazz_chain() -> SettingsPatch {
    SettingsPatch {
        eq_settings: Some(eq(&[(200.0, 1.0, 0.5), (5000.0, 1.5, 0.7)])),
        compression_settings: Some(CompressionSettings {
            threshold: -15.0,
            ratio: 2.5,
            attack: 0.01,
            release: 0.2,
            makeup_gain: 1.0,
        }),
        saturation_settings: Some(SaturationSettings {
            drive: 1.1,
            saturation_type: SaturationType::Tape,
            mix: 0.2,
        }),
        limiting_settings: Some(LimitingSettings {
            ceiling: -1.0,
            release: 0.1,
        }),
        ..Default::default()
    }
}

/// Full processing chain for a genre
///
/// Rock, electronic and jazz have dedicated chains; every other genre
/// uses the rock chain.
pub fn chain_preset(genre: &str) -> SettingsPatch {
    match canonical_genre(genre) {
        Some("electronic") => electronic_chain(),
        Some("jazz") => jazz_chain(),
        _ => rock_chain(),
    }
}

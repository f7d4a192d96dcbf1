//! Mastering settings
//!
//! Wire shape shared by the offline pipeline, the preview graph and the AI
//! settings patch:
//! - `eq_settings` is always present with exactly 10 canonical bands
//! - every other section is optional; an absent section means the stage is skipped
//! - `clamped` enforces documented parameter bounds
//! - `apply_patch` merges an AI patch (sections replace, EQ merges per band)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineStageError, SettingsMergeError};

/// Number of EQ bands in every resolved settings object
pub const EQ_BAND_COUNT: usize = 10;

/// Canonical EQ layout: (frequency, type, default Q)
pub const CANONICAL_EQ_BANDS: [(f64, EqBandType, f64); EQ_BAND_COUNT] = [
    (60.0, EqBandType::LowShelf, 0.7),
    (120.0, EqBandType::Peak, 1.0),
    (250.0, EqBandType::Peak, 1.0),
    (500.0, EqBandType::Peak, 1.0),
    (1000.0, EqBandType::Peak, 1.0),
    (2000.0, EqBandType::Peak, 1.0),
    (4000.0, EqBandType::Peak, 1.0),
    (8000.0, EqBandType::Peak, 1.0),
    (12000.0, EqBandType::Peak, 1.0),
    (16000.0, EqBandType::HighShelf, 0.7),
];

/// Documented parameter bounds
pub mod bounds {
    pub const EQ_GAIN: (f64, f64) = (-12.0, 12.0);
    pub const EQ_Q: (f64, f64) = (0.1, 10.0);
    /// Highest EQ filter frequency as a fraction of the sample rate
    pub const EQ_MAX_FREQ_RATIO: f64 = 0.45;

    pub const COMP_THRESHOLD: (f64, f64) = (-60.0, 0.0);
    pub const COMP_RATIO: (f64, f64) = (1.0, 20.0);
    pub const COMP_ATTACK: (f64, f64) = (0.0001, 1.0);
    pub const COMP_RELEASE: (f64, f64) = (0.001, 5.0);
    pub const COMP_MAKEUP: (f64, f64) = (-12.0, 24.0);

    pub const SAT_DRIVE: (f64, f64) = (0.1, 10.0);
    pub const MIX: (f64, f64) = (0.0, 1.0);

    pub const EXCITER_DRIVE: (f64, f64) = (0.0, 10.0);
    pub const EXCITER_FREQ: (f64, f64) = (500.0, 16000.0);

    pub const STEREO_WIDTH: (f64, f64) = (0.0, 2.0);
    pub const BASS_MONO_FREQ: (f64, f64) = (0.0, 500.0);

    pub const LIMIT_CEILING: (f64, f64) = (-20.0, 0.0);
    pub const LIMIT_RELEASE: (f64, f64) = (0.001, 1.0);

    pub const MASK_SENSITIVITY: (f64, f64) = (0.0, 1.0);
    pub const TARGET_DR: (f64, f64) = (1.0, 30.0);
    pub const TARGET_LUFS: (f64, f64) = (-40.0, -5.0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// EQ
// ═══════════════════════════════════════════════════════════════════════════════

/// EQ filter shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqBandType {
    #[serde(rename = "low_shelf", alias = "lowshelf", alias = "low-shelf")]
    LowShelf,
    #[serde(rename = "peak", alias = "peaking", alias = "bell")]
    Peak,
    #[serde(rename = "high_shelf", alias = "highshelf", alias = "high-shelf")]
    HighShelf,
}

/// One EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    /// Center / corner frequency (Hz)
    pub frequency: f64,
    /// Gain (dB)
    pub gain: f64,
    pub q: f64,
    #[serde(rename = "type")]
    pub band_type: EqBandType,
}

/// EQ section (always 10 bands once resolved)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqSettings {
    pub bands: Vec<EqBand>,
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            bands: CANONICAL_EQ_BANDS
                .iter()
                .map(|&(frequency, band_type, q)| EqBand {
                    frequency,
                    gain: 0.0,
                    q,
                    band_type,
                })
                .collect(),
        }
    }
}

impl EqSettings {
    /// Exactly 10 bands, strictly ascending, shelves at both ends, peaks between
    pub fn is_valid(&self) -> bool {
        if self.bands.len() != EQ_BAND_COUNT {
            return false;
        }
        let ascending = self
            .bands
            .windows(2)
            .all(|pair| pair[0].frequency < pair[1].frequency);
        let types = self.bands.iter().enumerate().all(|(i, band)| {
            let expected = match i {
                0 => EqBandType::LowShelf,
                i if i == EQ_BAND_COUNT - 1 => EqBandType::HighShelf,
                _ => EqBandType::Peak,
            };
            band.band_type == expected
        });
        ascending && types && self.bands.iter().all(|b| b.frequency.is_finite())
    }

    /// Index of the band nearest to `frequency` (ties resolve to the lower band)
    pub fn nearest_band(&self, frequency: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, band) in self.bands.iter().enumerate() {
            let distance = (band.frequency - frequency).abs();
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((i, distance)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Merge suggested bands into a copy of this EQ
    ///
    /// Each suggestion lands on the nearest band; only gain and Q change.
    /// Returns the default list if the result would not be a valid 10-band EQ.
    pub fn merged(&self, patch: &EqPatch) -> EqSettings {
        let mut merged = if self.is_valid() {
            self.clone()
        } else {
            log::warn!(
                "EQ has {} bands or a broken layout, resetting to defaults before merge",
                self.bands.len()
            );
            EqSettings::default()
        };

        for suggestion in &patch.bands {
            if !suggestion.frequency.is_finite() {
                continue;
            }
            let Some(idx) = merged.nearest_band(suggestion.frequency) else {
                continue;
            };
            let band = &mut merged.bands[idx];
            if let Some(gain) = suggestion.gain.filter(|g| g.is_finite()) {
                band.gain = gain.clamp(bounds::EQ_GAIN.0, bounds::EQ_GAIN.1);
            }
            if let Some(q) = suggestion.q.filter(|q| q.is_finite()) {
                band.q = q.clamp(bounds::EQ_Q.0, bounds::EQ_Q.1);
            }
        }

        if merged.is_valid() {
            merged
        } else {
            EqSettings::default()
        }
    }

    /// Band gains in canonical order
    pub fn gains(&self) -> Vec<f64> {
        self.bands.iter().map(|b| b.gain).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Dynamics compression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// Threshold (dB)
    pub threshold: f64,
    pub ratio: f64,
    /// Attack (seconds)
    pub attack: f64,
    /// Release (seconds)
    pub release: f64,
    /// Makeup gain (dB)
    pub makeup_gain: f64,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            threshold: -12.0,
            ratio: 3.0,
            attack: 0.003,
            release: 0.1,
            makeup_gain: 0.0,
        }
    }
}

/// Saturation nonlinearity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaturationType {
    Tube,
    Tape,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationSettings {
    pub drive: f64,
    #[serde(rename = "type")]
    pub saturation_type: SaturationType,
    /// Wet/dry blend (0..1)
    pub mix: f64,
}

impl Default for SaturationSettings {
    fn default() -> Self {
        Self {
            drive: 1.0,
            saturation_type: SaturationType::Tube,
            mix: 0.0,
        }
    }
}

/// Which harmonics the exciter generates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarmonicsMode {
    Even,
    Odd,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExciterSettings {
    pub drive: f64,
    /// Lower edge of the excited band (Hz)
    pub frequency: f64,
    pub harmonics: HarmonicsMode,
    pub mix: f64,
}

impl Default for ExciterSettings {
    fn default() -> Self {
        Self {
            drive: 1.0,
            frequency: 3000.0,
            harmonics: HarmonicsMode::Even,
            mix: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoSettings {
    /// Side gain relative to mid (1.0 = unchanged)
    pub width: f64,
    pub phase_correction: bool,
    /// Side content below this frequency is removed (0 disables)
    pub bass_mono_freq: f64,
}

impl Default for StereoSettings {
    fn default() -> Self {
        Self {
            width: 1.0,
            phase_correction: false,
            bass_mono_freq: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitingSettings {
    /// Ceiling (dBFS)
    pub ceiling: f64,
    /// Release (seconds)
    pub release: f64,
}

impl Default for LimitingSettings {
    fn default() -> Self {
        Self {
            ceiling: -0.3,
            release: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingSettings {
    pub auto_correct: bool,
    pub boost_masked_frequencies: bool,
    /// 0..1, higher boosts masked bands harder
    pub sensitivity: f64,
}

impl Default for MaskingSettings {
    fn default() -> Self {
        Self {
            auto_correct: false,
            boost_masked_frequencies: true,
            sensitivity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicRangeSettings {
    /// Target crest-factor dynamic range (dB)
    pub target_dr: f64,
    pub auto_optimize: bool,
    pub preserve_transients: bool,
}

impl Default for DynamicRangeSettings {
    fn default() -> Self {
        Self {
            target_dr: 8.0,
            auto_optimize: false,
            preserve_transients: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessSettings {
    pub target_lufs: f64,
    pub auto_adjust: bool,
    pub genre_compliance: bool,
}

impl Default for LoudnessSettings {
    fn default() -> Self {
        Self {
            target_lufs: -14.0,
            auto_adjust: true,
            genre_compliance: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MASTERING SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete settings for one mastering render
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MasteringSettings {
    #[serde(default)]
    pub eq_settings: EqSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_settings: Option<CompressionSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation_settings: Option<SaturationSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stereo_settings: Option<StereoSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limiting_settings: Option<LimitingSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masking_settings: Option<MaskingSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_range_settings: Option<DynamicRangeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loudness_settings: Option<LoudnessSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exciter_settings: Option<ExciterSettings>,
}

impl MasteringSettings {
    /// Every section populated with its neutral default
    pub fn neutral() -> Self {
        Self {
            eq_settings: EqSettings::default(),
            compression_settings: Some(CompressionSettings::default()),
            saturation_settings: Some(SaturationSettings::default()),
            stereo_settings: Some(StereoSettings::default()),
            limiting_settings: Some(LimitingSettings::default()),
            masking_settings: Some(MaskingSettings::default()),
            dynamic_range_settings: Some(DynamicRangeSettings::default()),
            loudness_settings: Some(LoudnessSettings::default()),
            exciter_settings: Some(ExciterSettings::default()),
        }
    }

    /// Limiter settings, falling back to the built-in ceiling
    pub fn limiter(&self) -> LimitingSettings {
        self.limiting_settings.unwrap_or_default()
    }

    /// Apply a patch: present sections replace, EQ merges per band
    pub fn apply_patch(&self, patch: &SettingsPatch) -> MasteringSettings {
        let mut next = self.clone();
        next.eq_settings = match &patch.eq_settings {
            Some(eq) => self.eq_settings.merged(eq),
            None if self.eq_settings.is_valid() => self.eq_settings.clone(),
            None => EqSettings::default(),
        };
        if let Some(s) = patch.compression_settings {
            next.compression_settings = Some(s);
        }
        if let Some(s) = patch.saturation_settings {
            next.saturation_settings = Some(s);
        }
        if let Some(s) = patch.stereo_settings {
            next.stereo_settings = Some(s);
        }
        if let Some(s) = patch.limiting_settings {
            next.limiting_settings = Some(s);
        }
        if let Some(s) = patch.masking_settings {
            next.masking_settings = Some(s);
        }
        if let Some(s) = patch.dynamic_range_settings {
            next.dynamic_range_settings = Some(s);
        }
        if let Some(s) = patch.loudness_settings {
            next.loudness_settings = Some(s);
        }
        if let Some(s) = patch.exciter_settings {
            next.exciter_settings = Some(s);
        }
        next
    }

    /// Clamp every parameter into its documented range
    ///
    /// EQ frequencies stay canonical; filter design limits them below
    /// Nyquist for the stream at hand.
    pub fn clamped(&self) -> (MasteringSettings, Vec<PipelineStageError>) {
        let mut warnings = Vec::new();
        let mut out = self.clone();

        if !out.eq_settings.is_valid() {
            log::warn!("EQ layout invalid at render time, using default bands");
            out.eq_settings = EqSettings::default();
        }
        for (band, &(_, _, canonical_q)) in out.eq_settings.bands.iter_mut().zip(CANONICAL_EQ_BANDS.iter()) {
            band.gain = clamp("eq", "gain", band.gain, bounds::EQ_GAIN, 0.0, &mut warnings);
            band.q = clamp("eq", "q", band.q, bounds::EQ_Q, canonical_q, &mut warnings);
        }

        if let Some(c) = out.compression_settings.as_mut() {
            let d = CompressionSettings::default();
            c.threshold = clamp("compression", "threshold", c.threshold, bounds::COMP_THRESHOLD, d.threshold, &mut warnings);
            c.ratio = clamp("compression", "ratio", c.ratio, bounds::COMP_RATIO, d.ratio, &mut warnings);
            c.attack = clamp("compression", "attack", c.attack, bounds::COMP_ATTACK, d.attack, &mut warnings);
            c.release = clamp("compression", "release", c.release, bounds::COMP_RELEASE, d.release, &mut warnings);
            c.makeup_gain = clamp("compression", "makeup_gain", c.makeup_gain, bounds::COMP_MAKEUP, d.makeup_gain, &mut warnings);
        }
        if let Some(s) = out.saturation_settings.as_mut() {
            s.drive = clamp("saturation", "drive", s.drive, bounds::SAT_DRIVE, 1.0, &mut warnings);
            s.mix = clamp("saturation", "mix", s.mix, bounds::MIX, 0.0, &mut warnings);
        }
        if let Some(e) = out.exciter_settings.as_mut() {
            e.drive = clamp("exciter", "drive", e.drive, bounds::EXCITER_DRIVE, 1.0, &mut warnings);
            e.frequency = clamp("exciter", "frequency", e.frequency, bounds::EXCITER_FREQ, 3000.0, &mut warnings);
            e.mix = clamp("exciter", "mix", e.mix, bounds::MIX, 0.0, &mut warnings);
        }
        if let Some(s) = out.stereo_settings.as_mut() {
            s.width = clamp("stereo", "width", s.width, bounds::STEREO_WIDTH, 1.0, &mut warnings);
            s.bass_mono_freq = clamp("stereo", "bass_mono_freq", s.bass_mono_freq, bounds::BASS_MONO_FREQ, 0.0, &mut warnings);
        }
        if let Some(l) = out.limiting_settings.as_mut() {
            let d = LimitingSettings::default();
            l.ceiling = clamp("limiting", "ceiling", l.ceiling, bounds::LIMIT_CEILING, d.ceiling, &mut warnings);
            l.release = clamp("limiting", "release", l.release, bounds::LIMIT_RELEASE, d.release, &mut warnings);
        }
        if let Some(m) = out.masking_settings.as_mut() {
            m.sensitivity = clamp("masking", "sensitivity", m.sensitivity, bounds::MASK_SENSITIVITY, 0.5, &mut warnings);
        }
        if let Some(d) = out.dynamic_range_settings.as_mut() {
            d.target_dr = clamp("dynamic_range", "target_dr", d.target_dr, bounds::TARGET_DR, 8.0, &mut warnings);
        }
        if let Some(l) = out.loudness_settings.as_mut() {
            l.target_lufs = clamp("loudness", "target_lufs", l.target_lufs, bounds::TARGET_LUFS, -14.0, &mut warnings);
        }

        for w in &warnings {
            log::warn!("{w}");
        }
        (out, warnings)
    }
}

fn clamp(
    stage: &'static str,
    parameter: &'static str,
    value: f64,
    (min, max): (f64, f64),
    fallback: f64,
    warnings: &mut Vec<PipelineStageError>,
) -> f64 {
    let applied = if !value.is_finite() {
        fallback
    } else if value < min || value > max {
        value.clamp(min, max)
    } else {
        return value;
    };
    warnings.push(PipelineStageError {
        stage,
        parameter,
        value,
        min,
        max,
        applied,
    });
    applied
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTINGS PATCH
// ═══════════════════════════════════════════════════════════════════════════════

/// One suggested EQ band; only gain and Q are ever applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBandPatch {
    pub frequency: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub band_type: Option<EqBandType>,
}

impl EqBandPatch {
    pub fn gain(frequency: f64, gain: f64) -> Self {
        Self {
            frequency,
            gain: Some(gain),
            q: None,
            band_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EqPatch {
    pub bands: Vec<EqBandPatch>,
}

/// Partial settings, typically produced by the AI suggestion service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq_settings: Option<EqPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_settings: Option<CompressionSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation_settings: Option<SaturationSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stereo_settings: Option<StereoSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limiting_settings: Option<LimitingSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masking_settings: Option<MaskingSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_range_settings: Option<DynamicRangeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loudness_settings: Option<LoudnessSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exciter_settings: Option<ExciterSettings>,
}

impl SettingsPatch {
    /// Parse leniently from JSON text
    pub fn from_json_str(json: &str) -> (SettingsPatch, Vec<SettingsMergeError>) {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                let err = SettingsMergeError::new("patch", e.to_string());
                log::warn!("{err}");
                (SettingsPatch::default(), vec![err])
            }
        }
    }

    /// Parse leniently, section by section
    ///
    /// A malformed section is dropped (and reported), the rest survive.
    /// Malformed EQ band entries are dropped individually.
    pub fn from_value(value: &Value) -> (SettingsPatch, Vec<SettingsMergeError>) {
        let mut errors = Vec::new();
        let mut patch = SettingsPatch::default();

        let Some(object) = value.as_object() else {
            errors.push(SettingsMergeError::new("patch", "expected a JSON object"));
            log::warn!("{}", errors[0]);
            return (patch, errors);
        };

        if let Some(eq) = object.get("eq_settings") {
            patch.eq_settings = parse_eq(eq, &mut errors);
        }
        patch.compression_settings = section(object, "compression_settings", &mut errors);
        patch.saturation_settings = section(object, "saturation_settings", &mut errors);
        patch.stereo_settings = section(object, "stereo_settings", &mut errors);
        patch.limiting_settings = section(object, "limiting_settings", &mut errors);
        patch.masking_settings = section(object, "masking_settings", &mut errors);
        patch.dynamic_range_settings = section(object, "dynamic_range_settings", &mut errors);
        patch.loudness_settings = section(object, "loudness_settings", &mut errors);
        patch.exciter_settings = section(object, "exciter_settings", &mut errors);

        for err in &errors {
            log::warn!("{err}");
        }
        (patch, errors)
    }

    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// Layer `other` on top: its sections win, its EQ bands are appended
    pub fn overlay(&mut self, other: SettingsPatch) {
        if let Some(eq) = other.eq_settings {
            self.eq_settings
                .get_or_insert_with(EqPatch::default)
                .bands
                .extend(eq.bands);
        }
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            compression_settings,
            saturation_settings,
            stereo_settings,
            limiting_settings,
            masking_settings,
            dynamic_range_settings,
            loudness_settings,
            exciter_settings
        );
    }
}

fn section<T: serde::de::DeserializeOwned>(
    object: &serde_json::Map<String, Value>,
    name: &str,
    errors: &mut Vec<SettingsMergeError>,
) -> Option<T> {
    let value = object.get(name)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.push(SettingsMergeError::new(name, e.to_string()));
            None
        }
    }
}

fn parse_eq(value: &Value, errors: &mut Vec<SettingsMergeError>) -> Option<EqPatch> {
    let bands = match value {
        Value::Null => return None,
        Value::Array(items) => items,
        Value::Object(map) => match map.get("bands") {
            Some(Value::Array(items)) => items,
            _ => {
                errors.push(SettingsMergeError::new("eq_settings", "missing `bands` array"));
                return None;
            }
        },
        _ => {
            errors.push(SettingsMergeError::new("eq_settings", "expected an object"));
            return None;
        }
    };

    let mut patch = EqPatch::default();
    for (i, item) in bands.iter().enumerate() {
        match serde_json::from_value::<EqBandPatch>(item.clone()) {
            Ok(band) => patch.bands.push(band),
            Err(e) => errors.push(SettingsMergeError::new(
                format!("eq_settings.bands[{i}]"),
                e.to_string(),
            )),
        }
    }
    Some(patch)
}

//! Track and mastering session records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::buffer::AudioBuffer;
use crate::settings::{MasteringSettings, SettingsPatch};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

opaque_id!(
    /// Track identifier
    TrackId
);
opaque_id!(
    /// Mastering session identifier
    SessionId
);
opaque_id!(
    /// Handle to a rendered buffer held by the output store
    OutputId
);

/// A piece of audio known to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub filename: Option<String>,
    pub sample_rate: u32,
    pub channels: usize,
    pub bit_depth: Option<u16>,
    /// Seconds
    pub duration: f64,

    pub predicted_genre: Option<String>,
    pub genre_confidence: Option<f64>,
    pub tempo: Option<f64>,
    pub key: Option<String>,

    /// Latest analysis
    pub analysis: Option<AnalysisResult>,
    /// Current mastering settings
    pub settings: Option<MasteringSettings>,

    pub is_analyzed: bool,
    pub is_processed: bool,
    pub analysis_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Track {
    pub fn new(id: TrackId) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename: None,
            sample_rate: 0,
            channels: 0,
            bit_depth: None,
            duration: 0.0,
            predicted_genre: None,
            genre_confidence: None,
            tempo: None,
            key: None,
            analysis: None,
            settings: None,
            is_analyzed: false,
            is_processed: false,
            analysis_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Track describing a decoded buffer
    pub fn from_audio(id: TrackId, audio: &AudioBuffer) -> Self {
        let mut track = Self::new(id);
        track.sample_rate = audio.sample_rate;
        track.channels = audio.channels;
        track.duration = audio.duration();
        track
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_bit_depth(mut self, bits: u16) -> Self {
        self.bit_depth = Some(bits);
        self
    }

    /// Store a successful analysis
    pub fn record_analysis(&mut self, analysis: AnalysisResult) {
        self.predicted_genre = Some(analysis.genre.clone());
        self.genre_confidence = Some(analysis.genre_confidence);
        self.tempo = Some(analysis.tempo);
        self.key = Some(analysis.key.clone());
        self.analysis = Some(analysis);
        self.is_analyzed = true;
        self.analysis_error = None;
        self.touch();
    }

    /// Store a failed analysis (message is never empty)
    pub fn record_analysis_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.analysis_error = Some(if message.trim().is_empty() {
            "analysis failed".to_string()
        } else {
            message
        });
        self.is_analyzed = false;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Append-only record of one settings change or render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteringSession {
    pub id: SessionId,
    pub track_id: TrackId,
    pub settings: MasteringSettings,
    pub ai_suggestions: Option<SettingsPatch>,
    pub user_feedback: Option<String>,
    pub output_id: Option<OutputId>,
    /// Settings fingerprint of the render
    pub fingerprint: Option<String>,
    /// Seconds
    pub processing_time: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl MasteringSession {
    pub fn new(track_id: TrackId, settings: MasteringSettings) -> Self {
        Self {
            id: SessionId::new(),
            track_id,
            settings,
            ai_suggestions: None,
            user_feedback: None,
            output_id: None,
            fingerprint: None,
            processing_time: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_suggestions(mut self, patch: SettingsPatch) -> Self {
        self.ai_suggestions = Some(patch);
        self
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.user_feedback = Some(feedback.into());
        self
    }

    pub fn with_render(mut self, output: OutputId, fingerprint: String, seconds: f64) -> Self {
        self.output_id = Some(output);
        self.fingerprint = Some(fingerprint);
        self.processing_time = Some(seconds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(TrackId::new(), TrackId::new());
        assert_eq!(TrackId::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_analysis_error_never_empty() {
        let mut track = Track::new(TrackId::new());
        track.record_analysis_error("  ");
        assert!(!track.is_analyzed);
        assert_eq!(track.analysis_error.as_deref(), Some("analysis failed"));
    }

    #[test]
    fn test_from_audio() {
        let audio = AudioBuffer::from_interleaved(vec![0.0; 96000], 2, 48000).unwrap();
        let track = Track::from_audio(TrackId::from("t1"), &audio).with_bit_depth(24);
        assert_eq!(track.channels, 2);
        assert_eq!(track.duration, 1.0);
        assert_eq!(track.bit_depth, Some(24));
    }
}

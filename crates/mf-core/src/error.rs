//! Error taxonomy for the mastering engine
//!
//! Fatal errors (decode, analysis) end a task in FAILURE. Recoverable errors
//! (settings merge, stage parameter clamps, preview graph build) are values
//! that callers log and carry in reports; they never abort processing.

use thiserror::Error;

/// Audio could not be read into a usable buffer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("audio buffer has no channels")]
    NoChannels,

    #[error("audio buffer has a sample rate of 0 Hz")]
    ZeroSampleRate,

    #[error("audio buffer is empty")]
    Empty,

    #[error("sample count {len} is not a multiple of the channel count {channels}")]
    Misaligned { len: usize, channels: usize },

    #[error("non-finite sample at index {index}")]
    NonFinite { index: usize },

    #[error("unreadable audio: {0}")]
    Unreadable(String),
}

/// Feature extraction could not produce a result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("audio is too short for analysis ({duration:.2}s, need at least {min:.1}s)")]
    TooShort { duration: f64, min: f64 },

    #[error("audio is silent (peak {peak_db:.1} dBFS)")]
    Silent { peak_db: f64 },

    #[error("analysis failed: {0}")]
    Failed(String),
}

/// A malformed settings patch section; the section falls back to its default
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed `{section}` in settings patch: {reason}")]
pub struct SettingsMergeError {
    pub section: String,
    pub reason: String,
}

impl SettingsMergeError {
    pub fn new(section: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            reason: reason.into(),
        }
    }
}

/// A stage parameter outside its documented bounds; the value is clamped
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage}.{parameter} = {value} outside [{min}, {max}], using {applied}")]
pub struct PipelineStageError {
    pub stage: &'static str,
    pub parameter: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub applied: f64,
}

/// The preview graph could not be attached to a playback context
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphBuildError {
    #[error("playback context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("unsupported playback format: {sample_rate} Hz, {channels} channels")]
    UnsupportedFormat { sample_rate: u32, channels: usize },
}

/// A polling client gave up; says nothing about the task itself
#[derive(Error, Debug, Clone, PartialEq)]
#[error("gave up waiting for task {task_id} after {attempts} polls")]
pub struct TaskTimeout {
    pub task_id: String,
    pub attempts: u32,
}

/// Umbrella error for operations that can end a task
#[derive(Error, Debug)]
pub enum MasterError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("processing cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations
pub type MasterResult<T> = Result<T, MasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = AnalysisError::TooShort {
            duration: 0.5,
            min: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "audio is too short for analysis (0.50s, need at least 1.0s)"
        );

        let err = MasterError::from(DecodeError::NoChannels);
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_stage_error_display() {
        let err = PipelineStageError {
            stage: "compression",
            parameter: "ratio",
            value: 40.0,
            min: 1.0,
            max: 20.0,
            applied: 20.0,
        };
        assert_eq!(
            err.to_string(),
            "compression.ratio = 40 outside [1, 20], using 20"
        );
    }
}

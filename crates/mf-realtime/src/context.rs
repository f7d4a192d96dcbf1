//! Playback contexts the preview graph attaches to

use serde::{Deserialize, Serialize};

use mf_core::GraphBuildError;

/// Most channels the preview graph will process
pub const MAX_CHANNELS: usize = 8;

/// Where preview audio is played
///
/// Implemented by audio backends; the graph only needs the stream format.
pub trait PlaybackContext {
    fn format(&self) -> Result<PlaybackFormat, GraphBuildError>;
}

/// Interleaved stream format of a playback context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFormat {
    pub sample_rate: u32,
    pub channels: usize,
}

impl PlaybackFormat {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2)
    }
}

impl PlaybackContext for PlaybackFormat {
    fn format(&self) -> Result<PlaybackFormat, GraphBuildError> {
        if self.sample_rate == 0 || self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(GraphBuildError::UnsupportedFormat {
                sample_rate: self.sample_rate,
                channels: self.channels,
            });
        }
        Ok(*self)
    }
}

/// A context whose device could not be opened
#[derive(Debug, Clone)]
pub struct UnavailableContext {
    reason: String,
}

impl UnavailableContext {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl PlaybackContext for UnavailableContext {
    fn format(&self) -> Result<PlaybackFormat, GraphBuildError> {
        Err(GraphBuildError::ContextUnavailable(self.reason.clone()))
    }
}

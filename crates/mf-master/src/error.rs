//! Pipeline error types

use mf_core::DecodeError;
use thiserror::Error;

/// Why a render produced no output
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("render cancelled")]
    Cancelled,

    #[error("invalid input buffer: {0}")]
    InvalidBuffer(#[from] DecodeError),

    #[error("settings serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

//! Error types for feature extraction

use mf_core::{AnalysisError, DecodeError};
use thiserror::Error;

/// Why an extraction produced no result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("analysis cancelled")]
    Cancelled,
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;

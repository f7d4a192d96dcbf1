//! Engine error types

use thiserror::Error;

use mf_core::{DecodeError, TrackId};

use crate::task::{TaskId, TaskState};

/// Task lifecycle violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("unknown task {0}")]
    Unknown(TaskId),

    #[error("task {id} is already {state}")]
    Terminal { id: TaskId, state: TaskState },

    #[error("task {0} already committed its result")]
    Committed(TaskId),
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),

    #[error("unknown preview graph {0}")]
    UnknownGraph(u64),

    #[error("track {0} has no analysis yet")]
    NotAnalyzed(TrackId),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("engine is shut down")]
    ShutDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

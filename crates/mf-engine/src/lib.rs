//! mf-engine: the mastering engine behind every front end
//!
//! ## Features
//! - **Task lifecycle**: PENDING → PROGRESS → SUCCESS | FAILURE, monotonic
//!   progress, frozen terminal states, event subscription
//! - **Worker pool**: analysis and mastering run off the interactive path,
//!   cooperative cancellation between stages
//! - **Per-track mastering policy**: a new render supersedes or queues
//!   behind the active one
//! - **Stores**: tracks and their audio, rendered outputs, current settings
//!   with synchronous change subscribers
//! - **Suggestions**: pluggable provider with a rule-based default
//! - **Preview graphs**: build and update live preview chains by handle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mf_engine::{EngineConfig, MasteringEngine};
//!
//! let engine = MasteringEngine::new(EngineConfig::default());
//! let track_id = engine.add_track(audio, Some("mix.wav"));
//! let task = engine.analyze(&track_id)?;
//! let status = engine.wait(&task, Duration::from_secs(30));
//! ```

pub mod config;
pub mod engine;
pub mod poll;
pub mod scheduler;
pub mod status;
pub mod stores;
pub mod suggestions;
pub mod task;

mod error;

pub use config::{EngineConfig, MasteringPolicy, PollConfig};
pub use engine::{GraphHandle, MasteringEngine, PreviewAttachment};
pub use error::{EngineError, EngineResult, TaskError};
pub use poll::PollClient;
pub use scheduler::{JobError, TaskContext, TaskJob, TaskScheduler};
pub use status::TaskStatusStore;
pub use stores::{OutputStore, SettingsStore, TrackStore};
pub use suggestions::{RuleBasedSuggestions, SuggestionProvider, request_patch};
pub use task::{
    AnalysisTaskResult, MasteringTaskResult, TaskEvent, TaskId, TaskKind, TaskResult, TaskState,
    TaskStatus,
};

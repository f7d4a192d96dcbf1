//! Task records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mf_core::{AnalysisResult, MasteringSettings, OutputId, SessionId, SettingsPatch, TrackId};
use mf_master::RenderReport;

/// Opaque task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Progress,
    Success,
    Failure,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Progress => "PROGRESS",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Analysis,
    Mastering,
}

/// Outcome of an analysis task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTaskResult {
    pub track_id: TrackId,
    pub analysis: AnalysisResult,
    pub ai_suggestions: SettingsPatch,
    /// Settings resolved from analysis, genre and suggestions
    pub settings: MasteringSettings,
    pub auto_applied: bool,
}

/// Outcome of a mastering task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteringTaskResult {
    pub track_id: TrackId,
    pub session_id: SessionId,
    /// Rendered buffer in the output store
    pub output_id: OutputId,
    pub fingerprint: String,
    pub report: RenderReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskResult {
    Analysis(Box<AnalysisTaskResult>),
    Mastering(MasteringTaskResult),
}

impl TaskResult {
    pub fn as_analysis(&self) -> Option<&AnalysisTaskResult> {
        match self {
            TaskResult::Analysis(result) => Some(result),
            TaskResult::Mastering(_) => None,
        }
    }

    pub fn as_mastering(&self) -> Option<&MasteringTaskResult> {
        match self {
            TaskResult::Mastering(result) => Some(result),
            TaskResult::Analysis(_) => None,
        }
    }
}

/// Queryable status of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub id: TaskId,
    pub kind: TaskKind,
    pub track_id: TrackId,
    pub state: TaskState,
    /// 0-100, never decreasing
    pub progress: u8,
    /// What the worker is doing right now
    pub stage: Option<String>,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(id: TaskId, kind: TaskKind, track_id: TrackId) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            track_id,
            state: TaskState::Pending,
            progress: 0,
            stage: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Notification sent on every status change
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEvent {
    pub id: TaskId,
    pub kind: TaskKind,
    pub track_id: TrackId,
    pub state: TaskState,
    pub progress: u8,
}

impl TaskEvent {
    pub(crate) fn from_status(status: &TaskStatus) -> Self {
        Self {
            id: status.id.clone(),
            kind: status.kind,
            track_id: status.track_id.clone(),
            state: status.state,
            progress: status.progress,
        }
    }
}

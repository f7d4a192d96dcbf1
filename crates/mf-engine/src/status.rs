//! Task status store
//!
//! Single source of truth for task lifecycles. Every mutation enforces the
//! state machine and notifies subscribers synchronously:
//! - PENDING → PROGRESS → SUCCESS | FAILURE
//! - progress clamps to 0-100 and never moves backwards
//! - terminal records are frozen
//! - events reach subscribers in commit order

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::{Mutex, RwLock};

use mf_core::TrackId;

use crate::error::TaskError;
use crate::task::{TaskEvent, TaskId, TaskKind, TaskResult, TaskState, TaskStatus};

const UNKNOWN_ERROR: &str = "unknown error";

/// Thread-safe task status registry
///
/// Writers take `subscribers` before `tasks` and keep it until their event
/// is sent, so two commits can never publish out of order.
#[derive(Default)]
pub struct TaskStatusStore {
    tasks: RwLock<HashMap<TaskId, TaskStatus>>,
    subscribers: Mutex<Vec<Sender<TaskEvent>>>,
}

impl TaskStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new PENDING task
    pub fn create(&self, kind: TaskKind, track_id: TrackId) -> TaskId {
        let id = TaskId::new();
        let status = TaskStatus::new(id.clone(), kind, track_id);
        let event = TaskEvent::from_status(&status);
        let mut subscribers = self.subscribers.lock();
        self.tasks.write().insert(id.clone(), status);
        log::info!("task {id} ({kind:?}) submitted");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        id
    }

    pub fn get(&self, id: &TaskId) -> Option<TaskStatus> {
        self.tasks.read().get(id).cloned()
    }

    pub fn state(&self, id: &TaskId) -> Option<TaskState> {
        self.tasks.read().get(id).map(|s| s.state)
    }

    /// Non-terminal tasks, oldest first
    pub fn active(&self) -> Vec<TaskStatus> {
        let mut active: Vec<TaskStatus> = self
            .tasks
            .read()
            .values()
            .filter(|s| !s.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|s| s.created_at);
        active
    }

    /// Report progress; moves PENDING to PROGRESS
    ///
    /// Lower values than already reported are ignored.
    pub fn set_progress(&self, id: &TaskId, progress: u8, stage: Option<&str>) -> Result<(), TaskError> {
        self.mutate(id, |status| {
            status.state = TaskState::Progress;
            status.progress = status.progress.max(progress.min(100));
            if let Some(stage) = stage {
                status.stage = Some(stage.to_string());
            }
        })?;
        log::debug!("task {id} at {progress}%");
        Ok(())
    }

    /// Finish with a result
    pub fn succeed(&self, id: &TaskId, result: TaskResult) -> Result<(), TaskError> {
        self.mutate(id, |status| {
            status.state = TaskState::Success;
            status.progress = 100;
            status.stage = None;
            status.result = Some(result);
        })?;
        log::info!("task {id} succeeded");
        Ok(())
    }

    /// Finish with an error message (never empty)
    pub fn fail(&self, id: &TaskId, message: impl Into<String>) -> Result<(), TaskError> {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        };
        log::info!("task {id} failed: {message}");
        self.mutate(id, |status| {
            status.state = TaskState::Failure;
            status.stage = None;
            status.error = Some(message);
        })
    }

    /// Move a PENDING task to PROGRESS; false when it already left PENDING
    ///
    /// Workers run a job only after winning this claim.
    pub fn try_claim(&self, id: &TaskId) -> bool {
        let claimed = self.mutate_if(id, |status| {
            if status.state != TaskState::Pending {
                return false;
            }
            status.state = TaskState::Progress;
            true
        });
        matches!(claimed, Ok(true))
    }

    /// Fail a task nobody has claimed yet
    ///
    /// Returns false, leaving the task alone, once a worker claimed it.
    pub fn fail_if_pending(&self, id: &TaskId, message: &str) -> Result<bool, TaskError> {
        let failed = self.mutate_if(id, |status| {
            if status.state != TaskState::Pending {
                return false;
            }
            status.state = TaskState::Failure;
            status.error = Some(message.to_string());
            true
        })?;
        if failed {
            log::info!("task {id} failed: {message}");
        }
        Ok(failed)
    }

    /// Event stream of every later mutation
    pub fn subscribe(&self) -> Receiver<TaskEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Block until the task is terminal or `timeout` passes
    ///
    /// Returns the latest status either way; `None` for unknown ids.
    pub fn wait(&self, id: &TaskId, timeout: Duration) -> Option<TaskStatus> {
        let events = self.subscribe();
        let deadline = Instant::now() + timeout;

        loop {
            let status = self.get(id)?;
            if status.is_terminal() {
                return Some(status);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Some(status);
            }
            match events.recv_timeout(remaining) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return self.get(id),
                Err(RecvTimeoutError::Disconnected) => return self.get(id),
            }
        }
    }

    fn mutate(&self, id: &TaskId, apply: impl FnOnce(&mut TaskStatus)) -> Result<(), TaskError> {
        self.mutate_if(id, |status| {
            apply(status);
            true
        })
        .map(|_| ())
    }

    /// Apply a change to a live task; `apply` returns whether it changed anything
    fn mutate_if(&self, id: &TaskId, apply: impl FnOnce(&mut TaskStatus) -> bool) -> Result<bool, TaskError> {
        let mut subscribers = self.subscribers.lock();
        let event = {
            let mut tasks = self.tasks.write();
            let status = tasks.get_mut(id).ok_or_else(|| TaskError::Unknown(id.clone()))?;
            if status.is_terminal() {
                return Err(TaskError::Terminal {
                    id: id.clone(),
                    state: status.state,
                });
            }
            if !apply(status) {
                return Ok(false);
            }
            status.updated_at = Utc::now();
            TaskEvent::from_status(status)
        };
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        Ok(true)
    }
}

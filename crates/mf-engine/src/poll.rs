//! Bounded status polling for callers outside the engine process
//!
//! Inside the engine, observers use [`TaskStatusStore::subscribe`]. A
//! remote caller only has a status query, so it polls at a fixed interval
//! and gives up after a fixed number of attempts. Giving up is the caller's
//! own timeout; the task itself may still finish.

use std::thread;
use std::time::Duration;

use mf_core::TaskTimeout;

use crate::config::PollConfig;
use crate::status::TaskStatusStore;
use crate::task::{TaskId, TaskStatus};

/// Polls a status query until the task is terminal
#[derive(Debug, Clone, PartialEq)]
pub struct PollClient {
    max_attempts: u32,
    interval: Duration,
}

impl Default for PollClient {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

impl PollClient {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn from_config(config: &PollConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.interval_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Query `fetch` until it returns a terminal status
    ///
    /// `None` from `fetch` (unknown id, transport error) counts as an
    /// attempt. `on_update` sees every status received.
    pub fn poll<F, U>(&self, id: &TaskId, mut fetch: F, mut on_update: U) -> Result<TaskStatus, TaskTimeout>
    where
        F: FnMut(&TaskId) -> Option<TaskStatus>,
        U: FnMut(&TaskStatus),
    {
        for attempt in 1..=self.max_attempts {
            if let Some(status) = fetch(id) {
                on_update(&status);
                if status.is_terminal() {
                    return Ok(status);
                }
            }
            if attempt < self.max_attempts {
                thread::sleep(self.interval);
            }
        }

        let timeout = TaskTimeout {
            task_id: id.to_string(),
            attempts: self.max_attempts,
        };
        log::warn!("{timeout}");
        Err(timeout)
    }

    /// Poll a local status store
    pub fn poll_store(&self, store: &TaskStatusStore, id: &TaskId) -> Result<TaskStatus, TaskTimeout> {
        self.poll(id, |id| store.get(id), |_| {})
    }
}

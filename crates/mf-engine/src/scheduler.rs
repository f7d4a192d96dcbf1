//! Task scheduler
//!
//! Worker pool that runs analysis and mastering jobs off the interactive
//! path. Jobs report progress through a [`TaskContext`] and poll its
//! cancellation flag between stages.
//!
//! Mastering jobs are serialized per track according to the
//! [`MasteringPolicy`]: a new render either supersedes the active one or
//! waits behind it.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;

use mf_core::TrackId;

use crate::config::MasteringPolicy;
use crate::error::{EngineError, EngineResult, TaskError};
use crate::status::TaskStatusStore;
use crate::task::{TaskId, TaskKind, TaskResult, TaskState};

const CANCELLED: &str = "cancelled";
const SHUT_DOWN: &str = "cancelled: engine shut down";

/// Error a job may end with; its message becomes the task error
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

/// Unit of work executed on a worker thread
pub type TaskJob = Box<dyn FnOnce(&TaskContext) -> Result<TaskResult, JobError> + Send>;

// ═══════════════════════════════════════════════════════════════════════════════
// TASK CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct CancelState {
    reason: Option<String>,
    committed: bool,
}

#[derive(Default)]
struct Cancellation {
    flag: AtomicBool,
    state: Mutex<CancelState>,
}

impl Cancellation {
    /// False once the job committed its result
    fn request(&self, reason: &str) -> bool {
        let mut state = self.state.lock();
        if state.committed {
            return false;
        }
        state.reason.get_or_insert_with(|| reason.to_string());
        self.flag.store(true, Ordering::SeqCst);
        true
    }

    fn reason(&self) -> String {
        self.state
            .lock()
            .reason
            .clone()
            .unwrap_or_else(|| CANCELLED.to_string())
    }
}

/// What a running job sees of its task
pub struct TaskContext {
    id: TaskId,
    track_id: TrackId,
    cancel: Arc<Cancellation>,
    statuses: Arc<TaskStatusStore>,
}

impl TaskContext {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn track_id(&self) -> &TrackId {
        &self.track_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.flag.load(Ordering::Relaxed)
    }

    /// Flag for code that checks cancellation itself (pipeline, extractor)
    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel.flag
    }

    /// Publish the job's side effects unless the task was cancelled
    ///
    /// Cancellation and commit exclude each other: once `apply` has run, a
    /// cancel request is refused and the task will succeed. Returns the
    /// cancellation reason instead when the task was cancelled first.
    pub fn commit<T>(&self, apply: impl FnOnce() -> T) -> Result<T, JobError> {
        let mut state = self.cancel.state.lock();
        if self.cancel.flag.load(Ordering::SeqCst) {
            let reason = state.reason.clone().unwrap_or_else(|| CANCELLED.to_string());
            return Err(reason.into());
        }
        let committed = apply();
        state.committed = true;
        Ok(committed)
    }

    /// Report progress; late reports on a finished task are dropped
    pub fn progress(&self, progress: u8, stage: &str) {
        if let Err(e) = self.statuses.set_progress(&self.id, progress, Some(stage)) {
            log::debug!("progress for {} dropped: {e}", self.id);
        }
    }
}

struct Queued {
    ctx: TaskContext,
    kind: TaskKind,
    job: TaskJob,
}

/// Mastering work for one track
struct Lane {
    active: TaskId,
    waiting: VecDeque<Queued>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEDULER
// ═══════════════════════════════════════════════════════════════════════════════

struct Shared {
    statuses: Arc<TaskStatusStore>,
    cancels: Mutex<HashMap<TaskId, Arc<Cancellation>>>,
    lanes: Mutex<HashMap<TrackId, Lane>>,
    policy: MasteringPolicy,
}

impl Shared {
    fn cancel(&self, id: &TaskId, reason: &str) -> Result<(), TaskError> {
        let status = self
            .statuses
            .get(id)
            .ok_or_else(|| TaskError::Unknown(id.clone()))?;
        if status.is_terminal() {
            return Err(TaskError::Terminal {
                id: id.clone(),
                state: status.state,
            });
        }

        let accepted = self
            .cancels
            .lock()
            .get(id)
            .is_none_or(|cancel| cancel.request(reason));
        if !accepted {
            return Err(TaskError::Committed(id.clone()));
        }
        // Unclaimed work fails right away; claimed work fails at its next check
        self.statuses.fail_if_pending(id, reason)?;
        log::info!("task {id} cancellation requested ({reason})");
        Ok(())
    }

    /// Bookkeeping once a job left the worker
    fn finish(&self, id: &TaskId, track_id: &TrackId, kind: TaskKind, sender: &Sender<Queued>) {
        self.cancels.lock().remove(id);
        if kind != TaskKind::Mastering {
            return;
        }

        let next = {
            let mut lanes = self.lanes.lock();
            let Some(lane) = lanes.get_mut(track_id) else {
                return;
            };
            if lane.active != *id {
                return;
            }
            match lane.waiting.pop_front() {
                Some(next) => {
                    lane.active = next.ctx.id.clone();
                    Some(next)
                }
                None => {
                    lanes.remove(track_id);
                    None
                }
            }
        };

        if let Some(next) = next {
            log::debug!("dispatching queued task {} for track {track_id}", next.ctx.id);
            if let Err(e) = sender.send(next) {
                log::error!("worker queue closed, dropping task {}", e.0.ctx.id);
                let _ = self.statuses.fail(&e.0.ctx.id, SHUT_DOWN);
            }
        }
    }

    fn execute(&self, queued: Queued, sender: &Sender<Queued>) {
        let Queued { ctx, kind, job } = queued;

        // A task cancelled while queued loses the claim and never runs
        if self.statuses.try_claim(&ctx.id) {
            let outcome = if ctx.is_cancelled() {
                Err(ctx.cancel.reason())
            } else {
                match panic::catch_unwind(AssertUnwindSafe(|| job(&ctx))) {
                    Ok(_) if ctx.is_cancelled() => Err(ctx.cancel.reason()),
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("worker panicked".to_string()),
                }
            };

            let recorded = match outcome {
                Ok(result) => self.statuses.succeed(&ctx.id, result),
                Err(message) => self.statuses.fail(&ctx.id, message),
            };
            if let Err(e) = recorded {
                log::debug!("outcome of {} not recorded: {e}", ctx.id);
            }
        }

        self.finish(&ctx.id, &ctx.track_id, kind, sender);
    }
}

/// Fixed-size worker pool with cooperative cancellation
pub struct TaskScheduler {
    shared: Arc<Shared>,
    sender: Sender<Queued>,
    receiver: Receiver<Queued>,
    workers: Vec<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl TaskScheduler {
    /// Spawn `workers` threads (at least one)
    pub fn new(workers: usize, policy: MasteringPolicy, statuses: Arc<TaskStatusStore>) -> Self {
        let (sender, receiver) = unbounded::<Queued>();
        let running = Arc::new(AtomicBool::new(true));
        let shared = Arc::new(Shared {
            statuses,
            cancels: Mutex::new(HashMap::new()),
            lanes: Mutex::new(HashMap::new()),
            policy,
        });

        let workers = (0..workers.max(1))
            .filter_map(|index| {
                let shared = Arc::clone(&shared);
                let running = Arc::clone(&running);
                let sender = sender.clone();
                let receiver = receiver.clone();
                let spawned = thread::Builder::new()
                    .name(format!("mf-worker-{index}"))
                    .spawn(move || {
                        while running.load(Ordering::Relaxed) {
                            match receiver.recv_timeout(Duration::from_millis(100)) {
                                Ok(queued) => shared.execute(queued, &sender),
                                Err(RecvTimeoutError::Timeout) => continue,
                                Err(RecvTimeoutError::Disconnected) => break,
                            }
                        }
                    });
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        log::error!("failed to spawn worker {index}: {e}");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        log::info!("task scheduler started with {} workers ({policy:?})", workers.len());
        Self {
            shared,
            sender,
            receiver,
            workers,
            running,
        }
    }

    pub fn statuses(&self) -> &Arc<TaskStatusStore> {
        &self.shared.statuses
    }

    pub fn policy(&self) -> MasteringPolicy {
        self.shared.policy
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Queue a job; returns its PENDING task id
    pub fn submit(&self, kind: TaskKind, track_id: TrackId, job: TaskJob) -> EngineResult<TaskId> {
        if !self.is_running() || self.workers.is_empty() {
            return Err(EngineError::ShutDown);
        }

        let id = self.shared.statuses.create(kind, track_id.clone());
        let cancel = Arc::new(Cancellation::default());
        self.shared.cancels.lock().insert(id.clone(), Arc::clone(&cancel));
        let queued = Queued {
            ctx: TaskContext {
                id: id.clone(),
                track_id: track_id.clone(),
                cancel,
                statuses: Arc::clone(&self.shared.statuses),
            },
            kind,
            job,
        };

        if kind == TaskKind::Mastering {
            let superseded = {
                let mut lanes = self.shared.lanes.lock();
                match lanes.get_mut(&track_id) {
                    None => {
                        lanes.insert(
                            track_id.clone(),
                            Lane {
                                active: id.clone(),
                                waiting: VecDeque::new(),
                            },
                        );
                        None
                    }
                    Some(lane) => match self.shared.policy {
                        MasteringPolicy::Queue => {
                            log::debug!("task {id} queued behind {} on track {track_id}", lane.active);
                            lane.waiting.push_back(queued);
                            return Ok(id);
                        }
                        MasteringPolicy::Supersede => {
                            Some(std::mem::replace(&mut lane.active, id.clone()))
                        }
                    },
                }
            };

            if let Some(previous) = superseded {
                let reason = format!("superseded by task {id}");
                if let Err(e) = self.shared.cancel(&previous, &reason) {
                    log::debug!("superseded task {previous} already finished: {e}");
                }
            }
        }

        self.dispatch(queued);
        Ok(id)
    }

    fn dispatch(&self, queued: Queued) {
        if let Err(e) = self.sender.send(queued) {
            let id = e.0.ctx.id;
            log::error!("worker queue closed, dropping task {id}");
            let _ = self.shared.statuses.fail(&id, SHUT_DOWN);
        }
    }

    /// Cancel a PENDING or PROGRESS task
    pub fn cancel(&self, id: &TaskId) -> Result<(), TaskError> {
        self.shared.cancel(id, CANCELLED)
    }

    /// Stop the workers; queued tasks fail
    pub fn shutdown(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for cancel in self.shared.cancels.lock().values() {
            cancel.request(SHUT_DOWN);
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }

        let mut abandoned: Vec<Queued> = self.receiver.try_iter().collect();
        for lane in self.shared.lanes.lock().drain().map(|(_, lane)| lane) {
            abandoned.extend(lane.waiting);
        }
        for queued in abandoned {
            let _ = self.shared.statuses.fail(&queued.ctx.id, SHUT_DOWN);
        }
        self.shared.cancels.lock().clear();
        log::info!("task scheduler stopped");
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! [`HeartbeatScheduler`] – recurring task-file check.
//!
//! # States
//!
//! ```text
//!        start(interval)                     timer tick / eager check
//!  Idle ─────────────────▶ timer active ──────────────────────────────▶ Running-check
//!   ▲                        │    ▲                                        │
//!   └──────── stop() ────────┘    └──────── check done / failed ───────────┘
//! ```
//!
//! * [`start`][HeartbeatScheduler::start] is a no-op while a timer is active;
//!   otherwise it arms the timer and runs one check right away.
//! * Every check is spawned on its own task.  A check that finds another check
//!   still running returns [`CheckOutcome::Skipped`] without queueing.
//! * [`stop`][HeartbeatScheduler::stop] cancels future ticks only; a check in
//!   flight finishes and clears its own running flag.
//! * Read and trigger failures are logged and reported as
//!   [`CheckOutcome::Failed`]; they never stop the timer.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hearth_heartbeat::{HeartbeatScheduler, LogTrigger};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = HeartbeatScheduler::new("/home/me/.hearth", Arc::new(LogTrigger))?;
//! scheduler.start(Duration::from_secs(30 * 60));
//! // … later
//! scheduler.stop();
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::task_file::{TaskFile, TaskFileError};
use crate::trigger::{ProactiveTrigger, TriggerError};

/// Default interval between checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of a single heartbeat check.  Logged, never propagated.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    TaskFile(#[from] TaskFileError),
    #[error(transparent)]
    Trigger(#[from] TriggerError),
}

/// What a single check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Another check was still running.
    Skipped,
    /// The task file had no active lines.
    NoTasks,
    /// The trigger was notified.
    Triggered,
    /// Reading the task file or notifying the trigger failed.
    Failed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared check state
// ─────────────────────────────────────────────────────────────────────────────

struct CheckState {
    task_file: TaskFile,
    trigger: Arc<dyn ProactiveTrigger>,
    running: AtomicBool,
}

/// Clears the running flag however the check ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckState {
    async fn check(&self) -> CheckOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("heartbeat check already running; skipping");
            return CheckOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);

        match self.run().await {
            Ok(true) => CheckOutcome::Triggered,
            Ok(false) => CheckOutcome::NoTasks,
            Err(e) => {
                error!(error = %e, path = %self.task_file.path().display(), "heartbeat check failed");
                CheckOutcome::Failed
            }
        }
    }

    async fn run(&self) -> Result<bool, CheckError> {
        let Some(payload) = self.task_file.pending()? else {
            debug!("no heartbeat tasks");
            return Ok(false);
        };
        info!("heartbeat tasks found, triggering proactive turn");
        self.trigger.notify(&payload).await?;
        Ok(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HeartbeatScheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Periodically checks `heartbeat.md` and notifies a [`ProactiveTrigger`].
///
/// [`start`][Self::start] and the timer spawn Tokio tasks, so they must be
/// called from within a runtime.  Dropping the scheduler stops the timer.
pub struct HeartbeatScheduler {
    state: Arc<CheckState>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatScheduler {
    /// Build a scheduler for the task file in `dir`, seeding it if absent.
    pub fn new(
        dir: impl AsRef<Path>,
        trigger: Arc<dyn ProactiveTrigger>,
    ) -> Result<Self, TaskFileError> {
        let task_file = TaskFile::open(dir)?;
        Ok(Self {
            state: Arc::new(CheckState {
                task_file,
                trigger,
                running: AtomicBool::new(false),
            }),
            timer: Mutex::new(None),
        })
    }

    pub fn task_file(&self) -> &TaskFile {
        &self.state.task_file
    }

    /// Arm the recurring timer and run one check immediately.
    ///
    /// Returns `false` (and does nothing) when a timer is already active or
    /// `interval` is zero.
    pub fn start(&self, interval: Duration) -> bool {
        if interval.is_zero() {
            warn!("refusing to start heartbeat with a zero interval");
            return false;
        }
        let mut timer = self.timer_slot();
        if timer.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let state = Arc::clone(&self.state);
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                spawn_check(&state);
            }
        }));
        spawn_check(&self.state);

        info!(interval_secs = interval.as_secs_f64(), "heartbeat scheduler started");
        true
    }

    /// [`start`][Self::start] with an interval in minutes.
    pub fn start_minutes(&self, minutes: u64) -> bool {
        self.start(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Cancel the timer.  Returns `false` when it was not active.
    pub fn stop(&self) -> bool {
        let Some(handle) = self.timer_slot().take() else {
            return false;
        };
        handle.abort();
        info!("heartbeat scheduler stopped");
        true
    }

    pub fn is_active(&self) -> bool {
        self.timer_slot().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// `true` while a check is in flight.
    pub fn is_checking(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Run one check now, outside the timer cadence.
    pub async fn check(&self) -> CheckOutcome {
        self.state.check().await
    }

    fn timer_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.timer_slot().take() {
            handle.abort();
        }
    }
}

fn spawn_check(state: &Arc<CheckState>) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        state.check().await;
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

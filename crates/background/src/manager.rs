use std::{
    any::Any,
    borrow::Cow,
    fmt,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures::FutureExt;
use telemetry::{KeyValue, metrics};
use tokio_util::task::TaskTracker;

use crate::BackgroundError;

/// Lifecycle of a [`BackgroundTaskManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Accepting tasks.
    Running,
    /// Shutdown started; outstanding tasks are being waited for.
    Draining,
    /// Terminal. New tasks are rejected.
    Stopped,
}

impl ManagerState {
    /// Lowercase name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerState::Running => "running",
            ManagerState::Draining => "draining",
            ManagerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a shutdown drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every task finished before the deadline.
    Drained,
    /// The deadline elapsed with tasks still running. They are not aborted.
    TimedOut {
        /// Tasks still running when the deadline passed.
        outstanding: usize,
    },
}

impl DrainOutcome {
    /// Whether all tasks finished in time.
    pub fn is_drained(&self) -> bool {
        matches!(self, DrainOutcome::Drained)
    }
}

/// Tracks detached tasks so the process can wait for them before exiting.
///
/// Cloning is cheap and every clone refers to the same set of tasks.
#[derive(Clone)]
pub struct BackgroundTaskManager {
    tracker: TaskTracker,
    state: Arc<Mutex<ManagerState>>,
}

impl Default for BackgroundTaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackgroundTaskManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTaskManager")
            .field("state", &self.state())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl BackgroundTaskManager {
    /// Creates a running manager with no tasks.
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            state: Arc::new(Mutex::new(ManagerState::Running)),
        }
    }

    /// Starts `task` in the background.
    ///
    /// The task is counted as outstanding before it is scheduled, so a concurrent shutdown
    /// always waits for it. Tasks submitted while draining are still accepted and waited for;
    /// once the manager is stopped they are rejected.
    pub fn spawn<F>(&self, name: impl Into<Cow<'static, str>>, task: F) -> Result<(), BackgroundError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();

        // Holding the state lock orders this spawn against the transition to stopped.
        let state = self.lock_state();

        if *state == ManagerState::Stopped {
            log::warn!("Background task '{name}' rejected, the task manager is stopped");
            return Err(BackgroundError::Stopped(name.into_owned()));
        }

        log::debug!("Starting background task '{name}'");

        self.tracker.spawn(run_isolated(name, task));

        Ok(())
    }

    /// Number of tasks started but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ManagerState {
        *self.lock_state()
    }

    /// Waits for outstanding tasks, at most until `deadline` has passed.
    ///
    /// Call this after the listener has stopped accepting requests. The manager ends up
    /// stopped regardless of the outcome; tasks still running after a timeout keep running
    /// until the runtime is torn down. Calling it again on a stopped manager returns
    /// immediately.
    pub async fn shutdown(&self, deadline: Duration) -> DrainOutcome {
        {
            let mut state = self.lock_state();

            if *state == ManagerState::Stopped {
                return match self.outstanding() {
                    0 => DrainOutcome::Drained,
                    outstanding => DrainOutcome::TimedOut { outstanding },
                };
            }

            *state = ManagerState::Draining;
        }

        self.tracker.close();

        log::info!(
            "Waiting up to {deadline:?} for {} background task(s) to finish",
            self.outstanding()
        );

        let outcome = match tokio::time::timeout(deadline, self.tracker.wait()).await {
            Ok(()) => DrainOutcome::Drained,
            Err(_) => DrainOutcome::TimedOut {
                outstanding: self.outstanding(),
            },
        };

        *self.lock_state() = ManagerState::Stopped;

        match outcome {
            DrainOutcome::Drained => log::info!("All background tasks finished"),
            DrainOutcome::TimedOut { outstanding } => {
                log::warn!("Shutdown deadline of {deadline:?} elapsed with {outstanding} background task(s) still running")
            }
        }

        outcome
    }

    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_isolated<F>(name: Cow<'static, str>, task: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    match AssertUnwindSafe(task).catch_unwind().await {
        Ok(Ok(())) => {
            log::debug!("Background task '{name}' finished");
        }
        Ok(Err(error)) => {
            log::error!("Background task '{name}' failed: {error:#}");
            record_failure(&name, "error");
        }
        Err(panic) => {
            log::error!("Background task '{name}' panicked: {}", panic_message(panic.as_ref()));
            record_failure(&name, "panic");
        }
    }
}

fn record_failure(name: &str, kind: &'static str) {
    metrics::increment(
        metrics::BACKGROUND_TASKS_FAILED,
        &[KeyValue::new("task", name.to_string()), KeyValue::new("kind", kind)],
    );
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

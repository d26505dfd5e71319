//! Keyed task scheduler
//!
//! Runs one-off jobs (poll expiry, for example) at a point in time.
//! Jobs are keyed so they can be cancelled when their subject goes away.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

/// Cancellation side of a scheduler
#[cfg_attr(test, mockall::automock)]
pub trait Scheduler: Send + Sync {
    /// Cancel the task scheduled under `key`.
    ///
    /// Returns whether a task was cancelled. A missing task (never
    /// scheduled, or already fired) is not an error.
    fn cancel(&self, key: &str) -> bool;
}

/// Tokio-backed scheduler
///
/// Each job is a spawned task sleeping until its deadline.
#[derive(Clone, Default)]
pub struct TaskScheduler {
    tasks: Arc<Mutex<HashMap<String, (u64, AbortHandle)>>>,
    next_generation: Arc<std::sync::atomic::AtomicU64>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` at `when` (immediately if `when` is in the past).
    ///
    /// Scheduling an existing key replaces the previous job.
    pub fn schedule_at<F>(&self, key: impl Into<String>, when: DateTime<Utc>, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let generation = self
            .next_generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let delay = (when - Utc::now()).to_std().unwrap_or_default();

        // Hold the map while spawning so a job that fires immediately
        // cannot try to forget itself before it is registered.
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);

        let registry = self.tasks.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;

            // Forget ourselves unless we were replaced meanwhile.
            let mut tasks = registry.lock().unwrap_or_else(PoisonError::into_inner);
            if tasks.get(&task_key).map(|(g, _)| *g) == Some(generation) {
                tasks.remove(&task_key);
            }
        });

        if let Some((_, previous)) = tasks.insert(key.clone(), (generation, handle.abort_handle()))
        {
            previous.abort();
            tracing::debug!(key = %key, "Replaced scheduled task");
        }
    }
}

impl Scheduler for TaskScheduler {
    fn cancel(&self, key: &str) -> bool {
        let removed = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        match removed {
            Some((_, handle)) => {
                handle.abort();
                crate::metrics::SCHEDULED_TASKS_CANCELLED_TOTAL.inc();
                tracing::debug!(key, "Cancelled scheduled task");
                true
            }
            None => false,
        }
    }
}

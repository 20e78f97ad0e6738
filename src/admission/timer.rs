//! Periodic reset task for the admission counter.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::counter::AdmissionCounter;

/// Handle to a running reset task.
///
/// The task stops when [`stop`](Self::stop) is called, when the handle is
/// dropped, or once the counter itself has been dropped.
#[derive(Debug)]
pub struct ResetHandle {
    task: JoinHandle<()>,
    interval: Duration,
}

impl ResetHandle {
    /// The interval between resets.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the task is still scheduled.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the task and wait for it to wind down.
    pub async fn stop(mut self) {
        self.task.abort();
        // A cancelled task resolves to a JoinError; nothing to report.
        let _ = (&mut self.task).await;
    }
}

impl Drop for ResetHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl AdmissionCounter {
    /// Start clearing the table every configured reset interval.
    ///
    /// Returns `None` when no positive interval is configured. Must be called
    /// from within a Tokio runtime.
    pub fn start_reset_timer(self: &Arc<Self>) -> Option<ResetHandle> {
        let interval = self.reset_interval()?;
        Some(spawn_reset_task(Arc::downgrade(self), interval))
    }
}

fn spawn_reset_task(counter: Weak<AdmissionCounter>, period: Duration) -> ResetHandle {
    info!(interval_ms = period.as_millis() as u64, "Starting admission reset timer");

    let task = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(counter) = counter.upgrade() else {
                debug!("Admission counter dropped, stopping reset timer");
                break;
            };
            counter.reset();
        }
    });

    ResetHandle {
        task,
        interval: period,
    }
}

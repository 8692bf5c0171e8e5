//! Background sync loop.
//!
//! Runs a sync pass on a fixed interval and as soon as connectivity flips
//! from offline to online. Stopped through [`SchedulerHandle::shutdown`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use vigil_shared::ConnectivitySnapshot;

use crate::coordinator::{SubmissionCoordinator, SyncOutcome};

pub struct SyncScheduler {
    coordinator: Arc<SubmissionCoordinator>,
    interval: Duration,
    connectivity: Option<watch::Receiver<ConnectivitySnapshot>>,
}

pub struct SchedulerHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop. A pass already in progress is allowed to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            error!(error = %e, "Sync scheduler task panicked");
        }
    }
}

impl SyncScheduler {
    pub fn new(coordinator: Arc<SubmissionCoordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
            connectivity: None,
        }
    }

    /// Also sync whenever this receiver reports a transition to online.
    pub fn on_connectivity(mut self, rx: watch::Receiver<ConnectivitySnapshot>) -> Self {
        self.connectivity = Some(rx);
        self
    }

    pub fn spawn(self) -> SchedulerHandle {
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(shutdown.clone()));
        SchedulerHandle { shutdown, task }
    }

    async fn run(self, shutdown: Arc<Notify>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut connectivity = self.connectivity;
        let mut was_online = connectivity
            .as_mut()
            .map(|rx| rx.borrow_and_update().is_online())
            .unwrap_or(false);

        info!(interval_secs = self.interval.as_secs(), "Sync scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = interval.tick() => {
                    debug!("Interval sync");
                }
                changed = wait_for_change(&mut connectivity) => {
                    if changed.is_err() {
                        // Sender dropped; fall back to the interval alone.
                        connectivity = None;
                        continue;
                    }
                    let online = connectivity
                        .as_mut()
                        .map(|rx| rx.borrow_and_update().is_online())
                        .unwrap_or(false);
                    let flipped = online && !was_online;
                    was_online = online;
                    if !flipped {
                        continue;
                    }
                    info!("Back online, syncing pending reports");
                }
            }

            match self.coordinator.sync_pending().await {
                Ok(SyncOutcome::Completed(report)) if report.attempted > 0 => {
                    debug!(?report, "Scheduled sync pass done");
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Scheduled sync pass failed"),
            }
        }

        info!("Sync scheduler stopped");
    }
}

async fn wait_for_change(
    rx: &mut Option<watch::Receiver<ConnectivitySnapshot>>,
) -> Result<(), watch::error::RecvError> {
    match rx {
        Some(rx) => rx.changed().await,
        None => std::future::pending().await,
    }
}

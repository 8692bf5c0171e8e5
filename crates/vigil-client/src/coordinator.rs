//! Submission coordinator.
//!
//! Drives a finished report to the remote endpoint when the device is
//! online and falls back to the durable queue when it is not, or when the
//! attempt fails. The queue is drained later by [`SubmissionCoordinator::sync_pending`].
//!
//! Media is deleted from the private cache only after the endpoint has
//! accepted the report record that references it.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use vigil_media::{
    adopt_all, AdoptOutcome, CaptureError, CaptureOptions, CaptureOutcome, CaptureSession,
    DeviceError, MediaCaptureService,
};
use vigil_shared::constants::DEFAULT_UPLOAD_CONCURRENCY;
use vigil_shared::{MediaAsset, PendingReport, ReportDraft, ReportId};
use vigil_store::{AdoptRequest, PendingQueue};

use crate::connectivity::ConnectivityMonitor;
use crate::endpoint::{MediaLocation, ReportReceipt, ReportRecord, SubmissionEndpoint};
use crate::error::{AttemptError, SubmitError};
use crate::events::{emit_event, SubmissionEvent, SubmissionState, EVENT_CHANNEL_CAPACITY};

#[derive(Debug)]
pub enum SubmitOutcome {
    Submitted { receipt: ReportReceipt },
    /// Persisted locally; a later sync pass will retry.
    SavedOffline { reason: SavedOfflineReason },
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
}

#[derive(Debug)]
pub enum SavedOfflineReason {
    Offline,
    Failed(AttemptError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub submitted: usize,
    pub failed: usize,
    /// Queue length after the pass.
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Not reachable when the pass started; nothing attempted.
    Offline,
    /// Another pass holds the sync lock.
    AlreadyRunning,
}

pub struct SubmissionCoordinator {
    queue: PendingQueue,
    endpoint: Arc<dyn SubmissionEndpoint>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    capture: Option<MediaCaptureService>,
    upload_concurrency: usize,
    events: broadcast::Sender<SubmissionEvent>,
    sync_lock: Mutex<()>,
}

impl SubmissionCoordinator {
    pub fn new(
        queue: PendingQueue,
        endpoint: Arc<dyn SubmissionEndpoint>,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            queue,
            endpoint,
            connectivity,
            capture: None,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            events,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn with_capture(mut self, capture: MediaCaptureService) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Clamped to at least one upload in flight.
    pub fn with_upload_concurrency(mut self, n: usize) -> Self {
        self.upload_concurrency = n.max(1);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.events.subscribe()
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// Capture one asset for `session` and attach it to the session's slot.
    pub async fn capture_into(
        &self,
        session: &CaptureSession,
        draft: &mut ReportDraft,
        options: &CaptureOptions,
    ) -> CaptureOutcome {
        let Some(capture) = &self.capture else {
            return CaptureOutcome::IoFailure(CaptureError::Device(DeviceError::NoDevice));
        };

        let outcome = capture.capture_for(session, options).await;
        if let CaptureOutcome::Captured(asset) = &outcome {
            draft.attach(&session.target_slot, asset.clone());
        }
        outcome
    }

    /// Adopt picked files into the cache and attach every success to `slot`.
    ///
    /// Failures are returned per file and do not affect the others.
    pub async fn adopt_into(
        &self,
        slot: &str,
        draft: &mut ReportDraft,
        files: Vec<AdoptRequest>,
    ) -> Vec<AdoptOutcome> {
        let mut outcomes = adopt_all(self.queue.cache(), files).await;
        for outcome in &mut outcomes {
            if let Ok(asset) = &mut outcome.result {
                asset.slot = Some(slot.to_string());
                draft.attach(slot, asset.clone());
            }
        }
        outcomes
    }

    /// Submit `report` now if reachable, otherwise queue it.
    ///
    /// Connectivity is sampled once; a connection lost mid-attempt shows up
    /// as an endpoint failure and the report is queued.
    pub async fn submit(&self, report: PendingReport) -> Result<SubmitOutcome, SubmitError> {
        if let Some(outside) = report.media.iter().find(|m| !self.queue.cache().contains(&m.uri)) {
            return Err(SubmitError::MediaOutsideCache {
                report: report.id,
                path: outside.uri.clone(),
            });
        }

        self.emit(report.id, SubmissionState::Draft);
        self.emit(report.id, SubmissionState::CheckingConnectivity);

        let snapshot = self.connectivity.snapshot();
        if !snapshot.is_online() {
            info!(report_id = %report.id, ?snapshot, "Offline, queueing report");
            self.queue.enqueue(&report).await?;
            self.emit(report.id, SubmissionState::Queued);
            return Ok(SubmitOutcome::SavedOffline {
                reason: SavedOfflineReason::Offline,
            });
        }

        self.emit(report.id, SubmissionState::Submitting);
        match self.attempt(&report).await {
            Ok(receipt) => {
                info!(report_id = %report.id, remote_id = %receipt.remote_id, "Report submitted");
                // A resubmitted report may still sit in the queue.
                self.settle(&report).await;
                self.emit(report.id, SubmissionState::Submitted);
                Ok(SubmitOutcome::Submitted { receipt })
            }
            Err(e) => {
                warn!(report_id = %report.id, error = %e, "Submission failed, queueing report");
                self.emit(report.id, SubmissionState::SubmitFailed);
                self.queue.enqueue(&report).await?;
                self.emit(report.id, SubmissionState::Queued);
                Ok(SubmitOutcome::SavedOffline {
                    reason: SavedOfflineReason::Failed(e),
                })
            }
        }
    }

    /// Retry every queued report, oldest first.
    ///
    /// A failed report stays queued and the pass moves on to the next one.
    /// Only one pass runs at a time.
    pub async fn sync_pending(&self) -> Result<SyncOutcome, SubmitError> {
        let Ok(_guard) = self.sync_lock.try_lock() else {
            debug!("Sync pass already running");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        if !self.connectivity.snapshot().is_online() {
            debug!("Offline, skipping sync pass");
            return Ok(SyncOutcome::Offline);
        }

        let pending = self.queue.list().await?;
        let mut report = SyncReport {
            attempted: pending.len(),
            ..SyncReport::default()
        };

        for pending_report in pending {
            let id = pending_report.id;
            self.emit(id, SubmissionState::Syncing);

            match self.attempt(&pending_report).await {
                Ok(receipt) => {
                    info!(report_id = %id, remote_id = %receipt.remote_id, "Queued report submitted");
                    if self.settle(&pending_report).await {
                        self.emit(id, SubmissionState::Submitted);
                        report.submitted += 1;
                    } else {
                        self.emit(id, SubmissionState::Queued);
                        report.failed += 1;
                    }
                }
                Err(e) => {
                    warn!(report_id = %id, error = %e, "Queued report failed, will retry later");
                    self.emit(id, SubmissionState::Queued);
                    report.failed += 1;
                }
            }
        }

        report.remaining = self.queue.len().await?;
        info!(
            attempted = report.attempted,
            submitted = report.submitted,
            failed = report.failed,
            remaining = report.remaining,
            "Sync pass finished"
        );
        Ok(SyncOutcome::Completed(report))
    }

    /// Upload every asset, then create the record. Any failed upload fails
    /// the attempt before a record is created.
    async fn attempt(&self, report: &PendingReport) -> Result<ReportReceipt, AttemptError> {
        let uploads: Vec<BoxFuture<'_, Result<MediaLocation, AttemptError>>> = report
            .media
            .iter()
            .map(|asset| self.upload_one(report.id, asset).boxed())
            .collect();

        let locations: Vec<MediaLocation> = stream::iter(uploads)
            .buffered(self.upload_concurrency)
            .try_collect()
            .await?;

        let record = ReportRecord::new(report, locations);
        Ok(self.endpoint.create_report(&record).await?)
    }

    async fn upload_one(
        &self,
        report: ReportId,
        asset: &MediaAsset,
    ) -> Result<MediaLocation, AttemptError> {
        let bytes = self.queue.cache().read(asset).await?;
        let location = self.endpoint.upload_media(report, asset, bytes).await?;
        Ok(MediaLocation::for_asset(asset, location))
    }

    /// Drop an accepted report from the queue, then delete its media.
    ///
    /// Returns `false` if the queue could not be updated. The entry and its
    /// media are then kept; the next pass resends it under the same
    /// idempotency key.
    async fn settle(&self, report: &PendingReport) -> bool {
        if let Err(e) = self.queue.remove(report.id).await {
            warn!(report_id = %report.id, error = %e, "Accepted report could not be dequeued");
            return false;
        }
        self.delete_media(&report.media).await;
        true
    }

    async fn delete_media(&self, media: &[MediaAsset]) {
        for asset in media {
            if let Err(e) = self.queue.cache().remove(asset).await {
                warn!(name = %asset.name, error = %e, "Failed to delete submitted media");
            }
        }
    }

    fn emit(&self, report_id: ReportId, state: SubmissionState) {
        emit_event(&self.events, report_id, state);
    }
}

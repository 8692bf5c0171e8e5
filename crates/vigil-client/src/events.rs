use serde::Serialize;
use tokio::sync::broadcast;

use vigil_shared::ReportId;

pub const EVENT_SUBMISSION_STATE: &str = "submission-state";

/// Capacity of the lifecycle event channel. Slow subscribers lag rather
/// than block submission.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionState {
    Draft,
    CheckingConnectivity,
    Submitting,
    Submitted,
    SubmitFailed,
    Queued,
    Syncing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    pub report_id: ReportId,
    pub state: SubmissionState,
}

pub fn emit_event(tx: &broadcast::Sender<SubmissionEvent>, report_id: ReportId, state: SubmissionState) {
    tracing::debug!(event = EVENT_SUBMISSION_STATE, report_id = %report_id, ?state);
    // No subscribers is fine.
    let _ = tx.send(SubmissionEvent { report_id, state });
}

use std::path::PathBuf;

use thiserror::Error;

use vigil_shared::ReportId;
use vigil_store::{CacheError, QueueError};

use crate::endpoint::EndpointError;

/// Errors the submission coordinator surfaces to its caller.
///
/// Endpoint failures are not in here: they are recovered by queueing the
/// report and reported through [`crate::SavedOfflineReason`].
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Report {report} references media outside the private cache: {path}")]
    MediaOutsideCache { report: ReportId, path: PathBuf },

    #[error("Pending queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Why one submission attempt did not complete.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("Endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Could not read media for upload: {0}")]
    Media(#[from] CacheError),
}

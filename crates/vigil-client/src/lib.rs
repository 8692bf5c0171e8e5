//! # vigil-client
//!
//! Submission pipeline for incident reports: the coordinator that decides
//! between submitting now and queueing for later, the remote endpoint
//! contract and its HTTP adapter, connectivity sources and the background
//! sync scheduler.

pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod http_endpoint;
pub mod scheduler;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use connectivity::{ConnectivityMonitor, SharedConnectivity, StaticConnectivity};
pub use coordinator::{SavedOfflineReason, SubmissionCoordinator, SubmitOutcome, SyncOutcome, SyncReport};
pub use endpoint::{EndpointError, MediaLocation, ReportReceipt, ReportRecord, SubmissionEndpoint};
pub use error::{AttemptError, SubmitError};
pub use events::{SubmissionEvent, SubmissionState};
pub use http_endpoint::HttpEndpoint;
pub use scheduler::{SchedulerHandle, SyncScheduler};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("vigil_client=debug,vigil_store=info,vigil_media=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

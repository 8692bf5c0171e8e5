/// Application name
pub const APP_NAME: &str = "Vigil";

/// Storage key of the pending report queue.
///
/// Must never change between releases: every queued report lives under it.
pub const PENDING_REPORTS_KEY: &str = "vigil.pending_reports.v1";

/// Sub-directory of the platform cache dir that holds captured media
pub const MEDIA_CACHE_DIR: &str = "media";

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "vigil.db";

/// Default number of concurrent media uploads per report
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// Default interval between background sync passes, in seconds
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Default HTTP request timeout, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default interval between health checks, in seconds
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

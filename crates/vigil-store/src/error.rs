use std::path::PathBuf;

use thiserror::Error;

use vigil_shared::ReportId;

/// Errors produced by the database and key/value layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors produced by the private media cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Could not determine application cache directory")]
    NoCacheDir,

    #[error("Failed to prepare cache directory '{path}': {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to copy '{from}' into the media cache: {source}")]
    Copy {
        from: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to stat cached file '{path}': {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read cached file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to delete cached file '{path}': {source}")]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Path is outside the media cache: {0}")]
    OutsideCache(PathBuf),
}

/// Errors produced by the pending report queue.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to encode pending reports: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Report {report} references media outside the private cache: {path}")]
    MediaOutsideCache { report: ReportId, path: PathBuf },
}

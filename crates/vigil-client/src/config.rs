//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the sync agent can start with no
//! configuration at all. Invalid values are logged and ignored.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vigil_shared::constants::{
    DEFAULT_HEALTH_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SYNC_INTERVAL_SECS,
    DEFAULT_UPLOAD_CONCURRENCY,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the submission endpoint.
    /// Env: `VIGIL_ENDPOINT_URL`
    /// Default: `http://127.0.0.1:8080/api`
    pub endpoint_url: String,

    /// Directory holding `vigil.db`.
    /// Env: `VIGIL_DATA_DIR`
    /// Default: platform data dir.
    pub data_dir: Option<PathBuf>,

    /// Private media cache root.
    /// Env: `VIGIL_CACHE_DIR`
    /// Default: platform cache dir + `/media`.
    pub cache_dir: Option<PathBuf>,

    /// Concurrent media uploads per report, at least 1.
    /// Env: `VIGIL_UPLOAD_CONCURRENCY`
    pub upload_concurrency: usize,

    /// Env: `VIGIL_SYNC_INTERVAL_SECS`
    pub sync_interval: Duration,

    /// Per-request timeout of the HTTP adapter.
    /// Env: `VIGIL_REQUEST_TIMEOUT_SECS`
    pub request_timeout: Duration,

    /// Env: `VIGIL_HEALTH_INTERVAL_SECS`
    pub health_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://127.0.0.1:8080/api".to_string(),
            data_dir: None,
            cache_dir: None,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            health_interval: Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("VIGIL_ENDPOINT_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.endpoint_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid VIGIL_ENDPOINT_URL, using default");
            }
        }

        if let Some(dir) = lookup("VIGIL_DATA_DIR").filter(|d| !d.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(dir) = lookup("VIGIL_CACHE_DIR").filter(|d| !d.is_empty()) {
            config.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(n) = parse_var::<usize>(&lookup, "VIGIL_UPLOAD_CONCURRENCY") {
            if n > 0 {
                config.upload_concurrency = n;
            } else {
                tracing::warn!("VIGIL_UPLOAD_CONCURRENCY must be at least 1, using default");
            }
        }

        if let Some(secs) = parse_secs(&lookup, "VIGIL_SYNC_INTERVAL_SECS") {
            config.sync_interval = secs;
        }

        if let Some(secs) = parse_secs(&lookup, "VIGIL_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = secs;
        }

        if let Some(secs) = parse_secs(&lookup, "VIGIL_HEALTH_INTERVAL_SECS") {
            config.health_interval = secs;
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

/// Whole seconds, rejecting zero.
fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    match parse_var::<u64>(lookup, key)? {
        0 => {
            tracing::warn!(key, "Interval must be non-zero, using default");
            None
        }
        secs => Some(Duration::from_secs(secs)),
    }
}

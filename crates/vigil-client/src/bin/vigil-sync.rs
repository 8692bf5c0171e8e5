//! # vigil-sync
//!
//! Headless agent that drains the pending report queue.
//!
//! - polls `GET {endpoint}/health` to keep a connectivity snapshot current
//! - runs a sync pass on an interval and whenever the endpoint comes back
//! - exits cleanly on Ctrl+C

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use vigil_client::{
    init_tracing, ClientConfig, HttpEndpoint, SharedConnectivity, SubmissionCoordinator,
    SyncScheduler,
};
use vigil_shared::constants::APP_NAME;
use vigil_shared::ConnectivitySnapshot;
use vigil_store::{Database, MediaCache, PendingQueue, SqliteKvStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Tracing and configuration
    // -----------------------------------------------------------------------
    init_tracing();
    info!("Starting {} sync agent v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 2. Local storage
    // -----------------------------------------------------------------------
    let db = match &config.data_dir {
        Some(dir) => Database::open_in(dir),
        None => Database::new(),
    }
    .context("Failed to open database")?;

    let cache_root = match &config.cache_dir {
        Some(dir) => dir.clone(),
        None => MediaCache::default_root().context("No cache directory")?,
    };
    let cache = MediaCache::new(cache_root)
        .await
        .context("Failed to open media cache")?;

    let queue = PendingQueue::new(Arc::new(SqliteKvStore::new(db)), cache);
    info!(pending = queue.len().await?, "Pending queue loaded");

    // -----------------------------------------------------------------------
    // 3. Endpoint, connectivity and coordinator
    // -----------------------------------------------------------------------
    let endpoint = Arc::new(
        HttpEndpoint::new(&config.endpoint_url, config.request_timeout)
            .context("Failed to create HTTP endpoint")?,
    );
    let connectivity = SharedConnectivity::new(ConnectivitySnapshot::OFFLINE);

    let coordinator = Arc::new(
        SubmissionCoordinator::new(queue, endpoint.clone(), Arc::new(connectivity.clone()))
            .with_upload_concurrency(config.upload_concurrency),
    );

    // -----------------------------------------------------------------------
    // 4. Background tasks
    // -----------------------------------------------------------------------

    // Reachability
    let health_endpoint = endpoint.clone();
    let health_connectivity = connectivity.clone();
    let health_interval = config.health_interval;
    let health = tokio::spawn(async move {
        let mut interval = tokio::time::interval(health_interval);
        loop {
            interval.tick().await;
            let reachable = health_endpoint.check_health().await;
            health_connectivity.set(ConnectivitySnapshot {
                connected: true,
                internet_reachable: reachable,
            });
        }
    });

    let scheduler = SyncScheduler::new(coordinator, config.sync_interval)
        .on_connectivity(connectivity.subscribe())
        .spawn();

    info!(endpoint = %endpoint.base_url(), "Sync agent running");

    // -----------------------------------------------------------------------
    // 5. Wait for shutdown
    // -----------------------------------------------------------------------
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down");

    health.abort();
    scheduler.shutdown().await;

    Ok(())
}

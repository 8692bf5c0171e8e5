//! Bulk adoption of picked files.
//!
//! Every request runs through [`MediaCache::adopt`] concurrently and every
//! outcome is kept: one unreadable file does not abort the rest.

use std::path::PathBuf;

use futures::future::join_all;
use tracing::{debug, warn};

use vigil_shared::MediaAsset;
use vigil_store::{AdoptRequest, CacheError, MediaCache};

#[derive(Debug)]
pub struct AdoptOutcome {
    pub source: PathBuf,
    pub result: Result<MediaAsset, CacheError>,
}

impl AdoptOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Adopt every request, returning one outcome per request in input order.
pub async fn adopt_all(cache: &MediaCache, requests: Vec<AdoptRequest>) -> Vec<AdoptOutcome> {
    let total = requests.len();
    let outcomes = join_all(requests.into_iter().map(|request| async move {
        let source = request.path.clone();
        let result = cache.adopt(request).await;
        if let Err(e) = &result {
            warn!(path = %source.display(), error = %e, "Failed to adopt media");
        }
        AdoptOutcome { source, result }
    }))
    .await;

    let adopted = outcomes.iter().filter(|o| o.is_ok()).count();
    debug!(total, adopted, "Batch adoption finished");
    outcomes
}

/// Split outcomes into adopted assets and per-file failures.
pub fn partition(outcomes: Vec<AdoptOutcome>) -> (Vec<MediaAsset>, Vec<(PathBuf, CacheError)>) {
    let mut assets = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(asset) => assets.push(asset),
            Err(e) => failures.push((outcome.source, e)),
        }
    }
    (assets, failures)
}

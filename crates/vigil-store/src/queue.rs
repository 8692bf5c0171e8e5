//! Durable queue of reports awaiting submission.
//!
//! The whole queue is one JSON array stored under [`PENDING_REPORTS_KEY`].
//! Every mutation reads the array, changes it and writes it back in full.
//! This is not atomic: two mutations that interleave between their read and
//! their write lose one of the updates (last writer wins).

use std::sync::Arc;

use tracing::{debug, info, warn};

use vigil_shared::constants::PENDING_REPORTS_KEY;
use vigil_shared::{PendingReport, ReportId};

use crate::error::QueueError;
use crate::kv::KeyValueStore;
use crate::media_cache::MediaCache;

#[derive(Clone)]
pub struct PendingQueue {
    kv: Arc<dyn KeyValueStore>,
    cache: MediaCache,
}

impl PendingQueue {
    pub fn new(kv: Arc<dyn KeyValueStore>, cache: MediaCache) -> Self {
        Self { kv, cache }
    }

    /// Append `report` to the end of the queue.
    ///
    /// Returns `false` without writing if a report with the same id is
    /// already queued.
    pub async fn enqueue(&self, report: &PendingReport) -> Result<bool, QueueError> {
        if let Some(outside) = report.media.iter().find(|m| !self.cache.contains(&m.uri)) {
            return Err(QueueError::MediaOutsideCache {
                report: report.id,
                path: outside.uri.clone(),
            });
        }

        let mut reports = self.list().await?;
        if reports.iter().any(|r| r.id == report.id) {
            debug!(report_id = %report.id, "Report already queued");
            return Ok(false);
        }

        reports.push(report.clone());
        self.write(&reports).await?;

        info!(
            report_id = %report.id,
            media = report.media.len(),
            media_bytes = report.media_bytes(),
            queued = reports.len(),
            "Report queued for later submission"
        );
        Ok(true)
    }

    /// All queued reports, oldest first.
    ///
    /// A missing value is an empty queue; so is a value that no longer
    /// decodes, which is logged rather than returned as an error.
    pub async fn list(&self) -> Result<Vec<PendingReport>, QueueError> {
        let Some(raw) = self.kv.get(PENDING_REPORTS_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<PendingReport>>(&raw) {
            Ok(reports) => Ok(reports),
            Err(e) => {
                warn!(
                    error = %e,
                    bytes = raw.len(),
                    "Pending queue value is corrupt; treating queue as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Remove the report with `id`. Removing an absent id is a no-op that
    /// returns `false` and does not write.
    pub async fn remove(&self, id: ReportId) -> Result<bool, QueueError> {
        let mut reports = self.list().await?;
        let before = reports.len();
        reports.retain(|r| r.id != id);

        if reports.len() == before {
            return Ok(false);
        }

        self.write(&reports).await?;
        debug!(report_id = %id, remaining = reports.len(), "Removed report from queue");
        Ok(true)
    }

    pub async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.list().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    async fn write(&self, reports: &[PendingReport]) -> Result<(), QueueError> {
        let json = serde_json::to_string(reports)?;
        self.kv.set(PENDING_REPORTS_KEY, &json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::error::Result as StoreResult;
    use crate::kv::{MemoryKvStore, SqliteKvStore};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio::sync::Barrier;
    use vigil_shared::{MediaAsset, MediaKind, OriginSource, ReportDraft};

    async fn test_queue() -> (PendingQueue, MemoryKvStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = MediaCache::new(dir.path().join("media")).await.unwrap();
        let kv = MemoryKvStore::new();
        (PendingQueue::new(Arc::new(kv.clone()), cache), kv, dir)
    }

    fn cached_asset(cache: &MediaCache, name: &str) -> MediaAsset {
        MediaAsset {
            uri: cache.root().join(name),
            mime_type: "image/jpeg".into(),
            name: name.into(),
            size_bytes: 3,
            captured_at: chrono::Utc::now(),
            kind: MediaKind::Photo,
            slot: Some("scene".into()),
        }
    }

    fn report(queue: &PendingQueue, title: &str) -> PendingReport {
        let mut draft = ReportDraft::new(OriginSource::Manual);
        draft.set_field("title", title).unwrap();
        draft.set_field("severity", 2i64).unwrap();
        draft.set_field("lat", 51.5f64).unwrap();
        draft.set_field("witnessed", true).unwrap();
        draft.attach("scene", cached_asset(queue.cache(), &format!("photo_{title}.jpg")));
        draft.finish()
    }

    #[tokio::test]
    async fn test_enqueue_then_list_returns_equal_report() {
        let (queue, _kv, _dir) = test_queue().await;
        let r = report(&queue, "spill");

        assert!(queue.enqueue(&r).await.unwrap());

        let listed = queue.list().await.unwrap();
        assert_eq!(listed, vec![r]);
    }

    #[tokio::test]
    async fn test_insertion_order_and_single_writer_growth() {
        let (queue, _kv, _dir) = test_queue().await;

        let mut ids = Vec::new();
        for title in ["a", "b", "c", "d"] {
            let before = queue.len().await.unwrap();
            let r = report(&queue, title);
            ids.push(r.id);
            queue.enqueue(&r).await.unwrap();
            assert_eq!(queue.len().await.unwrap(), before + 1);
        }

        let listed: Vec<ReportId> = queue.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_not_queued_twice() {
        let (queue, _kv, _dir) = test_queue().await;
        let r = report(&queue, "dup");

        assert!(queue.enqueue(&r).await.unwrap());
        assert!(!queue.enqueue(&r).await.unwrap());
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_twice_is_noop() {
        let (queue, _kv, _dir) = test_queue().await;
        let keep = report(&queue, "keep");
        let drop_me = report(&queue, "drop");
        queue.enqueue(&keep).await.unwrap();
        queue.enqueue(&drop_me).await.unwrap();

        assert!(queue.remove(drop_me.id).await.unwrap());
        assert!(!queue.remove(drop_me.id).await.unwrap());
        assert_eq!(queue.list().await.unwrap(), vec![keep]);
    }

    #[tokio::test]
    async fn test_media_outside_cache_is_rejected() {
        let (queue, _kv, _dir) = test_queue().await;
        let mut r = report(&queue, "leak");
        r.media[0].uri = PathBuf::from("/sdcard/DCIM/Camera/IMG_0001.jpg");

        let err = queue.enqueue(&r).await.unwrap_err();
        assert!(matches!(err, QueueError::MediaOutsideCache { .. }));
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_value_fails_closed_and_is_replaced() {
        let (queue, kv, _dir) = test_queue().await;
        kv.set(PENDING_REPORTS_KEY, "{not json").await.unwrap();

        assert!(queue.list().await.unwrap().is_empty());
        assert!(!queue.remove(ReportId::new()).await.unwrap());

        let r = report(&queue, "after-corruption");
        queue.enqueue(&r).await.unwrap();
        assert_eq!(queue.list().await.unwrap(), vec![r]);
    }

    #[tokio::test]
    async fn test_wrong_shape_fails_closed() {
        let (queue, kv, _dir) = test_queue().await;
        kv.set(PENDING_REPORTS_KEY, r#"{"reports": []}"#).await.unwrap();
        assert!(queue.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_survives_reopen_with_sqlite() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("vigil.db");
        let cache = MediaCache::new(dir.path().join("media")).await.unwrap();

        let r = {
            let kv = SqliteKvStore::new(Database::open_at(&db_path).unwrap());
            let queue = PendingQueue::new(Arc::new(kv), cache.clone());
            let r = report(&queue, "restart");
            queue.enqueue(&r).await.unwrap();
            r
        };

        let kv = SqliteKvStore::new(Database::open_at(&db_path).unwrap());
        let queue = PendingQueue::new(Arc::new(kv), cache);
        assert_eq!(queue.list().await.unwrap(), vec![r]);
    }

    /// Store whose reads wait until every participant has read, forcing two
    /// read-modify-write cycles to interleave.
    struct InterleavingKv {
        inner: MemoryKvStore,
        barrier: Barrier,
    }

    #[async_trait]
    impl KeyValueStore for InterleavingKv {
        async fn get(&self, key: &str) -> StoreResult<Option<String>> {
            let value = self.inner.get(key).await?;
            self.barrier.wait().await;
            Ok(value)
        }

        async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> StoreResult<()> {
            self.inner.delete(key).await
        }
    }

    // Known limitation: the queue is read-modify-write without a lock, so
    // concurrent writers lose updates. This test pins that behavior down.
    #[tokio::test]
    async fn test_concurrent_enqueues_can_lose_an_update() {
        let dir = TempDir::new().unwrap();
        let cache = MediaCache::new(dir.path().join("media")).await.unwrap();
        let inner = MemoryKvStore::new();
        let kv = Arc::new(InterleavingKv {
            inner: inner.clone(),
            barrier: Barrier::new(2),
        });
        let queue = PendingQueue::new(kv, cache.clone());

        let first = report(&queue, "first");
        let second = report(&queue, "second");

        let (a, b) = tokio::join!(queue.enqueue(&first), queue.enqueue(&second));
        assert!(a.unwrap());
        assert!(b.unwrap());

        let reader = PendingQueue::new(Arc::new(inner), cache);
        let listed = reader.list().await.unwrap();
        assert_eq!(listed.len(), 1, "last writer wins; one enqueue is lost");
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_and_remove_lose_an_update() {
        let dir = TempDir::new().unwrap();
        let cache = MediaCache::new(dir.path().join("media")).await.unwrap();
        let inner = MemoryKvStore::new();

        let seed = PendingQueue::new(Arc::new(inner.clone()), cache.clone());
        let old = report(&seed, "old");
        seed.enqueue(&old).await.unwrap();

        let kv = Arc::new(InterleavingKv {
            inner: inner.clone(),
            barrier: Barrier::new(2),
        });
        let queue = PendingQueue::new(kv, cache.clone());
        let new = report(&queue, "new");

        let (removed, added) = tokio::join!(queue.remove(old.id), queue.enqueue(&new));
        assert!(removed.unwrap());
        assert!(added.unwrap());

        // Serially this would leave exactly [new]. Interleaved, whichever
        // write lands last wins: either `old` comes back or `new` vanishes.
        let listed: Vec<ReportId> = seed.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_ne!(listed, vec![new.id]);
    }
}

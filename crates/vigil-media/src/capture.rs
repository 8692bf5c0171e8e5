use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use vigil_shared::{MediaAsset, MediaKind};
use vigil_store::{CacheError, MediaCache};

use crate::session::CaptureSession;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No capture device available")]
    NoDevice,

    #[error("Capture UI failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Camera,
    Microphone,
}

impl Permission {
    /// Permissions the device UI needs for `kind`.
    pub fn required_for(kind: MediaKind) -> &'static [Permission] {
        match kind {
            MediaKind::Photo => &[Permission::Camera],
            MediaKind::Video => &[Permission::Camera, Permission::Microphone],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Options forwarded to the device capture UI.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// JPEG quality, 0.0 - 1.0
    pub quality: f32,
    /// Upper bound for video recordings
    pub max_duration: Option<Duration>,
    pub front_camera: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 0.8,
            max_duration: Some(Duration::from_secs(120)),
            front_camera: false,
        }
    }
}

/// A file the device UI produced, outside our control.
#[derive(Debug, Clone)]
pub struct TransientMedia {
    pub uri: PathBuf,
    pub width: u32,
    pub height: u32,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub enum DeviceCapture {
    Captured(TransientMedia),
    Cancelled,
}

/// Platform camera integration.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn request_permission(&self, permission: Permission) -> PermissionStatus;

    async fn launch(
        &self,
        kind: MediaKind,
        options: &CaptureOptions,
    ) -> Result<DeviceCapture, DeviceError>;
}

/// Result of one capture attempt. Only `IoFailure` is an error condition.
#[derive(Debug)]
pub enum CaptureOutcome {
    Captured(MediaAsset),
    Cancelled,
    PermissionDenied { missing: Vec<Permission> },
    IoFailure(CaptureError),
}

impl CaptureOutcome {
    pub fn asset(&self) -> Option<&MediaAsset> {
        match self {
            Self::Captured(asset) => Some(asset),
            _ => None,
        }
    }

    pub fn into_asset(self) -> Option<MediaAsset> {
        match self {
            Self::Captured(asset) => Some(asset),
            _ => None,
        }
    }
}

/// Captures photos and videos straight into the private media cache.
#[derive(Clone)]
pub struct MediaCaptureService {
    device: Arc<dyn CaptureDevice>,
    cache: MediaCache,
}

impl MediaCaptureService {
    pub fn new(device: Arc<dyn CaptureDevice>, cache: MediaCache) -> Self {
        Self { device, cache }
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    /// Capture one asset of `kind`.
    ///
    /// Permissions are checked first and a denial never opens the device UI.
    /// The device's file is moved into the cache and the original deleted on
    /// a best-effort basis.
    pub async fn capture(&self, kind: MediaKind, options: &CaptureOptions) -> CaptureOutcome {
        let mut missing = Vec::new();
        for &permission in Permission::required_for(kind) {
            if self.device.request_permission(permission).await == PermissionStatus::Denied {
                missing.push(permission);
            }
        }
        if !missing.is_empty() {
            warn!(kind = %kind, ?missing, "Capture aborted: permission denied");
            return CaptureOutcome::PermissionDenied { missing };
        }

        let transient = match self.device.launch(kind, options).await {
            Ok(DeviceCapture::Captured(transient)) => transient,
            Ok(DeviceCapture::Cancelled) => {
                debug!(kind = %kind, "Capture cancelled by user");
                return CaptureOutcome::Cancelled;
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Capture UI failed");
                return CaptureOutcome::IoFailure(e.into());
            }
        };

        debug!(
            kind = %kind,
            width = transient.width,
            height = transient.height,
            "Device returned transient media"
        );

        match self
            .cache
            .relocate(&transient.uri, kind, transient.mime_type.as_deref())
            .await
        {
            Ok(asset) => {
                info!(name = %asset.name, size = asset.size_bytes, "Media captured");
                CaptureOutcome::Captured(asset)
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Failed to move capture into cache");
                CaptureOutcome::IoFailure(e.into())
            }
        }
    }

    /// Capture for a specific form slot; the asset comes back tagged with it.
    pub async fn capture_for(
        &self,
        session: &CaptureSession,
        options: &CaptureOptions,
    ) -> CaptureOutcome {
        match self.capture(session.kind, options).await {
            CaptureOutcome::Captured(asset) => {
                CaptureOutcome::Captured(asset.with_slot(session.target_slot.clone()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scriptable device that writes its "captures" into a gallery directory.
    struct FakeDevice {
        pub gallery: PathBuf,
        pub denied: HashSet<Permission>,
        pub cancel: bool,
        pub point_at_missing_file: bool,
        pub broken: bool,
        pub launches: AtomicUsize,
        pub requested: Mutex<Vec<Permission>>,
    }

    impl FakeDevice {
        fn new(gallery: PathBuf) -> Self {
            Self {
                gallery,
                denied: HashSet::new(),
                cancel: false,
                point_at_missing_file: false,
                broken: false,
                launches: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CaptureDevice for FakeDevice {
        async fn request_permission(&self, permission: Permission) -> PermissionStatus {
            self.requested.lock().unwrap().push(permission);
            if self.denied.contains(&permission) {
                PermissionStatus::Denied
            } else {
                PermissionStatus::Granted
            }
        }

        async fn launch(
            &self,
            kind: MediaKind,
            _options: &CaptureOptions,
        ) -> Result<DeviceCapture, DeviceError> {
            let n = self.launches.fetch_add(1, Ordering::SeqCst);
            if self.cancel {
                return Ok(DeviceCapture::Cancelled);
            }
            if self.broken {
                return Err(DeviceError::Failed("camera HAL disconnected".into()));
            }
            let (name, mime) = match kind {
                MediaKind::Photo => (format!("IMG_{n:04}.JPG"), "image/jpeg"),
                MediaKind::Video => (format!("VID_{n:04}.mp4"), "video/mp4"),
            };
            let uri = self.gallery.join(name);
            if !self.point_at_missing_file {
                tokio::fs::write(&uri, b"captured-bytes").await.unwrap();
            }
            Ok(DeviceCapture::Captured(TransientMedia {
                uri,
                width: 4032,
                height: 3024,
                mime_type: Some(mime.to_string()),
            }))
        }
    }

    async fn setup(device: FakeDevice) -> (MediaCaptureService, Arc<FakeDevice>, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = MediaCache::new(dir.path().join("cache")).await.unwrap();
        let device = Arc::new(device);
        (MediaCaptureService::new(device.clone(), cache), device, dir)
    }

    fn gallery() -> TempDir {
        TempDir::new().unwrap()
    }

    #[tokio::test]
    async fn test_photo_lands_in_cache_and_original_is_deleted() {
        let g = gallery();
        let (service, device, _dir) = setup(FakeDevice::new(g.path().to_path_buf())).await;

        let outcome = service.capture(MediaKind::Photo, &CaptureOptions::default()).await;
        let asset = outcome.into_asset().expect("captured");

        assert!(asset.uri.starts_with(service.cache().root()));
        assert!(asset.name.starts_with("photo_") && asset.name.ends_with(".jpg"));
        assert_eq!(asset.size_bytes, 14);
        assert!(!g.path().join("IMG_0000.JPG").exists());
        assert_eq!(*device.requested.lock().unwrap(), vec![Permission::Camera]);
    }

    #[tokio::test]
    async fn test_video_requires_microphone() {
        let g = gallery();
        let mut fake = FakeDevice::new(g.path().to_path_buf());
        fake.denied.insert(Permission::Microphone);
        let (service, device, _dir) = setup(fake).await;

        // Photos only need the camera.
        assert!(service
            .capture(MediaKind::Photo, &CaptureOptions::default())
            .await
            .asset()
            .is_some());

        let outcome = service.capture(MediaKind::Video, &CaptureOptions::default()).await;
        match outcome {
            CaptureOutcome::PermissionDenied { missing } => {
                assert_eq!(missing, vec![Permission::Microphone])
            }
            other => panic!("expected PermissionDenied, got {other:?}"),
        }
        assert_eq!(device.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_camera_never_launches_ui() {
        let g = gallery();
        let mut fake = FakeDevice::new(g.path().to_path_buf());
        fake.denied.insert(Permission::Camera);
        let (service, device, _dir) = setup(fake).await;

        let outcome = service.capture(MediaKind::Photo, &CaptureOptions::default()).await;
        assert!(matches!(outcome, CaptureOutcome::PermissionDenied { .. }));
        assert_eq!(device.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_is_not_an_error() {
        let g = gallery();
        let mut fake = FakeDevice::new(g.path().to_path_buf());
        fake.cancel = true;
        let (service, _device, _dir) = setup(fake).await;

        let outcome = service.capture(MediaKind::Video, &CaptureOptions::default()).await;
        assert!(matches!(outcome, CaptureOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_copy_failure_reports_io_failure() {
        let g = gallery();
        let mut fake = FakeDevice::new(g.path().to_path_buf());
        fake.point_at_missing_file = true;
        let (service, _device, _dir) = setup(fake).await;

        let outcome = service.capture(MediaKind::Photo, &CaptureOptions::default()).await;
        assert!(matches!(
            outcome,
            CaptureOutcome::IoFailure(CaptureError::Cache(CacheError::Copy { .. }))
        ));
    }

    #[tokio::test]
    async fn test_failed_relocation_still_deletes_gallery_copy() {
        let g = gallery();
        let (service, _device, _dir) = setup(FakeDevice::new(g.path().to_path_buf())).await;
        tokio::fs::remove_dir_all(service.cache().root()).await.unwrap();

        let outcome = service.capture(MediaKind::Photo, &CaptureOptions::default()).await;
        assert!(matches!(
            outcome,
            CaptureOutcome::IoFailure(CaptureError::Cache(CacheError::Prepare { .. }))
        ));
        assert!(!g.path().join("IMG_0000.JPG").exists());
    }

    #[tokio::test]
    async fn test_device_failure_is_io_failure() {
        let g = gallery();
        let mut fake = FakeDevice::new(g.path().to_path_buf());
        fake.broken = true;
        let (service, _device, _dir) = setup(fake).await;

        let outcome = service.capture(MediaKind::Video, &CaptureOptions::default()).await;
        assert!(matches!(
            outcome,
            CaptureOutcome::IoFailure(CaptureError::Device(DeviceError::Failed(_)))
        ));
    }

    #[tokio::test]
    async fn test_capture_for_tags_slot() {
        let g = gallery();
        let (service, _device, _dir) = setup(FakeDevice::new(g.path().to_path_buf())).await;
        let session = CaptureSession::new("injury_photos", MediaKind::Photo);

        let asset = service
            .capture_for(&session, &CaptureOptions::default())
            .await
            .into_asset()
            .unwrap();
        assert_eq!(asset.slot.as_deref(), Some("injury_photos"));
    }
}

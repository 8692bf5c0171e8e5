//! Private media cache.
//!
//! Captured and picked media are copied into an app-exclusive directory the
//! device gallery never indexes, and the gallery-visible original is removed.
//! Every [`MediaAsset`] handed out by this module points inside the cache root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use directories::ProjectDirs;
use tokio::fs;
use tracing::{debug, info, warn};

use vigil_shared::constants::MEDIA_CACHE_DIR;
use vigil_shared::{MediaAsset, MediaKind};

use crate::error::CacheError;

/// A file picked outside the live capture flow.
#[derive(Debug, Clone)]
pub struct AdoptRequest {
    pub path: PathBuf,
    /// Mime type reported by the picker, if any.
    pub mime_type: Option<String>,
    /// Overrides the kind inferred from the mime type or extension.
    pub kind: Option<MediaKind>,
}

impl AdoptRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime_type: None,
            kind: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaCache {
    root: PathBuf,
}

impl MediaCache {
    /// Open the cache at `root`, creating it if missing.
    pub async fn new(root: PathBuf) -> Result<Self, CacheError> {
        fs::create_dir_all(&root)
            .await
            .map_err(|source| CacheError::Prepare {
                path: root.clone(),
                source,
            })?;

        let root = fs::canonicalize(&root)
            .await
            .map_err(|source| CacheError::Prepare {
                path: root.clone(),
                source,
            })?;

        info!(path = %root.display(), "Media cache initialized");

        Ok(Self { root })
    }

    /// Platform cache directory (`~/.cache/vigil/media` on Linux).
    pub fn default_root() -> Result<PathBuf, CacheError> {
        let project_dirs =
            ProjectDirs::from("org", "vigil", "vigil").ok_or(CacheError::NoCacheDir)?;
        Ok(project_dirs.cache_dir().join(MEDIA_CACHE_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` lies inside the cache root.
    ///
    /// Resolves symlinks with a blocking `stat`; the async paths below use
    /// [`ensure_within`] instead.
    pub fn contains(&self, path: &Path) -> bool {
        reject_traversal(path).is_ok()
            && within(&self.root, path, std::fs::canonicalize(path).ok()).is_ok()
    }

    /// Bring a picked file under the cache.
    ///
    /// A file that is already cached is returned as-is so adopting the same
    /// asset twice yields the same identity.
    pub async fn adopt(&self, request: AdoptRequest) -> Result<MediaAsset, CacheError> {
        let mime_type = request
            .mime_type
            .clone()
            .or_else(|| {
                extension_of(&request.path)
                    .as_deref()
                    .and_then(mime_for_extension)
                    .map(String::from)
            });
        let kind = request.kind.unwrap_or_else(|| {
            mime_type
                .as_deref()
                .map(MediaKind::from_mime_type)
                .unwrap_or(MediaKind::Photo)
        });

        if let Ok(resolved) = ensure_within(&self.root, &request.path).await {
            let metadata = fs::metadata(&resolved)
                .await
                .map_err(|source| CacheError::Stat {
                    path: resolved.clone(),
                    source,
                })?;
            let name = resolved
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let captured_at = metadata
                .modified()
                .map(chrono::DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            debug!(path = %resolved.display(), "Adopting already-cached file");

            return Ok(MediaAsset {
                uri: resolved,
                mime_type: mime_type.unwrap_or_else(|| kind.default_mime_type().to_string()),
                name,
                size_bytes: metadata.len(),
                captured_at,
                kind,
                slot: None,
            });
        }

        self.relocate(&request.path, kind, mime_type.as_deref()).await
    }

    /// Copy `source` into the cache under `<kind>_<epoch-millis>.<ext>`,
    /// then delete `source`.
    ///
    /// Failing to delete the original is logged and ignored: it may live in
    /// OS-managed storage the app cannot touch. A failed copy still attempts
    /// the delete before returning the error.
    pub async fn relocate(
        &self,
        source: &Path,
        kind: MediaKind,
        mime_type: Option<&str>,
    ) -> Result<MediaAsset, CacheError> {
        let ext = extension_of(source)
            .or_else(|| mime_type.and_then(extension_for_mime))
            .unwrap_or_else(|| kind.default_extension().to_string());
        let mime_type = mime_type
            .map(String::from)
            .or_else(|| mime_for_extension(&ext).map(String::from))
            .unwrap_or_else(|| kind.default_mime_type().to_string());

        let dest = match self.reserve_name(kind, &ext).await {
            Ok(dest) => dest,
            Err(e) => {
                discard_original(source).await;
                return Err(e);
            }
        };

        if let Err(source_err) = fs::copy(source, &dest).await {
            let _ = fs::remove_file(&dest).await;
            discard_original(source).await;
            return Err(CacheError::Copy {
                from: source.to_path_buf(),
                source: source_err,
            });
        }

        let size_bytes = match fs::metadata(&dest).await {
            Ok(metadata) => metadata.len(),
            Err(source_err) => {
                let _ = fs::remove_file(&dest).await;
                return Err(CacheError::Stat {
                    path: dest,
                    source: source_err,
                });
            }
        };

        discard_original(source).await;

        let name = dest
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        info!(
            name = %name,
            kind = %kind,
            size = size_bytes,
            "Relocated media into private cache"
        );

        Ok(MediaAsset {
            uri: dest,
            mime_type,
            name,
            size_bytes,
            captured_at: Utc::now(),
            kind,
            slot: None,
        })
    }

    pub async fn read(&self, asset: &MediaAsset) -> Result<Vec<u8>, CacheError> {
        let path = ensure_within(&self.root, &asset.uri).await?;
        fs::read(&path)
            .await
            .map_err(|source| CacheError::Read { path, source })
    }

    /// Delete a cached asset. Returns `false` if it was already gone.
    pub async fn remove(&self, asset: &MediaAsset) -> Result<bool, CacheError> {
        let path = ensure_within(&self.root, &asset.uri).await?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted cached media");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Delete { path, source }),
        }
    }

    /// Create an empty placeholder under a fresh `<kind>_<millis>.<ext>` name.
    ///
    /// `create_new` makes the reservation atomic; on a collision the
    /// timestamp is bumped so the name format is preserved.
    async fn reserve_name(&self, kind: MediaKind, ext: &str) -> Result<PathBuf, CacheError> {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let candidate = self.root.join(format!("{}_{}.{}", kind.as_str(), millis, ext));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(_) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
                Err(source) => {
                    return Err(CacheError::Prepare {
                        path: candidate,
                        source,
                    })
                }
            }
        }
    }
}

async fn discard_original(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Deleted original media file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "Could not delete original media file; it may remain visible outside the cache"
        ),
    }
}

/// Resolve `target` and verify it stays within `base`.
///
/// Rejects relative paths and any `..` component; existing files are
/// canonicalized so symlinks cannot point out of the cache.
async fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, CacheError> {
    reject_traversal(target)?;
    within(base, target, fs::canonicalize(target).await.ok())
}

fn reject_traversal(target: &Path) -> Result<(), CacheError> {
    if !target.is_absolute()
        || target
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(CacheError::OutsideCache(target.to_path_buf()));
    }
    Ok(())
}

/// `canonical` is `None` for files that do not exist yet.
fn within(base: &Path, target: &Path, canonical: Option<PathBuf>) -> Result<PathBuf, CacheError> {
    let resolved = canonical.unwrap_or_else(|| target.to_path_buf());
    if resolved.starts_with(base) && resolved != base {
        Ok(resolved)
    } else {
        Err(CacheError::OutsideCache(target.to_path_buf()))
    }
}

/// Lowercased extension, if it looks like a real one.
fn extension_of(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "3gp" => "video/3gpp",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(mime)
}

fn extension_for_mime(mime: &str) -> Option<String> {
    let ext = match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/3gpp" => "3gp",
        "video/webm" => "webm",
        _ => return None,
    };
    Some(ext.to_string())
}

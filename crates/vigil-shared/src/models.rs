//! Report and media model structs.
//!
//! Everything here derives `Serialize`/`Deserialize`: the pending queue
//! stores these structs verbatim as JSON, so field names are part of the
//! persisted format and use camelCase.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::types::{FieldValue, MediaKind, OriginSource, ReportId};

// ---------------------------------------------------------------------------
// MediaAsset
// ---------------------------------------------------------------------------

/// A photo or video that has been relocated into the private media cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    /// Absolute path of the cached copy. Always under the private cache root.
    pub uri: PathBuf,
    pub mime_type: String,
    /// File name inside the cache (`<kind>_<epoch-millis>.<ext>` for captures).
    pub name: String,
    pub size_bytes: u64,
    pub captured_at: DateTime<Utc>,
    pub kind: MediaKind,
    /// Form slot this asset was attached to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
}

impl MediaAsset {
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }
}

// ---------------------------------------------------------------------------
// PendingReport
// ---------------------------------------------------------------------------

/// A finished report awaiting acceptance by the remote endpoint.
///
/// Never mutated once queued; a retry re-reads the same value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingReport {
    pub id: ReportId,
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub media: Vec<MediaAsset>,
    #[serde(default)]
    pub origin_source: OriginSource,
    pub created_at: DateTime<Utc>,
}

impl PendingReport {
    pub fn media_bytes(&self) -> u64 {
        self.media.iter().map(|m| m.size_bytes).sum()
    }
}

// ---------------------------------------------------------------------------
// ReportDraft
// ---------------------------------------------------------------------------

/// A report while the form collaborator is still filling it in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDraft {
    fields: BTreeMap<String, FieldValue>,
    media: Vec<MediaAsset>,
    origin_source: OriginSource,
}

impl ReportDraft {
    pub fn new(origin_source: OriginSource) -> Self {
        Self {
            fields: BTreeMap::new(),
            media: Vec::new(),
            origin_source,
        }
    }

    pub fn set_field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::EmptyFieldName);
        }
        self.fields.insert(name, value.into());
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Attach a cached asset to a form slot.
    pub fn attach(&mut self, slot: &str, asset: MediaAsset) {
        self.media.push(asset.with_slot(slot));
    }

    /// Detach an asset by its cache path, returning it so the caller can
    /// decide whether to delete the file.
    pub fn detach(&mut self, uri: &Path) -> Option<MediaAsset> {
        let idx = self.media.iter().position(|m| m.uri == uri)?;
        Some(self.media.remove(idx))
    }

    pub fn media_in_slot<'a>(&'a self, slot: &'a str) -> impl Iterator<Item = &'a MediaAsset> + 'a {
        self.media
            .iter()
            .filter(move |m| m.slot.as_deref() == Some(slot))
    }

    pub fn media(&self) -> &[MediaAsset] {
        &self.media
    }

    pub fn origin_source(&self) -> OriginSource {
        self.origin_source
    }

    /// Freeze the draft into a report with a fresh id.
    pub fn finish(self) -> PendingReport {
        PendingReport {
            id: ReportId::new(),
            fields: self.fields,
            media: self.media,
            origin_source: self.origin_source,
            created_at: Utc::now(),
        }
    }
}

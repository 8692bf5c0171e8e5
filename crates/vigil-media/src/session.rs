use serde::{Deserialize, Serialize};

use vigil_shared::MediaKind;

/// A pending request to capture media for one slot of a report form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSession {
    pub target_slot: String,
    pub kind: MediaKind,
}

impl CaptureSession {
    pub fn new(target_slot: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            target_slot: target_slot.into(),
            kind,
        }
    }

    pub fn photo(target_slot: impl Into<String>) -> Self {
        Self::new(target_slot, MediaKind::Photo)
    }

    pub fn video(target_slot: impl Into<String>) -> Self {
        Self::new(target_slot, MediaKind::Video)
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }

    /// Extension used when neither the file nor its mime type tells us better.
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Photo => "jpg",
            Self::Video => "mp4",
        }
    }

    pub fn default_mime_type(&self) -> &'static str {
        match self {
            Self::Photo => "image/jpeg",
            Self::Video => "video/mp4",
        }
    }

    /// Classify a mime type; anything that is not `video/*` counts as a photo.
    pub fn from_mime_type(mime: &str) -> Self {
        if mime.trim().to_ascii_lowercase().starts_with("video/") {
            Self::Video
        } else {
            Self::Photo
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" | "image" => Ok(Self::Photo),
            "video" => Ok(Self::Video),
            other => Err(ModelError::UnknownMediaKind(other.to_string())),
        }
    }
}

/// Who produced the report fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OriginSource {
    #[default]
    Manual,
    Voice,
    VoiceOffline,
}

impl OriginSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Voice => "voice",
            Self::VoiceOffline => "voice-offline",
        }
    }
}

impl fmt::Display for OriginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OriginSource {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "manual" => Ok(Self::Manual),
            "voice" => Ok(Self::Voice),
            "voice-offline" => Ok(Self::VoiceOffline),
            other => Err(ModelError::UnknownOrigin(other.to_string())),
        }
    }
}

/// A scalar form value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Point-in-time reachability as reported by the platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivitySnapshot {
    pub connected: bool,
    pub internet_reachable: bool,
}

impl ConnectivitySnapshot {
    pub const ONLINE: Self = Self {
        connected: true,
        internet_reachable: true,
    };

    pub const OFFLINE: Self = Self {
        connected: false,
        internet_reachable: false,
    };

    /// A network interface alone is not enough: captive portals and dead
    /// uplinks report `connected` without reaching the internet.
    pub fn is_online(&self) -> bool {
        self.connected && self.internet_reachable
    }
}

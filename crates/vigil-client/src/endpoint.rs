//! Remote submission endpoint contract.
//!
//! Submission is two-phase: every media asset is uploaded first and yields a
//! stable location, then one report record is created that references those
//! locations. A record never references media that has not been uploaded.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vigil_shared::{FieldValue, MediaAsset, OriginSource, PendingReport, ReportId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// Transport failure, timeout or server-side error; worth retrying.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rejected by endpoint ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl EndpointError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Where an uploaded asset ended up, plus the metadata the record carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaLocation {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    pub location: String,
}

impl MediaLocation {
    pub fn for_asset(asset: &MediaAsset, location: impl Into<String>) -> Self {
        Self {
            name: asset.name.clone(),
            mime_type: asset.mime_type.clone(),
            size_bytes: asset.size_bytes,
            slot: asset.slot.clone(),
            location: location.into(),
        }
    }
}

/// The record created in phase two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: ReportId,
    pub fields: BTreeMap<String, FieldValue>,
    pub media: Vec<MediaLocation>,
    pub origin_source: OriginSource,
    pub created_at: DateTime<Utc>,
}

impl ReportRecord {
    pub fn new(report: &PendingReport, media: Vec<MediaLocation>) -> Self {
        Self {
            id: report.id,
            fields: report.fields.clone(),
            media,
            origin_source: report.origin_source,
            created_at: report.created_at,
        }
    }
}

/// Acknowledgement of a created record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    pub remote_id: String,
}

#[async_trait]
pub trait SubmissionEndpoint: Send + Sync {
    /// Phase one: upload one asset's bytes. Returns its remote location.
    async fn upload_media(
        &self,
        report: ReportId,
        asset: &MediaAsset,
        bytes: Vec<u8>,
    ) -> Result<String, EndpointError>;

    /// Phase two: create the report record.
    async fn create_report(&self, record: &ReportRecord) -> Result<ReportReceipt, EndpointError>;
}

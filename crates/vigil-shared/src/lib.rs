//! # vigil-shared
//!
//! Data model shared by every Vigil crate: report identifiers, media assets,
//! pending reports and the drafts they are built from.

pub mod constants;
pub mod error;
pub mod models;
pub mod types;

pub use error::ModelError;
pub use models::{MediaAsset, PendingReport, ReportDraft};
pub use types::{ConnectivitySnapshot, FieldValue, MediaKind, OriginSource, ReportId};

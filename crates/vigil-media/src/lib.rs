//! # vigil-media
//!
//! Media acquisition for incident reports: driving the device capture UI,
//! relocating its output into the private cache, and bringing picked files
//! under the same cache in bulk.

pub mod batch;
pub mod capture;
pub mod session;

pub use batch::{adopt_all, partition, AdoptOutcome};
pub use capture::{
    CaptureDevice, CaptureError, CaptureOptions, CaptureOutcome, DeviceCapture, DeviceError,
    MediaCaptureService, Permission, PermissionStatus, TransientMedia,
};
pub use session::CaptureSession;

//! Trackpoint core — configuration, report envelopes, the delivery contract,
//! and diagnostics shared by every capture surface.

pub mod config;
pub mod delivery;
pub mod diagnostics;
pub mod envelope;
pub mod error;

pub use config::{TrackerConfig, TrackerOptions, SDK_VERSION};
pub use delivery::{Beacon, BeaconRequest, CaptureBeacon, NoopBeacon};
pub use diagnostics::{Diagnostic, DiagnosticHook};
pub use envelope::{Envelope, ReportPayload, SkippedField, CONTENT_TYPE};
pub use error::{TrackerError, TrackerResult};

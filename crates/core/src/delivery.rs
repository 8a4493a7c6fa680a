//! Delivery contract — one-way beacon hand-off for encoded envelopes.
//!
//! The tracker hands every envelope to an `Arc<dyn Beacon>`. Implementations
//! attempt transmission without blocking the caller and report only whether
//! the request was accepted for sending, never the network outcome.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;

use crate::envelope::CONTENT_TYPE;

/// A single beacon: destination, declared content type, and body.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconRequest {
    pub url: String,
    pub content_type: String,
    pub body: Bytes,
}

impl BeaconRequest {
    pub fn new(url: impl Into<String>, body: Bytes) -> Self {
        Self {
            url: url.into(),
            content_type: CONTENT_TYPE.to_string(),
            body,
        }
    }

    /// Decode the body back into a JSON value.
    pub fn envelope(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }
}

/// Fire-and-forget transport. `send` must return without waiting for the
/// network; `true` means the request was accepted for transmission.
pub trait Beacon: Send + Sync {
    fn send(&self, request: BeaconRequest) -> bool;
}

/// Accepts and discards every request.
pub struct NoopBeacon;

impl Beacon for NoopBeacon {
    fn send(&self, _request: BeaconRequest) -> bool {
        true
    }
}

/// In-memory beacon that records every request, for tests and dry runs.
#[derive(Default)]
pub struct CaptureBeacon {
    requests: Mutex<Vec<BeaconRequest>>,
    reject: bool,
}

impl CaptureBeacon {
    pub fn new() -> Self {
        Self::default()
    }

    /// A beacon that records requests but reports each one as not accepted.
    pub fn rejecting() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn requests(&self) -> Vec<BeaconRequest> {
        self.requests.lock().clone()
    }

    /// Decoded bodies of every recorded request; undecodable bodies are skipped.
    pub fn envelopes(&self) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| r.envelope().ok())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
    }
}

impl Beacon for CaptureBeacon {
    fn send(&self, request: BeaconRequest) -> bool {
        self.requests.lock().push(request);
        !self.reject
    }
}

/// Convenience: a beacon that drops everything.
pub fn noop_beacon() -> Arc<dyn Beacon> {
    Arc::new(NoopBeacon)
}

/// Convenience: a capture beacon for tests.
pub fn capture_beacon() -> Arc<CaptureBeacon> {
    Arc::new(CaptureBeacon::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capture_beacon() {
        let beacon = capture_beacon();
        assert_eq!(beacon.count(), 0);

        let body = Bytes::from(serde_json::to_vec(&json!({"event": "click"})).unwrap());
        assert!(beacon.send(BeaconRequest::new("https://collect.example.com/t", body)));

        assert_eq!(beacon.count(), 1);
        let requests = beacon.requests();
        assert_eq!(requests[0].url, "https://collect.example.com/t");
        assert_eq!(requests[0].content_type, CONTENT_TYPE);
        assert_eq!(beacon.envelopes(), vec![json!({"event": "click"})]);

        beacon.clear();
        assert_eq!(beacon.count(), 0);
    }

    #[test]
    fn test_rejecting_beacon_still_records() {
        let beacon = CaptureBeacon::rejecting();
        assert!(!beacon.send(BeaconRequest::new("https://x.example.com", Bytes::new())));
        assert_eq!(beacon.count(), 1);
        assert!(beacon.envelopes().is_empty());
    }

    #[test]
    fn test_noop_beacon() {
        let beacon = noop_beacon();
        assert!(beacon.send(BeaconRequest::new("", Bytes::from_static(b"{}"))));
    }
}

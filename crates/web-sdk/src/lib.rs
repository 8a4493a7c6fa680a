//! Web capture SDK — turns page navigation, tagged DOM interactions, and
//! uncaught errors into report envelopes and hands them to a beacon.
//!
//! # Modules
//!
//! - [`dom`] — Elements, events, and the global event target
//! - [`host`] — The [`Window`] seam and the [`HeadlessWindow`] page
//! - [`navigation`] — Navigation bridge making `pushState`/`replaceState` observable
//! - [`tracker`] — Listener registration, envelope construction, and delivery
//! - [`transport`] — Fire-and-forget HTTP beacon
//! - [`scenario`] — Scripted session replay

pub mod dom;
pub mod host;
pub mod navigation;
pub mod scenario;
pub mod tracker;
pub mod transport;

pub use dom::{DomEvent, Element, EventTarget};
pub use host::{HeadlessWindow, Window};
pub use navigation::{HistoryMethod, NavigationBridge};
pub use scenario::Scenario;
pub use tracker::{Tracker, TrackerBuilder, TARGET_KEY_ATTRIBUTE};
pub use transport::HttpBeacon;

//! Tracker — registers capture listeners on a page and turns every captured
//! signal into exactly one report envelope handed to the beacon.
//!
//! Construction merges the options, installs the page's navigation bridge,
//! and then registers listeners for each enabled category in a fixed order:
//! history, hash, DOM interactions, script errors. Listener callbacks never
//! propagate errors into the page; anything that goes wrong is routed to
//! the diagnostic hook.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use trackpoint_core::diagnostics::{tracing_hook, Diagnostic, DiagnosticHook};
use trackpoint_core::envelope::{HASH_TARGET, HISTORY_TARGET, MESSAGE_TARGET_KEY};
use trackpoint_core::{
    Beacon, BeaconRequest, Envelope, ReportPayload, TrackerConfig, TrackerError, TrackerOptions,
    TrackerResult,
};

use crate::dom::{DomEvent, EventDetail, EventTarget, ListenerId};
use crate::host::Window;
use crate::navigation::{HistoryMethod, NavigationBridge};
use crate::transport::HttpBeacon;

/// Marker attribute that opts an element into interaction tracking. Its
/// value becomes the envelope's `targetKey`.
pub const TARGET_KEY_ATTRIBUTE: &str = "target-key";

/// Mouse interactions captured when DOM tracking is on.
pub const MOUSE_EVENTS: [&str; 8] = [
    "click",
    "dblclick",
    "contextmenu",
    "mousedown",
    "mouseup",
    "mouseenter",
    "mouseout",
    "mouseover",
];

/// Shared by every listener: current configuration plus the outbound path.
struct Reporter {
    config: RwLock<TrackerConfig>,
    beacon: Arc<dyn Beacon>,
    diagnostics: Arc<dyn DiagnosticHook>,
}

impl Reporter {
    /// Build the envelope for `payload` and hand it to the beacon. Returns
    /// whether the beacon accepted it.
    fn report(&self, payload: &ReportPayload) -> bool {
        let (envelope, url) = {
            let config = self.config.read();
            (
                Envelope::build(&config, payload),
                config.request_url().to_string(),
            )
        };

        let body = match envelope.and_then(|e| e.encode()) {
            Ok(body) => body,
            Err(e) => {
                self.diagnose(Diagnostic::SerializationFallback {
                    field: "envelope".into(),
                    reason: e.to_string(),
                });
                return false;
            }
        };
        metrics::counter!("trackpoint.envelopes.built").increment(1);

        if url.is_empty() {
            self.diagnose(Diagnostic::MissingRequestUrl);
            return false;
        }

        let bytes = body.len();
        let accepted = self.beacon.send(BeaconRequest::new(url.clone(), body));
        if accepted {
            metrics::counter!("trackpoint.beacon.accepted").increment(1);
        } else {
            metrics::counter!("trackpoint.beacon.rejected").increment(1);
            self.diagnose(Diagnostic::DeliveryRejected { url: url.clone() });
        }

        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or("");
        debug!(
            event,
            url = %url,
            bytes,
            accepted,
            "envelope handed to beacon"
        );
        accepted
    }

    fn diagnose(&self, diagnostic: Diagnostic) {
        self.diagnostics.on_diagnostic(&diagnostic);
    }
}

/// Builder for [`Tracker`]. Defaults to an [`HttpBeacon`] and a diagnostic
/// hook that logs through `tracing`.
pub struct TrackerBuilder {
    options: TrackerOptions,
    beacon: Option<Arc<dyn Beacon>>,
    diagnostics: Option<Arc<dyn DiagnosticHook>>,
}

impl TrackerBuilder {
    pub fn beacon(mut self, beacon: Arc<dyn Beacon>) -> Self {
        self.beacon = Some(beacon);
        self
    }

    pub fn diagnostics(mut self, hook: Arc<dyn DiagnosticHook>) -> Self {
        self.diagnostics = Some(hook);
        self
    }

    /// Attach to `window` and register the enabled capture listeners.
    ///
    /// Fails fast when the window exposes no global event target.
    pub fn install(self, window: Arc<dyn Window>) -> TrackerResult<Tracker> {
        let shadowed: Vec<String> = self
            .options
            .shadowed_keys()
            .into_iter()
            .map(String::from)
            .collect();
        let config = TrackerConfig::initialize(self.options);

        let bridge = NavigationBridge::install(&window)?;
        let target = window.event_target().ok_or_else(|| {
            TrackerError::HostUnavailable("window has no global event target".into())
        })?;

        let beacon: Arc<dyn Beacon> = match self.beacon {
            Some(beacon) => beacon,
            None => Arc::new(HttpBeacon::new()?),
        };
        let reporter = Arc::new(Reporter {
            config: RwLock::new(config.clone()),
            beacon,
            diagnostics: self.diagnostics.unwrap_or_else(tracing_hook),
        });
        for key in shadowed {
            reporter.diagnose(Diagnostic::ShadowedOption { key });
        }

        let mut tracker = Tracker {
            reporter,
            window,
            target,
            bridge,
            listeners: Vec::new(),
        };

        if config.history_tracker() {
            tracker.capture_history();
        }
        if config.hash_tracker() {
            tracker.capture_hash();
        }
        if config.dom_tracker() {
            tracker.capture_dom();
        }
        if config.js_error() {
            tracker.capture_errors();
        }

        info!(
            window_id = %tracker.window.id(),
            history = config.history_tracker(),
            hash = config.hash_tracker(),
            dom = config.dom_tracker(),
            js_error = config.js_error(),
            listeners = tracker.listeners.len(),
            "tracker installed"
        );
        Ok(tracker)
    }
}

/// A tracker attached to one page. Dropping it removes its listeners; the
/// page's navigation bridge stays installed.
pub struct Tracker {
    reporter: Arc<Reporter>,
    window: Arc<dyn Window>,
    target: Arc<EventTarget>,
    bridge: Arc<NavigationBridge>,
    listeners: Vec<ListenerId>,
}

impl Tracker {
    pub fn builder(options: TrackerOptions) -> TrackerBuilder {
        TrackerBuilder {
            options,
            beacon: None,
            diagnostics: None,
        }
    }

    /// Tracker on `window` delivering through `beacon`.
    pub fn new(
        options: TrackerOptions,
        window: Arc<dyn Window>,
        beacon: Arc<dyn Beacon>,
    ) -> TrackerResult<Self> {
        Self::builder(options).beacon(beacon).install(window)
    }

    /// Attach a user identity to every later envelope.
    pub fn set_user_id(&self, uuid: impl Into<Value>) {
        self.reporter.config.write().set_user_id(uuid);
    }

    /// Replace the extra fields attached to every later envelope. A value
    /// that cannot be serialised clears them and raises a diagnostic.
    pub fn set_extra<T: Serialize + ?Sized>(&self, extra: &T) {
        let extra = match serde_json::to_value(extra) {
            Ok(value) => Some(value),
            Err(e) => {
                self.reporter.diagnose(Diagnostic::SerializationFallback {
                    field: "extra".into(),
                    reason: e.to_string(),
                });
                None
            }
        };
        self.reporter.config.write().set_extra(extra);
    }

    /// Report a custom payload. Returns whether the beacon accepted it.
    pub fn send_tracker(&self, payload: impl Into<ReportPayload>) -> bool {
        self.reporter.report(&payload.into())
    }

    /// Report any serialisable struct or map. Fields that fail to serialise
    /// are left out with a diagnostic each; a record that is not a struct or
    /// map is dropped and the configuration alone is sent.
    pub fn send_serialized<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        let payload = match ReportPayload::collect_fields(payload) {
            Ok((payload, skipped)) => {
                for skipped in skipped {
                    self.reporter.diagnose(Diagnostic::SerializationFallback {
                        field: skipped.field,
                        reason: skipped.reason,
                    });
                }
                payload
            }
            Err(e) => {
                self.reporter.diagnose(Diagnostic::SerializationFallback {
                    field: "payload".into(),
                    reason: e.to_string(),
                });
                ReportPayload::default()
            }
        };
        self.reporter.report(&payload)
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> TrackerConfig {
        self.reporter.config.read().clone()
    }

    /// The page's navigation bridge.
    pub fn bridge(&self) -> &Arc<NavigationBridge> {
        &self.bridge
    }

    /// Number of listeners this tracker registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn listen<F>(&mut self, event_type: &str, listener: F)
    where
        F: Fn(&DomEvent) + Send + Sync + 'static,
    {
        let id = self.target.add_event_listener(event_type, listener);
        self.listeners.push(id);
    }

    /// `pushState`, `replaceState` and `popstate` → `history-pv` with the
    /// location at dispatch time.
    fn capture_history(&mut self) {
        let events = [
            HistoryMethod::PushState.event_name(),
            HistoryMethod::ReplaceState.event_name(),
            "popstate",
        ];
        for event_type in events {
            let reporter = self.reporter.clone();
            let window: Weak<dyn Window> = Arc::downgrade(&self.window);
            self.listen(event_type, move |event| {
                let url = window
                    .upgrade()
                    .map(|w| w.location_href())
                    .unwrap_or_default();
                reporter.report(&ReportPayload::page_view(
                    event.event_type(),
                    HISTORY_TARGET,
                    Some(json!({ "url": url })),
                ));
            });
        }
    }

    fn capture_hash(&mut self) {
        let reporter = self.reporter.clone();
        self.listen("hashchange", move |event| {
            reporter.report(&ReportPayload::page_view(
                event.event_type(),
                HASH_TARGET,
                None,
            ));
        });
    }

    /// Mouse interactions on elements carrying a non-empty `target-key`.
    /// Elements without the marker are skipped silently.
    fn capture_dom(&mut self) {
        for event_type in MOUSE_EVENTS {
            let reporter = self.reporter.clone();
            self.listen(event_type, move |event| {
                let key = event
                    .target()
                    .and_then(|el| el.get_attribute(TARGET_KEY_ATTRIBUTE))
                    .filter(|key| !key.is_empty());
                match key {
                    Some(key) => {
                        reporter.report(&ReportPayload::interaction(event.event_type(), key, None));
                    }
                    None => metrics::counter!("trackpoint.dom.filtered").increment(1),
                }
            });
        }
    }

    fn capture_errors(&mut self) {
        let reporter = self.reporter.clone();
        self.listen("error", move |event| {
            let message = match event.detail() {
                EventDetail::ScriptError(error) => error.message.clone(),
                _ => String::new(),
            };
            reporter.report(&ReportPayload::interaction(
                "error",
                MESSAGE_TARGET_KEY,
                Some(message),
            ));
        });

        let reporter = self.reporter.clone();
        self.listen("unhandledrejection", move |event| {
            let caught = match event.detail() {
                EventDetail::Rejection(promise) => {
                    let on_reason = reporter.clone();
                    promise.catch(move |reason| {
                        on_reason.report(&ReportPayload::interaction(
                            "error",
                            MESSAGE_TARGET_KEY,
                            Some(reason_message(&reason)),
                        ));
                    })
                }
                _ => Err(TrackerError::Host(
                    "unhandledrejection event carries no promise".into(),
                )),
            };
            if let Err(e) = caught {
                reporter.diagnose(Diagnostic::RejectionReasonUnavailable {
                    reason: e.to_string(),
                });
                reporter.report(&ReportPayload::interaction(
                    "error",
                    MESSAGE_TARGET_KEY,
                    Some(String::new()),
                ));
            }
        });
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        for id in self.listeners.drain(..) {
            self.target.remove_event_listener(id);
        }
    }
}

/// Text of a rejection reason: strings verbatim, anything else as JSON.
fn reason_message(reason: &Value) -> String {
    match reason {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Element, RejectedPromise, ScriptError};
    use crate::host::HeadlessWindow;
    use parking_lot::Mutex;
    use trackpoint_core::delivery::{capture_beacon, CaptureBeacon};
    use trackpoint_core::SDK_VERSION;

    const ENDPOINT: &str = "https://collect.example.com/t";

    fn setup(options: TrackerOptions) -> (Arc<HeadlessWindow>, Arc<CaptureBeacon>, Tracker) {
        let page = HeadlessWindow::new("https://shop.example.com/").unwrap();
        let beacon = capture_beacon();
        let tracker = Tracker::new(options, page.clone(), beacon.clone()).unwrap();
        (page, beacon, tracker)
    }

    #[test]
    fn test_no_toggles_registers_nothing() {
        let (page, beacon, tracker) = setup(TrackerOptions::new(ENDPOINT));
        assert_eq!(tracker.listener_count(), 0);

        page.push_state(json!(null), Some("/a")).unwrap();
        page.click(Element::new("button").with_attribute(TARGET_KEY_ATTRIBUTE, "buy"));
        assert_eq!(beacon.count(), 0);
    }

    #[test]
    fn test_listener_counts_per_category() {
        let (_, _, history) = setup(TrackerOptions::new(ENDPOINT).with_history_tracker(true));
        assert_eq!(history.listener_count(), 3);
        let (_, _, dom) = setup(TrackerOptions::new(ENDPOINT).with_dom_tracker(true));
        assert_eq!(dom.listener_count(), MOUSE_EVENTS.len());
        let (_, _, errors) = setup(TrackerOptions::new(ENDPOINT).with_js_error(true));
        assert_eq!(errors.listener_count(), 2);
    }

    #[test]
    fn test_history_reports_location_at_dispatch_time() {
        let (page, beacon, _tracker) =
            setup(TrackerOptions::new(ENDPOINT).with_history_tracker(true));

        page.push_state(json!(null), Some("/cart")).unwrap();
        page.replace_state(json!(null), Some("/cart?step=2")).unwrap();
        page.back();

        let envelopes = beacon.envelopes();
        assert_eq!(envelopes.len(), 3);
        assert_eq!(envelopes[0]["event"], "pushState");
        assert_eq!(envelopes[0]["data"]["url"], "https://shop.example.com/cart");
        assert_eq!(envelopes[1]["event"], "replaceState");
        assert_eq!(envelopes[1]["data"]["url"], "https://shop.example.com/cart?step=2");
        assert_eq!(envelopes[2]["event"], "popstate");
        assert_eq!(envelopes[2]["data"]["url"], "https://shop.example.com/");
        assert!(envelopes.iter().all(|e| e["target"] == HISTORY_TARGET));
    }

    #[test]
    fn test_hash_change_report() {
        let (page, beacon, _tracker) = setup(TrackerOptions::new(ENDPOINT).with_hash_tracker(true));
        page.set_hash("reviews");

        let envelopes = beacon.envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0]["event"], "hashchange");
        assert_eq!(envelopes[0]["target"], HASH_TARGET);
        assert!(envelopes[0].get("data").is_none());
    }

    #[test]
    fn test_dom_marker_attribute_filter() {
        let (page, beacon, _tracker) = setup(TrackerOptions::new(ENDPOINT).with_dom_tracker(true));

        page.click(Element::new("button").with_attribute(TARGET_KEY_ATTRIBUTE, "foo"));
        page.click(Element::new("button"));
        page.click(Element::new("a").with_attribute(TARGET_KEY_ATTRIBUTE, ""));
        page.mouse("contextmenu", Element::new("div").with_attribute(TARGET_KEY_ATTRIBUTE, "menu"));
        page.mouse("keydown", Element::new("input").with_attribute(TARGET_KEY_ATTRIBUTE, "field"));

        let envelopes = beacon.envelopes();
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0]["event"], "click");
        assert_eq!(envelopes[0]["targetKey"], "foo");
        assert_eq!(envelopes[1]["event"], "contextmenu");
        assert_eq!(envelopes[1]["targetKey"], "menu");
    }

    #[test]
    fn test_script_error_and_rejection_reports() {
        let (page, beacon, _tracker) = setup(TrackerOptions::new(ENDPOINT).with_js_error(true));

        page.throw_error(ScriptError::new("x is not defined"));
        let promise = page.reject_promise(RejectedPromise::new(json!("network down")));
        page.reject_promise(RejectedPromise::new(json!({"code": 503})));

        assert!(promise.is_handled());
        let envelopes = beacon.envelopes();
        assert_eq!(envelopes.len(), 3);
        assert!(envelopes.iter().all(|e| e["event"] == "error"));
        assert!(envelopes.iter().all(|e| e["targetKey"] == MESSAGE_TARGET_KEY));
        assert_eq!(envelopes[0]["message"], "x is not defined");
        assert_eq!(envelopes[1]["message"], "network down");
        assert_eq!(envelopes[2]["message"], r#"{"code":503}"#);
    }

    #[test]
    fn test_unreadable_rejection_degrades_to_empty_message() {
        let diagnostics = Arc::new(Mutex::new(Vec::new()));
        let sink = diagnostics.clone();
        let page = HeadlessWindow::new("https://shop.example.com/").unwrap();
        let beacon = capture_beacon();
        let _tracker = Tracker::builder(TrackerOptions::new(ENDPOINT).with_js_error(true))
            .beacon(beacon.clone())
            .diagnostics(Arc::new(move |d: &Diagnostic| sink.lock().push(d.clone())))
            .install(page.clone())
            .unwrap();

        page.reject_promise(RejectedPromise::unreadable());

        let envelopes = beacon.envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0]["message"], "");
        assert!(matches!(
            diagnostics.lock().as_slice(),
            [Diagnostic::RejectionReasonUnavailable { .. }]
        ));
    }

    #[test]
    fn test_setters_apply_to_later_envelopes_only() {
        let (_, beacon, tracker) = setup(TrackerOptions::new(ENDPOINT));

        tracker.send_tracker(ReportPayload::interaction("custom", "before", None));
        tracker.set_user_id("user-9");
        tracker.set_extra(&json!({"plan": "pro"}));
        tracker.send_tracker(ReportPayload::interaction("custom", "after", None));

        let envelopes = beacon.envelopes();
        assert!(envelopes[0].get("uuid").is_none());
        assert!(envelopes[0].get("extra").is_none());
        assert_eq!(envelopes[1]["uuid"], "user-9");
        assert_eq!(envelopes[1]["extra"], json!({"plan": "pro"}));
    }

    #[test]
    fn test_send_tracker_adds_exactly_the_payload() {
        let (_, beacon, tracker) = setup(TrackerOptions::new(ENDPOINT).with_uuid(7));
        let mut payload = serde_json::Map::new();
        payload.insert("event".into(), json!("custom"));
        payload.insert("foo".into(), json!("bar"));
        assert!(tracker.send_tracker(payload));

        let mut expected = tracker.config().to_fields().unwrap();
        expected.insert("event".into(), json!("custom"));
        expected.insert("foo".into(), json!("bar"));
        assert_eq!(beacon.envelopes(), vec![Value::Object(expected)]);

        let request = &beacon.requests()[0];
        assert_eq!(request.url, ENDPOINT);
        assert_eq!(request.content_type, trackpoint_core::CONTENT_TYPE);
        assert_eq!(beacon.envelopes()[0]["sdkVersion"], SDK_VERSION);
    }

    #[test]
    fn test_missing_request_url_is_a_diagnosed_noop() {
        let diagnostics = Arc::new(Mutex::new(Vec::new()));
        let sink = diagnostics.clone();
        let page = HeadlessWindow::new("https://shop.example.com/").unwrap();
        let beacon = capture_beacon();
        let tracker = Tracker::builder(TrackerOptions::default())
            .beacon(beacon.clone())
            .diagnostics(Arc::new(move |d: &Diagnostic| sink.lock().push(d.clone())))
            .install(page)
            .unwrap();

        assert!(!tracker.send_tracker(ReportPayload::interaction("custom", "x", None)));
        assert_eq!(beacon.count(), 0);
        assert_eq!(*diagnostics.lock(), vec![Diagnostic::MissingRequestUrl]);
    }

    #[test]
    fn test_rejected_delivery_is_reported_as_value() {
        let page = HeadlessWindow::new("https://shop.example.com/").unwrap();
        let beacon = Arc::new(CaptureBeacon::rejecting());
        let tracker = Tracker::new(TrackerOptions::new(ENDPOINT), page, beacon.clone()).unwrap();
        assert!(!tracker.send_tracker(ReportPayload::interaction("custom", "x", None)));
        assert_eq!(beacon.count(), 1);
    }

    #[test]
    fn test_unserialisable_extra_is_dropped() {
        let (_, beacon, tracker) = setup(TrackerOptions::new(ENDPOINT).with_extra(json!({"a": 1})));
        let mut bad = std::collections::BTreeMap::new();
        bad.insert(vec![1u8], "bytes key");
        tracker.set_extra(&bad);

        assert!(tracker.config().extra().is_none());
        assert!(tracker.send_serialized(&json!({"event": "custom"})));
        assert!(beacon.envelopes()[0].get("extra").is_none());
        assert_eq!(beacon.envelopes()[0]["event"], "custom");
    }

    fn with_diagnostics(
        options: TrackerOptions,
    ) -> (Arc<CaptureBeacon>, Tracker, Arc<Mutex<Vec<Diagnostic>>>) {
        let diagnostics = Arc::new(Mutex::new(Vec::new()));
        let sink = diagnostics.clone();
        let page = HeadlessWindow::new("https://shop.example.com/").unwrap();
        let beacon = capture_beacon();
        let tracker = Tracker::builder(options)
            .beacon(beacon.clone())
            .diagnostics(Arc::new(move |d: &Diagnostic| sink.lock().push(d.clone())))
            .install(page)
            .unwrap();
        (beacon, tracker, diagnostics)
    }

    #[test]
    fn test_send_serialized_drops_only_the_failing_field() {
        #[derive(Serialize)]
        struct Checkout {
            event: &'static str,
            total: u32,
            basket: std::collections::BTreeMap<Vec<u8>, &'static str>,
        }
        let mut basket = std::collections::BTreeMap::new();
        basket.insert(vec![1u8], "sku-1");

        let (beacon, tracker, diagnostics) = with_diagnostics(TrackerOptions::new(ENDPOINT));
        assert!(tracker.send_serialized(&Checkout {
            event: "checkout",
            total: 42,
            basket,
        }));

        let envelope = &beacon.envelopes()[0];
        assert_eq!(envelope["event"], "checkout");
        assert_eq!(envelope["total"], 42);
        assert!(envelope.get("basket").is_none());
        assert!(matches!(
            diagnostics.lock().as_slice(),
            [Diagnostic::SerializationFallback { field, .. }] if field == "basket"
        ));
    }

    #[test]
    fn test_shadowed_option_raises_diagnostic() {
        let options: TrackerOptions = serde_json::from_value(json!({
            "requestUrl": ENDPOINT,
            "sdkVersion": "9.9.9",
            "appId": "shop-web"
        }))
        .unwrap();
        let (beacon, tracker, diagnostics) = with_diagnostics(options);

        assert_eq!(
            *diagnostics.lock(),
            vec![Diagnostic::ShadowedOption {
                key: "sdkVersion".into()
            }]
        );
        tracker.send_tracker(ReportPayload::interaction("custom", "x", None));
        let envelope = &beacon.envelopes()[0];
        assert_eq!(envelope["sdkVersion"], SDK_VERSION);
        assert_eq!(envelope["appId"], "shop-web");
    }

    #[test]
    fn test_send_serialized_non_object_sends_config_only() {
        let (_, beacon, tracker) = setup(TrackerOptions::new(ENDPOINT));
        assert!(tracker.send_serialized(&"just a string"));
        let envelope = &beacon.envelopes()[0];
        assert!(envelope.get("event").is_none());
        assert_eq!(envelope["requestUrl"], ENDPOINT);
    }

    #[test]
    fn test_fails_fast_without_event_target() {
        let page = HeadlessWindow::without_event_target("https://shop.example.com/").unwrap();
        let result = Tracker::new(TrackerOptions::new(ENDPOINT), page, capture_beacon());
        assert!(matches!(result, Err(TrackerError::HostUnavailable(_))));
    }

    #[test]
    fn test_drop_removes_listeners() {
        let (page, beacon, tracker) = setup(
            TrackerOptions::new(ENDPOINT)
                .with_history_tracker(true)
                .with_dom_tracker(true),
        );
        drop(tracker);

        page.push_state(json!(null), Some("/a")).unwrap();
        page.click(Element::new("button").with_attribute(TARGET_KEY_ATTRIBUTE, "buy"));
        assert_eq!(beacon.count(), 0);
        assert_eq!(page.event_target().unwrap().listener_count("click"), 0);
    }
}

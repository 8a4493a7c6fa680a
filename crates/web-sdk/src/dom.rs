//! Minimal DOM model — elements, events, and the global event target the
//! tracker registers its listeners on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use trackpoint_core::{TrackerError, TrackerResult};

pub type ListenerId = Uuid;
pub type Listener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// An element as seen by an event listener: tag name and attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: HashMap<String, String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Details of an uncaught script error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub message: String,
    pub filename: Option<String>,
    pub lineno: u32,
    pub colno: u32,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            filename: None,
            lineno: 0,
            colno: 0,
        }
    }
}

/// A promise that was rejected with no handler attached. The reason is
/// only reachable by attaching a handler with [`RejectedPromise::catch`].
#[derive(Debug, Clone)]
pub struct RejectedPromise {
    reason: Option<Value>,
    handled: Arc<AtomicBool>,
}

impl RejectedPromise {
    pub fn new(reason: Value) -> Self {
        Self {
            reason: Some(reason),
            handled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A rejection whose reason cannot be read, e.g. a revoked proxy.
    pub fn unreadable() -> Self {
        Self {
            reason: None,
            handled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach a rejection handler. The handler runs with the reason; the
    /// promise counts as handled from then on.
    pub fn catch<F>(&self, handler: F) -> TrackerResult<()>
    where
        F: FnOnce(Value),
    {
        self.handled.store(true, Ordering::SeqCst);
        let reason = self
            .reason
            .clone()
            .ok_or_else(|| TrackerError::Host("rejection reason is not readable".into()))?;
        handler(reason);
        Ok(())
    }

    pub fn is_handled(&self) -> bool {
        self.handled.load(Ordering::SeqCst)
    }
}

/// Event-specific detail carried by a [`DomEvent`].
#[derive(Debug, Clone, Default)]
pub enum EventDetail {
    #[default]
    None,
    /// Location of the page when a navigation event was dispatched.
    Location(String),
    ScriptError(ScriptError),
    Rejection(RejectedPromise),
}

/// An event dispatched on an [`EventTarget`].
#[derive(Debug, Clone)]
pub struct DomEvent {
    event_type: String,
    target: Option<Element>,
    detail: EventDetail,
}

impl DomEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            target: None,
            detail: EventDetail::None,
        }
    }

    pub fn with_target(mut self, target: Element) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The element the event originated from, if any.
    pub fn target(&self) -> Option<&Element> {
        self.target.as_ref()
    }

    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }
}

/// Listener registry keyed by event type. Listeners for one type run in
/// registration order.
#[derive(Default)]
pub struct EventTarget {
    listeners: DashMap<String, Vec<(ListenerId, Listener)>>,
}

impl EventTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event_listener<F>(&self, event_type: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&DomEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.listeners
            .entry(event_type.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener by id. Returns `false` if it was not registered.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut removed = false;
        for mut entry in self.listeners.iter_mut() {
            let before = entry.len();
            entry.retain(|(listener_id, _)| *listener_id != id);
            removed |= entry.len() != before;
        }
        removed
    }

    /// Invoke every listener registered for the event's type and return how
    /// many ran. Listeners may add or remove listeners while running.
    pub fn dispatch_event(&self, event: &DomEvent) -> usize {
        let snapshot: Vec<Listener> = match self.listeners.get(event.event_type()) {
            Some(entry) => entry.iter().map(|(_, l)| l.clone()).collect(),
            None => return 0,
        };
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .get(event_type)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_dispatch_in_registration_order() {
        let target = EventTarget::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        target.add_event_listener("click", move |_| first.lock().push(1));
        let second = order.clone();
        target.add_event_listener("click", move |_| second.lock().push(2));
        target.add_event_listener("dblclick", |_| panic!("wrong type"));

        assert_eq!(target.dispatch_event(&DomEvent::new("click")), 2);
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn test_remove_listener() {
        let target = EventTarget::new();
        let id = target.add_event_listener("error", |_| {});
        assert_eq!(target.listener_count("error"), 1);

        assert!(target.remove_event_listener(id));
        assert!(!target.remove_event_listener(id));
        assert_eq!(target.dispatch_event(&DomEvent::new("error")), 0);
    }

    #[test]
    fn test_listener_can_register_during_dispatch() {
        let target = Arc::new(EventTarget::new());
        let inner = target.clone();
        target.add_event_listener("click", move |_| {
            inner.add_event_listener("click", |_| {});
        });

        assert_eq!(target.dispatch_event(&DomEvent::new("click")), 1);
        assert_eq!(target.listener_count("click"), 2);
    }

    #[test]
    fn test_element_attributes() {
        let el = Element::new("button").with_attribute("target-key", "buy");
        assert_eq!(el.tag(), "button");
        assert_eq!(el.get_attribute("target-key"), Some("buy"));
        assert_eq!(el.get_attribute("id"), None);
    }

    #[test]
    fn test_rejected_promise_catch() {
        let promise = RejectedPromise::new(json!("timeout"));
        assert!(!promise.is_handled());

        let mut seen = None;
        promise.catch(|reason| seen = Some(reason)).unwrap();
        assert_eq!(seen, Some(json!("timeout")));
        assert!(promise.is_handled());

        let unreadable = RejectedPromise::unreadable();
        assert!(unreadable.catch(|_| panic!("no reason")).is_err());
        assert!(unreadable.is_handled());
    }
}

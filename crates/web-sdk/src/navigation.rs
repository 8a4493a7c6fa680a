//! Navigation bridge — makes programmatic navigation (`pushState` /
//! `replaceState`) observable the same way back/forward navigation is.
//!
//! Each history entry point is wrapped so that after the original mutation
//! completes a synthetic event named after the method is dispatched on the
//! page's global event target, carrying the new location. Wrapping happens
//! exactly once per page: the bridge registry is process-wide and keyed by
//! the page id, so constructing several trackers on one page never stacks
//! wrappers or duplicates events.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use trackpoint_core::{TrackerError, TrackerResult};

use crate::dom::{DomEvent, EventDetail, EventTarget};
use crate::host::{HistoryCall, HistoryFn, Window};

/// The two history mutations that do not fire an event on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryMethod {
    PushState,
    ReplaceState,
}

impl HistoryMethod {
    pub const ALL: [HistoryMethod; 2] = [HistoryMethod::PushState, HistoryMethod::ReplaceState];

    /// Name of the synthetic event dispatched after the mutation.
    pub fn event_name(self) -> &'static str {
        match self {
            HistoryMethod::PushState => "pushState",
            HistoryMethod::ReplaceState => "replaceState",
        }
    }
}

pub type SubscriptionId = Uuid;
type Subscriber = Arc<dyn Fn(&NavigationEvent) + Send + Sync>;

/// Notification delivered to bridge subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub method: HistoryMethod,
    pub href: String,
}

static BRIDGES: OnceLock<DashMap<Uuid, Arc<NavigationBridge>>> = OnceLock::new();

fn registry() -> &'static DashMap<Uuid, Arc<NavigationBridge>> {
    BRIDGES.get_or_init(DashMap::new)
}

/// Per-page navigation event source.
pub struct NavigationBridge {
    window_id: Uuid,
    target: Arc<EventTarget>,
    window: Weak<dyn Window>,
    subscribers: DashMap<SubscriptionId, Subscriber>,
    /// Entry points in place before the bridge wrapped them.
    originals: Mutex<Vec<(HistoryMethod, HistoryFn)>>,
}

impl NavigationBridge {
    /// Install the bridge on `window`, or return the one already installed.
    ///
    /// Fails with [`TrackerError::HostUnavailable`] when the window has no
    /// global event target. If the window refuses one of the patches, the
    /// entry points already wrapped are put back and nothing is registered.
    pub fn install(window: &Arc<dyn Window>) -> TrackerResult<Arc<Self>> {
        let target = window.event_target().ok_or_else(|| {
            TrackerError::HostUnavailable("window has no global event target".into())
        })?;

        match registry().entry(window.id()) {
            Entry::Occupied(existing) => {
                debug!(window_id = %window.id(), "navigation bridge already installed");
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                let bridge = Arc::new(Self {
                    window_id: window.id(),
                    target,
                    window: Arc::downgrade(window),
                    subscribers: DashMap::new(),
                    originals: Mutex::new(Vec::new()),
                });
                let originals = Mutex::new(Vec::new());
                for method in HistoryMethod::ALL {
                    let publisher = bridge.clone();
                    let patched = window.patch_history(method, &|original: HistoryFn| {
                        originals.lock().push((method, original.clone()));
                        wrap(method, original, publisher.clone())
                    });
                    if let Err(e) = patched {
                        restore(window.as_ref(), originals.into_inner());
                        warn!(
                            window_id = %bridge.window_id,
                            error = %e,
                            "navigation bridge not installed"
                        );
                        return Err(e);
                    }
                }
                *bridge.originals.lock() = originals.into_inner();
                slot.insert(bridge.clone());
                info!(window_id = %bridge.window_id, "navigation bridge installed");
                Ok(bridge)
            }
        }
    }

    /// Remove the bridge of the page with this id from the registry and, if
    /// the page is still alive, put back the entry points it wrapped.
    /// Returns whether a bridge was installed.
    ///
    /// [`HeadlessWindow`](crate::host::HeadlessWindow) calls this when it is
    /// dropped; other [`Window`] implementations should do the same.
    pub fn uninstall(window_id: Uuid) -> bool {
        let Some((_, bridge)) = BRIDGES.get().and_then(|bridges| bridges.remove(&window_id))
        else {
            return false;
        };
        let originals = std::mem::take(&mut *bridge.originals.lock());
        if let Some(window) = bridge.window.upgrade() {
            restore(window.as_ref(), originals);
        }
        info!(window_id = %window_id, "navigation bridge uninstalled");
        true
    }

    /// Whether a bridge has been installed for the page with this id.
    pub fn is_installed(window_id: Uuid) -> bool {
        registry().contains_key(&window_id)
    }

    pub fn window_id(&self) -> Uuid {
        self.window_id
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NavigationEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.subscribers.insert(id, Arc::new(callback));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn current_href(&self) -> String {
        self.window
            .upgrade()
            .map(|w| w.location_href())
            .unwrap_or_default()
    }

    /// Dispatch the synthetic event for `method` and notify subscribers.
    fn publish(&self, method: HistoryMethod) {
        let href = self.current_href();
        let event =
            DomEvent::new(method.event_name()).with_detail(EventDetail::Location(href.clone()));
        let listeners = self.target.dispatch_event(&event);
        debug!(event = method.event_name(), href = %href, listeners, "navigation event dispatched");

        let notification = NavigationEvent { method, href };
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for subscriber in subscribers {
            subscriber(&notification);
        }
    }
}

/// Put back entry points in reverse order of wrapping.
fn restore(window: &dyn Window, originals: Vec<(HistoryMethod, HistoryFn)>) {
    for (method, original) in originals.into_iter().rev() {
        if let Err(e) = window.patch_history(method, &|_: HistoryFn| original.clone()) {
            warn!(
                window_id = %window.id(),
                method = method.event_name(),
                error = %e,
                "history entry point not restored"
            );
        }
    }
}

/// Wrap a history entry point. The returned function calls `original` with
/// the same arguments, then dispatches the `method` event through `bridge`,
/// and returns what `original` returned. A failed mutation emits nothing.
pub fn wrap(method: HistoryMethod, original: HistoryFn, bridge: Arc<NavigationBridge>) -> HistoryFn {
    Arc::new(move |call: &HistoryCall| {
        let result = original(call);
        if result.is_ok() {
            bridge.publish(method);
        }
        result
    })
}

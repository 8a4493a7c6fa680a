//! Host page abstraction and a headless implementation.
//!
//! [`Window`] is the narrow surface the tracker needs from a page: a global
//! event target, the current location, and a seam to wrap the two history
//! mutations. [`HeadlessWindow`] implements it with a real session history
//! (URL resolution, back/forward traversal, fragment navigation) so the whole
//! capture pipeline can run outside a browser.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use trackpoint_core::{TrackerError, TrackerResult};

use crate::dom::{DomEvent, Element, EventDetail, EventTarget, RejectedPromise, ScriptError};
use crate::navigation::{HistoryMethod, NavigationBridge};

/// Arguments of a `pushState` / `replaceState` call.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryCall {
    pub state: Value,
    pub url: Option<String>,
}

/// A history entry point as installed on the page.
pub type HistoryFn = Arc<dyn Fn(&HistoryCall) -> TrackerResult<()> + Send + Sync>;

/// What the tracker needs from the page it runs in.
pub trait Window: Send + Sync {
    /// Stable identity of the page, used to install page-wide state once.
    fn id(&self) -> Uuid;

    /// The global event target, or `None` if the host does not expose one.
    fn event_target(&self) -> Option<Arc<EventTarget>>;

    /// Current location as an absolute URL.
    fn location_href(&self) -> String;

    /// Replace the installed `method` entry point with `patch(current)`.
    fn patch_history(
        &self,
        method: HistoryMethod,
        patch: &dyn Fn(HistoryFn) -> HistoryFn,
    ) -> TrackerResult<()>;
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    url: Url,
    state: Value,
}

#[derive(Debug)]
struct SessionHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl SessionHistory {
    fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }
}

/// A page without a renderer: location, session history, and event
/// dispatch.
pub struct HeadlessWindow {
    id: Uuid,
    target: Option<Arc<EventTarget>>,
    session: RwLock<SessionHistory>,
    push_state: RwLock<HistoryFn>,
    replace_state: RwLock<HistoryFn>,
}

impl HeadlessWindow {
    /// A page loaded at `url`.
    pub fn new(url: &str) -> TrackerResult<Arc<Self>> {
        Self::build(url, Some(Arc::new(EventTarget::new())))
    }

    /// A page whose host exposes no global event target.
    pub fn without_event_target(url: &str) -> TrackerResult<Arc<Self>> {
        Self::build(url, None)
    }

    fn build(url: &str, target: Option<Arc<EventTarget>>) -> TrackerResult<Arc<Self>> {
        let start = Url::parse(url)
            .map_err(|e| TrackerError::Config(format!("invalid page url '{url}': {e}")))?;

        Ok(Arc::new_cyclic(|page: &Weak<Self>| Self {
            id: Uuid::new_v4(),
            target,
            session: RwLock::new(SessionHistory {
                entries: vec![HistoryEntry {
                    url: start,
                    state: Value::Null,
                }],
                index: 0,
            }),
            push_state: RwLock::new(native_entry_point(page.clone(), HistoryMethod::PushState)),
            replace_state: RwLock::new(native_entry_point(
                page.clone(),
                HistoryMethod::ReplaceState,
            )),
        }))
    }

    fn entry_point(&self, method: HistoryMethod) -> &RwLock<HistoryFn> {
        match method {
            HistoryMethod::PushState => &self.push_state,
            HistoryMethod::ReplaceState => &self.replace_state,
        }
    }

    /// Call the page's current `history.pushState`.
    pub fn push_state(&self, state: Value, url: Option<&str>) -> TrackerResult<()> {
        self.call_history(HistoryMethod::PushState, state, url)
    }

    /// Call the page's current `history.replaceState`.
    pub fn replace_state(&self, state: Value, url: Option<&str>) -> TrackerResult<()> {
        self.call_history(HistoryMethod::ReplaceState, state, url)
    }

    fn call_history(&self, method: HistoryMethod, state: Value, url: Option<&str>) -> TrackerResult<()> {
        let entry_point = self.entry_point(method).read().clone();
        entry_point(&HistoryCall {
            state,
            url: url.map(str::to_string),
        })
    }

    /// The unwrapped mutation: resolve the URL against the current entry and
    /// push or replace. Cross-origin URLs are refused.
    fn mutate(&self, method: HistoryMethod, call: &HistoryCall) -> TrackerResult<()> {
        let mut session = self.session.write();
        let current = session.current().url.clone();
        let url = match &call.url {
            Some(raw) => current.join(raw).map_err(|e| {
                TrackerError::Host(format!("{}: invalid url '{raw}': {e}", method.event_name()))
            })?,
            None => current.clone(),
        };
        if url.origin() != current.origin() {
            return Err(TrackerError::Host(format!(
                "{}: '{url}' is not same-origin with '{current}'",
                method.event_name()
            )));
        }

        let entry = HistoryEntry {
            url,
            state: call.state.clone(),
        };
        match method {
            HistoryMethod::PushState => session.push(entry),
            HistoryMethod::ReplaceState => {
                let index = session.index;
                session.entries[index] = entry;
            }
        }
        Ok(())
    }

    /// Traverse the session history by `delta` entries. Fires `popstate`,
    /// then `hashchange` when only the fragment changed. Returns `false`
    /// when the target entry does not exist.
    pub fn go(&self, delta: isize) -> bool {
        let (before, after) = {
            let mut session = self.session.write();
            let target = session.index as isize + delta;
            if delta == 0 || target < 0 || target as usize >= session.entries.len() {
                return false;
            }
            let before = session.current().url.clone();
            session.index = target as usize;
            (before, session.current().url.clone())
        };

        debug!(from = %before, to = %after, "history traversal");
        self.dispatch(DomEvent::new("popstate").with_detail(EventDetail::Location(after.to_string())));
        if fragment_only_change(&before, &after) {
            self.dispatch(DomEvent::new("hashchange").with_detail(EventDetail::Location(after.to_string())));
        }
        true
    }

    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Navigate to `#fragment` on the current document, like assigning
    /// `location.hash`. Fires `popstate` then `hashchange`; a no-op when the
    /// fragment is unchanged.
    pub fn set_hash(&self, fragment: &str) -> bool {
        let after = {
            let mut session = self.session.write();
            let mut url = session.current().url.clone();
            let fragment = fragment.trim_start_matches('#');
            url.set_fragment(Some(fragment));
            if url == session.current().url {
                return false;
            }
            session.push(HistoryEntry {
                url: url.clone(),
                state: Value::Null,
            });
            url
        };

        self.dispatch(DomEvent::new("popstate").with_detail(EventDetail::Location(after.to_string())));
        self.dispatch(DomEvent::new("hashchange").with_detail(EventDetail::Location(after.to_string())));
        true
    }

    /// Dispatch a mouse event originating from `element`.
    pub fn mouse(&self, event_type: &str, element: Element) -> usize {
        self.dispatch(DomEvent::new(event_type).with_target(element))
    }

    pub fn click(&self, element: Element) -> usize {
        self.mouse("click", element)
    }

    /// Raise an uncaught script error.
    pub fn throw_error(&self, error: ScriptError) -> usize {
        self.dispatch(DomEvent::new("error").with_detail(EventDetail::ScriptError(error)))
    }

    /// Reject a promise nobody handles. The returned promise shows whether a
    /// listener attached a handler.
    pub fn reject_promise(&self, promise: RejectedPromise) -> RejectedPromise {
        self.dispatch(
            DomEvent::new("unhandledrejection").with_detail(EventDetail::Rejection(promise.clone())),
        );
        promise
    }

    /// State object of the current history entry.
    pub fn state(&self) -> Value {
        self.session.read().current().state.clone()
    }

    pub fn history_len(&self) -> usize {
        self.session.read().entries.len()
    }

    fn dispatch(&self, event: DomEvent) -> usize {
        match &self.target {
            Some(target) => target.dispatch_event(&event),
            None => 0,
        }
    }
}

impl Window for HeadlessWindow {
    fn id(&self) -> Uuid {
        self.id
    }

    fn event_target(&self) -> Option<Arc<EventTarget>> {
        self.target.clone()
    }

    fn location_href(&self) -> String {
        self.session.read().current().url.to_string()
    }

    fn patch_history(
        &self,
        method: HistoryMethod,
        patch: &dyn Fn(HistoryFn) -> HistoryFn,
    ) -> TrackerResult<()> {
        let mut slot = self.entry_point(method).write();
        let current = slot.clone();
        *slot = patch(current);
        Ok(())
    }
}

impl Drop for HeadlessWindow {
    fn drop(&mut self) {
        NavigationBridge::uninstall(self.id);
    }
}

fn native_entry_point(page: Weak<HeadlessWindow>, method: HistoryMethod) -> HistoryFn {
    Arc::new(move |call: &HistoryCall| {
        let page = page
            .upgrade()
            .ok_or_else(|| TrackerError::Host("page has been unloaded".into()))?;
        page.mutate(method, call)
    })
}

fn fragment_only_change(before: &Url, after: &Url) -> bool {
    if before.fragment() == after.fragment() {
        return false;
    }
    let mut a = before.clone();
    let mut b = after.clone();
    a.set_fragment(None);
    b.set_fragment(None);
    a == b
}

//! Scripted sessions — replay a sequence of page interactions against a
//! [`HeadlessWindow`] with a tracker attached.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use trackpoint_core::{Beacon, DiagnosticHook, TrackerOptions, TrackerResult};

use crate::dom::{Element, RejectedPromise, ScriptError};
use crate::host::HeadlessWindow;
use crate::tracker::Tracker;

/// A page to open, the tracker options to use, and the steps to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub url: String,
    #[serde(default)]
    pub options: TrackerOptions,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Step {
    PushState {
        url: String,
        #[serde(default)]
        state: Value,
    },
    ReplaceState {
        url: String,
        #[serde(default)]
        state: Value,
    },
    Back,
    Forward,
    SetHash {
        hash: String,
    },
    Mouse {
        #[serde(default = "default_mouse_event")]
        event: String,
        #[serde(default = "default_tag")]
        tag: String,
        #[serde(default)]
        attributes: HashMap<String, String>,
    },
    ScriptError {
        message: String,
    },
    UnhandledRejection {
        reason: Value,
    },
    SetUserId {
        uuid: Value,
    },
    SetExtra {
        extra: Value,
    },
    Custom {
        payload: Map<String, Value>,
    },
}

fn default_mouse_event() -> String {
    "click".to_string()
}

fn default_tag() -> String {
    "div".to_string()
}

/// Counts from one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
}

impl Scenario {
    pub fn from_json(text: &str) -> TrackerResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Open the page, attach a tracker, and run every step in order. Steps
    /// the page refuses (e.g. a cross-origin `pushState`, or `back` at the
    /// start of history) are skipped and counted.
    pub fn run(
        &self,
        beacon: Arc<dyn Beacon>,
        diagnostics: Option<Arc<dyn DiagnosticHook>>,
    ) -> TrackerResult<ReplaySummary> {
        let page = HeadlessWindow::new(&self.url)?;
        let mut builder = Tracker::builder(self.options.clone()).beacon(beacon);
        if let Some(hook) = diagnostics {
            builder = builder.diagnostics(hook);
        }
        let tracker = builder.install(page.clone())?;

        let mut summary = ReplaySummary::default();
        for (index, step) in self.steps.iter().enumerate() {
            if apply(&page, &tracker, step) {
                summary.applied += 1;
            } else {
                warn!(index, step = ?step, "scenario step skipped");
                summary.skipped += 1;
            }
        }

        info!(
            url = %self.url,
            applied = summary.applied,
            skipped = summary.skipped,
            "scenario replayed"
        );
        Ok(summary)
    }
}

fn apply(page: &HeadlessWindow, tracker: &Tracker, step: &Step) -> bool {
    match step {
        Step::PushState { url, state } => page.push_state(state.clone(), Some(url.as_str())).is_ok(),
        Step::ReplaceState { url, state } => page.replace_state(state.clone(), Some(url.as_str())).is_ok(),
        Step::Back => page.back(),
        Step::Forward => page.forward(),
        Step::SetHash { hash } => page.set_hash(hash),
        Step::Mouse {
            event,
            tag,
            attributes,
        } => {
            page.mouse(event, Element::new(tag.clone()).with_attributes(attributes.clone()));
            true
        }
        Step::ScriptError { message } => {
            page.throw_error(ScriptError::new(message.clone()));
            true
        }
        Step::UnhandledRejection { reason } => {
            page.reject_promise(RejectedPromise::new(reason.clone()));
            true
        }
        Step::SetUserId { uuid } => {
            tracker.set_user_id(uuid.clone());
            true
        }
        Step::SetExtra { extra } => {
            tracker.set_extra(extra);
            true
        }
        Step::Custom { payload } => {
            tracker.send_tracker(payload.clone());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackpoint_core::delivery::capture_beacon;

    const SCENARIO: &str = r#"{
        "url": "https://shop.example.com/",
        "options": {
            "requestUrl": "https://collect.example.com/t",
            "historyTracker": true,
            "domTracker": true,
            "jsError": true
        },
        "steps": [
            { "action": "pushState", "url": "/products" },
            { "action": "mouse", "attributes": { "target-key": "add-to-cart" } },
            { "action": "mouse", "tag": "span" },
            { "action": "setUserId", "uuid": "user-1" },
            { "action": "back" },
            { "action": "back" },
            { "action": "scriptError", "message": "boom" },
            { "action": "custom", "payload": { "event": "checkout", "total": 42 } }
        ]
    }"#;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(scenario.steps.len(), 8);
        assert_eq!(
            scenario.steps[0],
            Step::PushState {
                url: "/products".into(),
                state: Value::Null
            }
        );
        assert!(matches!(&scenario.steps[1], Step::Mouse { event, tag, .. } if event == "click" && tag == "div"));
        assert_eq!(scenario.options.history_tracker, Some(true));
    }

    #[test]
    fn test_replay_reports() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        let beacon = capture_beacon();
        let summary = scenario.run(beacon.clone(), None).unwrap();

        // the second `back` has nowhere to go
        assert_eq!(summary, ReplaySummary { applied: 7, skipped: 1 });

        let envelopes = beacon.envelopes();
        let events: Vec<&str> = envelopes
            .iter()
            .map(|e| e["event"].as_str().unwrap())
            .collect();
        assert_eq!(events, vec!["pushState", "click", "popstate", "error", "checkout"]);
        assert!(envelopes[1].get("uuid").is_none());
        assert_eq!(envelopes[2]["uuid"], "user-1");
        assert_eq!(envelopes[4]["total"], 42);
    }

    #[test]
    fn test_invalid_scenario() {
        assert!(Scenario::from_json(r#"{"steps": []}"#).is_err());
        assert!(Scenario::from_json(r#"{"url": "x", "steps": [{"action": "teleport"}]}"#).is_err());
    }
}

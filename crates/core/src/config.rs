//! Tracker configuration — caller options merged over SDK defaults.
//!
//! [`TrackerOptions`] is what an embedding page hands over at construction;
//! [`TrackerConfig`] is the merged record every report envelope is built
//! from. The feature toggles and the endpoint are frozen once merged; only
//! the user identity and the extra fields can change afterwards, and only
//! through their setters.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{TrackerError, TrackerResult};

/// Version tag stamped on every envelope.
pub const SDK_VERSION: &str = "1.0.0";

/// Keys owned by [`TrackerConfig`]; additional caller keys may not shadow them.
const RESERVED_KEYS: [&str; 8] = [
    "sdkVersion",
    "requestUrl",
    "historyTracker",
    "hashTracker",
    "domTracker",
    "jsError",
    "uuid",
    "extra",
];

/// Caller-supplied construction options. Every field is optional; unknown
/// keys are kept and travel with every envelope.
///
/// The lowercase aliases let the record be loaded from environment
/// variables, which the `config` crate lowercases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerOptions {
    #[serde(default, alias = "requesturl", skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    #[serde(default, alias = "historytracker", skip_serializing_if = "Option::is_none")]
    pub history_tracker: Option<bool>,
    #[serde(default, alias = "hashtracker", skip_serializing_if = "Option::is_none")]
    pub hash_tracker: Option<bool>,
    #[serde(default, alias = "domtracker", skip_serializing_if = "Option::is_none")]
    pub dom_tracker: Option<bool>,
    #[serde(default, alias = "jserror", skip_serializing_if = "Option::is_none")]
    pub js_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TrackerOptions {
    /// Options pointing at `request_url` with every toggle left at its default.
    pub fn new(request_url: impl Into<String>) -> Self {
        Self {
            request_url: Some(request_url.into()),
            ..Default::default()
        }
    }

    pub fn with_history_tracker(mut self, enabled: bool) -> Self {
        self.history_tracker = Some(enabled);
        self
    }

    pub fn with_hash_tracker(mut self, enabled: bool) -> Self {
        self.hash_tracker = Some(enabled);
        self
    }

    pub fn with_dom_tracker(mut self, enabled: bool) -> Self {
        self.dom_tracker = Some(enabled);
        self
    }

    pub fn with_js_error(mut self, enabled: bool) -> Self {
        self.js_error = Some(enabled);
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<Value>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Overlay `other` on top of `self`: every key present in `other` wins.
    pub fn overlay(mut self, other: TrackerOptions) -> Self {
        if other.request_url.is_some() {
            self.request_url = other.request_url;
        }
        if other.history_tracker.is_some() {
            self.history_tracker = other.history_tracker;
        }
        if other.hash_tracker.is_some() {
            self.hash_tracker = other.hash_tracker;
        }
        if other.dom_tracker.is_some() {
            self.dom_tracker = other.dom_tracker;
        }
        if other.js_error.is_some() {
            self.js_error = other.js_error;
        }
        if other.uuid.is_some() {
            self.uuid = other.uuid;
        }
        if other.extra.is_some() {
            self.extra = other.extra;
        }
        self.other.extend(other.other);
        self
    }

    /// Load options from environment variables prefixed `TRACKPOINT__`.
    ///
    /// The `config` crate lowercases environment keys, so only the named
    /// options are taken from there. Caller keys and `extra` come from a
    /// file or from code.
    pub fn load() -> TrackerResult<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TRACKPOINT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| TrackerError::Config(e.to_string()))?;
        let mut options: Self = config
            .try_deserialize()
            .map_err(|e| TrackerError::Config(e.to_string()))?;

        if options.extra.take().is_some() || !options.other.is_empty() {
            debug!(
                keys = ?options.other.keys().collect::<Vec<_>>(),
                "ignoring free-form options from the environment"
            );
            options.other.clear();
        }
        Ok(options)
    }

    /// Load options from a TOML or JSON file (by extension), with
    /// `TRACKPOINT__` environment variables layered on top. Keys in the file
    /// are kept exactly as written.
    pub fn load_from(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("reading {}: {e}", path.display())))?;

        let from_file: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents)
                .map_err(|e| TrackerError::Config(format!("parsing {}: {e}", path.display())))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| TrackerError::Config(format!("parsing {}: {e}", path.display())))?,
        };
        Ok(from_file.overlay(Self::load()?))
    }

    /// Caller keys that name a configuration field. They are dropped when
    /// the configuration is merged.
    pub fn shadowed_keys(&self) -> Vec<&str> {
        self.other
            .keys()
            .map(String::as_str)
            .filter(|key| RESERVED_KEYS.contains(key))
            .collect()
    }
}

/// The merged runtime configuration. Serialises with the wire names
/// (`sdkVersion`, `requestUrl`, ...) so it can be flattened straight into an
/// envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    sdk_version: String,
    request_url: String,
    history_tracker: bool,
    hash_tracker: bool,
    dom_tracker: bool,
    js_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<Value>,
    #[serde(flatten)]
    other: Map<String, Value>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sdk_version: SDK_VERSION.to_string(),
            request_url: String::new(),
            history_tracker: false,
            hash_tracker: false,
            dom_tracker: false,
            js_error: false,
            uuid: None,
            extra: None,
            other: Map::new(),
        }
    }
}

impl TrackerConfig {
    /// Defaults overlaid by every key present in `options`. Nothing is
    /// validated here; a missing endpoint only shows up when reporting.
    /// Caller keys listed by [`TrackerOptions::shadowed_keys`] are dropped.
    pub fn initialize(options: TrackerOptions) -> Self {
        let defaults = Self::default();
        let mut other = options.other;
        other.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));

        Self {
            sdk_version: defaults.sdk_version,
            request_url: options.request_url.unwrap_or(defaults.request_url),
            history_tracker: options.history_tracker.unwrap_or(defaults.history_tracker),
            hash_tracker: options.hash_tracker.unwrap_or(defaults.hash_tracker),
            dom_tracker: options.dom_tracker.unwrap_or(defaults.dom_tracker),
            js_error: options.js_error.unwrap_or(defaults.js_error),
            uuid: options.uuid,
            extra: options.extra,
            other,
        }
    }

    pub fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    pub fn history_tracker(&self) -> bool {
        self.history_tracker
    }

    pub fn hash_tracker(&self) -> bool {
        self.hash_tracker
    }

    pub fn dom_tracker(&self) -> bool {
        self.dom_tracker
    }

    pub fn js_error(&self) -> bool {
        self.js_error
    }

    pub fn uuid(&self) -> Option<&Value> {
        self.uuid.as_ref()
    }

    pub fn extra(&self) -> Option<&Value> {
        self.extra.as_ref()
    }

    /// Additional caller keys carried through from the options.
    pub fn other(&self) -> &Map<String, Value> {
        &self.other
    }

    /// Overwrite the user identity.
    pub fn set_user_id(&mut self, uuid: impl Into<Value>) {
        self.uuid = Some(uuid.into());
    }

    /// Overwrite the extra fields. The previous value is replaced, not merged.
    pub fn set_extra(&mut self, extra: Option<Value>) {
        self.extra = extra;
    }

    /// The configuration as a flat JSON object, keyed by wire names.
    pub fn to_fields(&self) -> TrackerResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(TrackerError::Config(format!(
                "configuration serialised to a non-object value: {other}"
            ))),
        }
    }
}

//! Report envelopes — the merged configuration plus one event payload,
//! serialised as compact UTF-8 JSON for the beacon.

use bytes::Bytes;
use serde::ser::{self, Impossible, Serialize, SerializeMap, SerializeStruct, Serializer};
use serde_json::{Map, Value};

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};

/// Declared content type of every beacon body. The body is JSON, but a
/// form content type keeps cross-origin beacons free of a CORS preflight.
pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// `target` tag of navigation page views.
pub const HISTORY_TARGET: &str = "history-pv";

/// `target` tag of hash-change page views.
pub const HASH_TARGET: &str = "hash-pv";

/// `targetKey` of script-error and promise-rejection reports.
pub const MESSAGE_TARGET_KEY: &str = "message";

/// Event-specific fields of one report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPayload {
    fields: Map<String, Value>,
}

impl ReportPayload {
    /// `{event, target, data?}`: page-view style reports.
    pub fn page_view(event: impl Into<String>, target: impl Into<String>, data: Option<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("event".into(), Value::String(event.into()));
        fields.insert("target".into(), Value::String(target.into()));
        if let Some(data) = data {
            fields.insert("data".into(), data);
        }
        Self { fields }
    }

    /// `{event, targetKey, message?}`: interaction and error reports.
    pub fn interaction(
        event: impl Into<String>,
        target_key: impl Into<String>,
        message: Option<String>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("event".into(), Value::String(event.into()));
        fields.insert("targetKey".into(), Value::String(target_key.into()));
        if let Some(message) = message {
            fields.insert("message".into(), Value::String(message));
        }
        Self { fields }
    }

    /// Build a payload from a serialisable struct or map, one field at a
    /// time. Fields that fail to serialise are left out and returned
    /// alongside the payload. Fails only when the record is not a struct or
    /// map.
    pub fn collect_fields<T: Serialize + ?Sized>(
        value: &T,
    ) -> TrackerResult<(Self, Vec<SkippedField>)> {
        let mut payload = Self::default();
        let mut skipped = Vec::new();
        value
            .serialize(FieldSerializer {
                payload: &mut payload,
                skipped: &mut skipped,
            })
            .map_err(|e| TrackerError::Config(format!("report payload must be a JSON object: {e}")))?;
        Ok((payload, skipped))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Insert a serialisable field. On failure the field is left out and
    /// the error is returned so the caller can report it.
    pub fn insert_serialized<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.fields.insert(key.into(), value);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for ReportPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// A field left out of a payload because it could not be serialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedField {
    pub field: String,
    pub reason: String,
}

fn not_an_object(kind: &str) -> serde_json::Error {
    ser::Error::custom(format!("expected a struct or map, got {kind}"))
}

/// Top-level serializer for [`ReportPayload::collect_fields`]: accepts a
/// struct or map and serialises each field on its own.
struct FieldSerializer<'a> {
    payload: &'a mut ReportPayload,
    skipped: &'a mut Vec<SkippedField>,
}

struct FieldCollector<'a> {
    payload: &'a mut ReportPayload,
    skipped: &'a mut Vec<SkippedField>,
    pending_key: Option<String>,
}

impl<'a> FieldSerializer<'a> {
    fn collector(self) -> FieldCollector<'a> {
        FieldCollector {
            payload: self.payload,
            skipped: self.skipped,
            pending_key: None,
        }
    }
}

type Rejected = Impossible<(), serde_json::Error>;

impl<'a> Serializer for FieldSerializer<'a> {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Rejected;
    type SerializeTuple = Rejected;
    type SerializeTupleStruct = Rejected;
    type SerializeTupleVariant = Rejected;
    type SerializeMap = FieldCollector<'a>;
    type SerializeStruct = FieldCollector<'a>;
    type SerializeStructVariant = Rejected;

    fn serialize_bool(self, _v: bool) -> Result<(), Self::Error> {
        Err(not_an_object("a boolean"))
    }

    fn serialize_i8(self, _v: i8) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_i16(self, _v: i16) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_i32(self, _v: i32) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_i64(self, _v: i64) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_u8(self, _v: u8) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_u16(self, _v: u16) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_u32(self, _v: u32) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_u64(self, _v: u64) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_f32(self, _v: f32) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_f64(self, _v: f64) -> Result<(), Self::Error> {
        Err(not_an_object("a number"))
    }

    fn serialize_char(self, _v: char) -> Result<(), Self::Error> {
        Err(not_an_object("a string"))
    }

    fn serialize_str(self, _v: &str) -> Result<(), Self::Error> {
        Err(not_an_object("a string"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), Self::Error> {
        Err(not_an_object("bytes"))
    }

    fn serialize_none(self) -> Result<(), Self::Error> {
        Err(not_an_object("null"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Self::Error> {
        Err(not_an_object("null"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Self::Error> {
        Err(not_an_object("null"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), Self::Error> {
        Err(not_an_object("a string"))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), Self::Error> {
        Err(not_an_object("an enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(not_an_object("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(not_an_object("a sequence"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(not_an_object("a sequence"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(not_an_object("an enum variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(self.collector())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(self.collector())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(not_an_object("an enum variant"))
    }
}

impl FieldCollector<'_> {
    fn insert<T: ?Sized + Serialize>(&mut self, key: String, value: &T) {
        if let Err(e) = self.payload.insert_serialized(key.clone(), value) {
            self.skipped.push(SkippedField {
                field: key,
                reason: e.to_string(),
            });
        }
    }
}

impl SerializeStruct for FieldCollector<'_> {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.insert(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl SerializeMap for FieldCollector<'_> {
    type Ok = ();
    type Error = serde_json::Error;

    // keys follow serde_json's rules: strings, plus numbers and booleans
    // written as text
    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Self::Error> {
        self.pending_key = match serde_json::to_value(key) {
            Ok(Value::String(key)) => Some(key),
            Ok(Value::Number(key)) => Some(key.to_string()),
            Ok(Value::Bool(key)) => Some(key.to_string()),
            Ok(other) => {
                self.skipped.push(SkippedField {
                    field: other.to_string(),
                    reason: "map key must be a string".into(),
                });
                None
            }
            Err(e) => {
                self.skipped.push(SkippedField {
                    field: "<key>".into(),
                    reason: e.to_string(),
                });
                None
            }
        };
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        if let Some(key) = self.pending_key.take() {
            self.insert(key, value);
        }
        Ok(())
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// One outbound report: configuration fields first, payload fields on top.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Merge `config` with `payload`. Payload keys win on conflict.
    pub fn build(config: &TrackerConfig, payload: &ReportPayload) -> TrackerResult<Self> {
        let mut fields = config.to_fields()?;
        for (key, value) in payload.fields() {
            fields.insert(key.clone(), value.clone());
        }
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Compact JSON bytes for the beacon body.
    pub fn encode(&self) -> TrackerResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(&self.fields)?))
    }
}

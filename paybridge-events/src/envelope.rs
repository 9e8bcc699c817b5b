//! Versioned event envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Spec version assigned when an envelope does not carry one.
pub const DEFAULT_SPEC_VERSION: &str = "1.0";

/// Self-describing wrapper around a domain event.
///
/// Serializes to `{id, type, source, specversion, time, data}`. Envelopes are
/// immutable; completing defaults or migrating produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    id: String,

    #[serde(rename = "type")]
    event_type: String,

    source: String,

    #[serde(default)]
    specversion: String,

    #[serde(default)]
    time: Option<DateTime<Utc>>,

    #[serde(default)]
    data: Map<String, Value>,
}

impl EventEnvelope {
    /// Start building an envelope
    pub fn builder(event_type: impl Into<String>, source: impl Into<String>) -> EnvelopeBuilder {
        EnvelopeBuilder::new(event_type, source)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn specversion(&self) -> &str {
        &self.specversion
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Look up a single data field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Fill in id, time and specversion when absent.
    pub fn with_defaults(mut self) -> Self {
        if self.id.is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
        if self.time.is_none() {
            self.time = Some(Utc::now());
        }
        if self.specversion.is_empty() {
            self.specversion = DEFAULT_SPEC_VERSION.to_string();
        }
        self
    }

    /// Copy of this envelope under another spec version; data is copied
    /// key by key, values are not rewritten.
    pub(crate) fn retargeted(&self, specversion: &str) -> Self {
        Self {
            id: self.id.clone(),
            event_type: self.event_type.clone(),
            source: self.source.clone(),
            specversion: specversion.to_string(),
            time: self.time,
            data: self.data.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Builder for [`EventEnvelope`]
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    envelope: EventEnvelope,
}

impl EnvelopeBuilder {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            envelope: EventEnvelope {
                id: String::new(),
                event_type: event_type.into(),
                source: source.into(),
                specversion: String::new(),
                time: None,
                data: Map::new(),
            },
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.envelope.id = id.into();
        self
    }

    pub fn specversion(mut self, version: impl Into<String>) -> Self {
        self.envelope.specversion = version.into();
        self
    }

    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.envelope.time = Some(time);
        self
    }

    /// Add a data field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.envelope.data.insert(key.into(), value.into());
        self
    }

    /// Replace the whole data payload
    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.envelope.data = data;
        self
    }

    pub fn build(self) -> EventEnvelope {
        self.envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_builder_leaves_defaults_unset() {
        let envelope = EventEnvelope::builder("charge.created", "/payments/charges")
            .field("amount", 5000)
            .build();

        assert_eq!(envelope.id(), "");
        assert_eq!(envelope.specversion(), "");
        assert!(envelope.time().is_none());
        assert_eq!(envelope.get("amount"), Some(&json!(5000)));
    }

    #[test]
    fn test_with_defaults_fills_missing_fields() {
        let envelope = EventEnvelope::builder("charge.created", "/payments/charges")
            .build()
            .with_defaults();

        assert!(Uuid::parse_str(envelope.id()).is_ok());
        assert_eq!(envelope.specversion(), DEFAULT_SPEC_VERSION);
        assert!(envelope.time().is_some());
    }

    #[test]
    fn test_with_defaults_keeps_existing_fields() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let envelope = EventEnvelope::builder("refund.created", "/payments/refunds")
            .id("evt-1")
            .specversion("1.1")
            .time(time)
            .build()
            .with_defaults();

        assert_eq!(envelope.id(), "evt-1");
        assert_eq!(envelope.specversion(), "1.1");
        assert_eq!(envelope.time(), Some(time));
    }

    #[test]
    fn test_wire_field_names() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let envelope = EventEnvelope::builder("customer.created", "/payments/customers")
            .id("evt-2")
            .specversion("1.0")
            .time(time)
            .field("email", "a@example.com")
            .build();

        let value: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, ["data", "id", "source", "specversion", "time", "type"]);
        assert_eq!(value["type"], "customer.created");
        assert_eq!(value["data"]["email"], "a@example.com");

        let parsed = EventEnvelope::from_json(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_retargeted_copies_data() {
        let envelope = EventEnvelope::builder("customer.created", "/payments/customers")
            .id("evt-3")
            .specversion("1.0")
            .field("customer_id", "cus_1")
            .build();

        let migrated = envelope.retargeted("1.1");
        assert_eq!(migrated.specversion(), "1.1");
        assert_eq!(migrated.data(), envelope.data());
        assert_eq!(envelope.specversion(), "1.0");
    }
}

//! Inbound webhook event model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Body of a processor webhook delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub data: Value,
}

impl WebhookEvent {
    pub fn new(id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            created: chrono::Utc::now().timestamp(),
            data: Value::Object(Default::default()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn kind(&self) -> Option<WebhookEventKind> {
        WebhookEventKind::parse(&self.event_type)
    }

    /// The object the event is about, `data.object` when present
    pub fn object(&self) -> &Value {
        match self.data.get("object") {
            Some(object) => object,
            None => &self.data,
        }
    }

    /// Identifier of the object the event is about
    pub fn object_id(&self) -> Option<&str> {
        self.object().get("id").and_then(Value::as_str)
    }

    /// Look up a string field of the event object
    pub fn object_str(&self, field: &str) -> Option<&str> {
        self.object().get(field).and_then(Value::as_str)
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Event types that are routed to a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookEventKind {
    PaymentIntentSucceeded,
    PaymentIntentFailed,
    ChargeSucceeded,
    ChargeFailed,
    ChargeRefunded,
    DisputeCreated,
    DisputeClosed,
}

impl WebhookEventKind {
    pub const ALL: [WebhookEventKind; 7] = [
        WebhookEventKind::PaymentIntentSucceeded,
        WebhookEventKind::PaymentIntentFailed,
        WebhookEventKind::ChargeSucceeded,
        WebhookEventKind::ChargeFailed,
        WebhookEventKind::ChargeRefunded,
        WebhookEventKind::DisputeCreated,
        WebhookEventKind::DisputeClosed,
    ];

    /// Map a wire type to a kind; unknown types yield `None`
    pub fn parse(event_type: &str) -> Option<Self> {
        match event_type {
            "payment_intent.succeeded" => Some(Self::PaymentIntentSucceeded),
            "payment_intent.payment_failed" => Some(Self::PaymentIntentFailed),
            "charge.succeeded" => Some(Self::ChargeSucceeded),
            "charge.failed" => Some(Self::ChargeFailed),
            "charge.refunded" => Some(Self::ChargeRefunded),
            "charge.dispute.created" => Some(Self::DisputeCreated),
            "charge.dispute.closed" => Some(Self::DisputeClosed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentFailed => "payment_intent.payment_failed",
            Self::ChargeSucceeded => "charge.succeeded",
            Self::ChargeFailed => "charge.failed",
            Self::ChargeRefunded => "charge.refunded",
            Self::DisputeCreated => "charge.dispute.created",
            Self::DisputeClosed => "charge.dispute.closed",
        }
    }
}

impl fmt::Display for WebhookEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trip() {
        for kind in WebhookEventKind::ALL {
            assert_eq!(WebhookEventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(WebhookEventKind::parse("invoice.paid"), None);
    }

    #[test]
    fn test_parse_body() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"payment_intent.succeeded","created":1700000000,"data":{}}"#,
        )
        .unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.created, 1_700_000_000);
        assert_eq!(event.kind(), Some(WebhookEventKind::PaymentIntentSucceeded));
        assert_eq!(event.object_id(), None);
    }

    #[test]
    fn test_object_lookup() {
        let nested = WebhookEvent::new("evt_2", "charge.refunded")
            .with_data(json!({"object": {"id": "ch_1", "status": "refunded"}}));
        assert_eq!(nested.object_id(), Some("ch_1"));
        assert_eq!(nested.object_str("status"), Some("refunded"));

        let flat = WebhookEvent::new("evt_3", "charge.failed").with_data(json!({"id": "ch_2"}));
        assert_eq!(flat.object_id(), Some("ch_2"));
    }
}

//! Event schema registry with version migration

use crate::envelope::EventEnvelope;
use crate::error::{EventError, Result};
use crate::validator::EnvelopeValidator;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fields every envelope carries outside of `data`.
pub const STRUCTURAL_FIELDS: [&str; 5] = ["id", "type", "source", "specversion", "time"];

/// Schema for one event type at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchema {
    #[serde(rename = "type")]
    pub event_type: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// May include the structural fields; only the rest are looked up in `data`
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub optional_fields: Vec<String>,
}

impl EventSchema {
    pub fn new(event_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            version: version.into(),
            description: String::new(),
            required_fields: STRUCTURAL_FIELDS.iter().map(|f| f.to_string()).collect(),
            optional_fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add required data fields
    pub fn required<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add optional data fields
    pub fn optional<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Registry key, `type:version`
    pub fn key(&self) -> String {
        schema_key(&self.event_type, &self.version)
    }

    /// Required fields expected inside `data`
    pub fn data_fields(&self) -> impl Iterator<Item = &str> {
        self.required_fields
            .iter()
            .map(String::as_str)
            .filter(|f| !STRUCTURAL_FIELDS.contains(f))
    }
}

fn schema_key(event_type: &str, version: &str) -> String {
    format!("{}:{}", event_type, version)
}

/// Registry of event schemas keyed by `type:version`.
///
/// Registering a version also makes the embedded validator accept it.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: DashMap<String, EventSchema>,
    validator: EnvelopeValidator,
}

impl SchemaRegistry {
    /// Registry preloaded with the payment event schemas
    pub fn new() -> Self {
        let registry = Self::empty();
        for schema in default_schemas() {
            registry.insert(schema);
        }
        registry
    }

    /// Registry without any schemas; the validator still accepts 1.0 and 1.1
    pub fn empty() -> Self {
        Self {
            schemas: DashMap::new(),
            validator: EnvelopeValidator::new(),
        }
    }

    /// Register a schema.
    ///
    /// A schema already stored under the same `type:version` is replaced.
    pub fn register(&self, schema: EventSchema) -> Result<()> {
        if schema.version.trim().is_empty() {
            return Err(EventError::InvalidSchema("schema version is required".into()));
        }
        if schema.event_type.trim().is_empty() {
            return Err(EventError::InvalidSchema("schema type is required".into()));
        }

        let key = schema.key();
        if self.insert(schema).is_some() {
            warn!(schema = %key, "replacing previously registered event schema");
        } else {
            debug!(schema = %key, "registered event schema");
        }
        Ok(())
    }

    fn insert(&self, schema: EventSchema) -> Option<EventSchema> {
        self.validator.add_version(schema.version.clone());
        self.schemas.insert(schema.key(), schema)
    }

    pub fn get(&self, event_type: &str, version: &str) -> Option<EventSchema> {
        self.schemas
            .get(&schema_key(event_type, version))
            .map(|s| s.value().clone())
    }

    pub fn contains(&self, event_type: &str, version: &str) -> bool {
        self.schemas.contains_key(&schema_key(event_type, version))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn validator(&self) -> &EnvelopeValidator {
        &self.validator
    }

    /// Structural validation only
    pub fn validate(&self, envelope: &EventEnvelope) -> Result<()> {
        self.validator.validate(envelope)
    }

    /// Structural validation, then the schema's required data fields.
    pub fn validate_against_version(&self, envelope: &EventEnvelope, version: &str) -> Result<()> {
        self.validator.validate(envelope)?;

        let schema = self
            .get(envelope.event_type(), version)
            .ok_or_else(|| EventError::UnknownSchema {
                event_type: envelope.event_type().to_string(),
                version: version.to_string(),
            })?;

        for field in schema.data_fields() {
            if !envelope.data().contains_key(field) {
                return Err(EventError::schema(
                    field,
                    format!("required field '{}' not found in event data", field),
                ));
            }
        }

        Ok(())
    }

    /// Produce a copy of `envelope` at `target` version.
    ///
    /// The copy must pass validation against the target schema, otherwise
    /// nothing is returned.
    pub fn migrate_to_version(
        &self,
        envelope: &EventEnvelope,
        target: &str,
    ) -> Result<EventEnvelope> {
        if !self.contains(envelope.event_type(), target) {
            return Err(EventError::UnknownSchema {
                event_type: envelope.event_type().to_string(),
                version: target.to_string(),
            });
        }

        let migrated = envelope.retargeted(target);
        self.validate_against_version(&migrated, target)?;

        debug!(
            event_id = %migrated.id(),
            event_type = %migrated.event_type(),
            from = %envelope.specversion(),
            to = %target,
            "migrated event envelope"
        );
        Ok(migrated)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Schemas for the events emitted by the payment service.
pub fn default_schemas() -> Vec<EventSchema> {
    vec![
        EventSchema::new("customer.created", "1.0")
            .description("Customer created event v1.0")
            .optional(["customer_id", "email", "name"]),
        EventSchema::new("customer.created", "1.1")
            .description("Customer created event v1.1 with additional fields")
            .required(["customer_id", "email"])
            .optional(["name", "metadata"]),
        EventSchema::new("charge.created", "1.0")
            .description("Charge created event v1.0")
            .required(["charge_id", "amount", "currency"])
            .optional(["status", "customer_id"]),
        EventSchema::new("refund.created", "1.0")
            .description("Refund created event v1.0")
            .required(["refund_id", "charge_id", "amount"])
            .optional(["currency", "status", "reason"]),
        EventSchema::new("dispute.created", "1.0")
            .description("Dispute created event v1.0")
            .required(["dispute_id", "charge_id", "amount"])
            .optional(["currency", "status", "reason"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn customer(specversion: &str) -> crate::EnvelopeBuilder {
        EventEnvelope::builder("customer.created", "/payments/customers")
            .id("evt_c1")
            .specversion(specversion)
            .time(Utc::now())
    }

    #[test]
    fn test_default_schemas_loaded() {
        let registry = SchemaRegistry::new();
        assert_eq!(registry.len(), 5);
        assert!(registry.contains("customer.created", "1.0"));
        assert!(registry.contains("customer.created", "1.1"));
        assert!(registry.contains("charge.created", "1.0"));
        assert!(SchemaRegistry::empty().is_empty());
    }

    #[test]
    fn test_register_rejects_incomplete_schema() {
        let registry = SchemaRegistry::empty();
        assert!(matches!(
            registry.register(EventSchema::new("charge.created", "")),
            Err(EventError::InvalidSchema(_))
        ));
        assert!(matches!(
            registry.register(EventSchema::new("", "1.0")),
            Err(EventError::InvalidSchema(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_registration_overwrites() {
        let registry = SchemaRegistry::empty();
        registry
            .register(EventSchema::new("charge.created", "1.0").required(["amount"]))
            .unwrap();
        registry
            .register(EventSchema::new("charge.created", "1.0").required(["currency"]))
            .unwrap();

        let schema = registry.get("charge.created", "1.0").unwrap();
        assert_eq!(schema.data_fields().collect::<Vec<_>>(), ["currency"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_extends_accepted_versions() {
        let registry = SchemaRegistry::empty();
        assert!(!registry.validator().accepts_version("2.0"));
        registry
            .register(EventSchema::new("charge.created", "2.0"))
            .unwrap();
        assert!(registry.validator().accepts_version("2.0"));
    }

    #[test]
    fn test_validate_against_version_names_missing_field() {
        let registry = SchemaRegistry::new();
        let envelope = customer("1.1")
            .field("customer_id", "cus_1")
            .field("email", "a@example.com")
            .build();
        assert!(registry.validate_against_version(&envelope, "1.1").is_ok());

        let envelope = customer("1.1").field("customer_id", "cus_1").build();
        let err = registry.validate_against_version(&envelope, "1.1").unwrap_err();
        assert_eq!(err.field(), Some("email"));
    }

    #[test]
    fn test_each_missing_data_field_is_named() {
        let registry = SchemaRegistry::new();
        let mut checked = 0;

        for schema in default_schemas() {
            let fields: Vec<&str> = schema.data_fields().collect();
            let envelope_without = |missing: Option<&str>| {
                fields
                    .iter()
                    .filter(|f| Some(**f) != missing)
                    .fold(
                        EventEnvelope::builder(schema.event_type.as_str(), "/payments/test")
                            .id("evt_s1")
                            .specversion(schema.version.as_str())
                            .time(Utc::now()),
                        |builder, f| builder.field(*f, "x"),
                    )
                    .build()
            };

            let complete = envelope_without(None);
            assert!(registry.validate_against_version(&complete, &schema.version).is_ok());

            for missing in &fields {
                let envelope = envelope_without(Some(*missing));
                let err = registry
                    .validate_against_version(&envelope, &schema.version)
                    .unwrap_err();
                assert_eq!(err.field(), Some(*missing), "{}", schema.key());
                checked += 1;
            }
        }

        assert_eq!(checked, 11);
    }

    #[test]
    fn test_validate_against_unknown_version() {
        let registry = SchemaRegistry::new();
        let envelope = customer("1.0").build();
        assert!(matches!(
            registry.validate_against_version(&envelope, "9.9"),
            Err(EventError::UnknownSchema { .. })
        ));
    }

    #[test]
    fn test_basic_validation_runs_first() {
        let registry = SchemaRegistry::new();
        let envelope = EventEnvelope::builder("customer.created", "/payments/customers")
            .specversion("1.0")
            .time(Utc::now())
            .build();
        let err = registry.validate_against_version(&envelope, "1.0").unwrap_err();
        assert_eq!(err.field(), Some("id"));
    }

    #[test]
    fn test_migrate_identity_keeps_data() {
        let registry = SchemaRegistry::new();
        let envelope = customer("1.0").field("name", "Ada").build();

        let migrated = registry.migrate_to_version(&envelope, "1.0").unwrap();
        assert_eq!(migrated.data(), envelope.data());
        assert_eq!(migrated.id(), envelope.id());
        assert_eq!(migrated.time(), envelope.time());
        assert_eq!(migrated.source(), envelope.source());
    }

    #[test]
    fn test_migrate_up_requires_target_fields() {
        let registry = SchemaRegistry::new();

        let incomplete = customer("1.0").field("name", "Ada").build();
        let err = registry.migrate_to_version(&incomplete, "1.1").unwrap_err();
        assert_eq!(err.field(), Some("customer_id"));

        let complete = customer("1.0")
            .field("customer_id", "cus_1")
            .field("email", "ada@example.com")
            .build();
        let migrated = registry.migrate_to_version(&complete, "1.1").unwrap();
        assert_eq!(migrated.specversion(), "1.1");
        assert_eq!(complete.specversion(), "1.0");
        assert!(registry.validate_against_version(&migrated, "1.1").is_ok());
    }

    #[test]
    fn test_migrate_to_unknown_target() {
        let registry = SchemaRegistry::new();
        let envelope = customer("1.0").build();
        assert!(matches!(
            registry.migrate_to_version(&envelope, "3.0"),
            Err(EventError::UnknownSchema { .. })
        ));
    }
}

// Typed settings tree

use crate::{ConfigValidator, Result, Validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Top-level PayBridge settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gateway: GatewaySettings,
    pub webhooks: WebhookSettings,
    pub events: EventSettings,
}

/// Which payment provider to use and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Registered provider name, e.g. `stripe`
    pub provider: String,
    /// Provider-specific options handed to the provider constructor
    pub options: BTreeMap<String, Value>,
    /// Upper bound for a single provider call
    pub timeout_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            provider: "stripe".to_string(),
            options: BTreeMap::new(),
            timeout_ms: 30_000,
        }
    }
}

impl GatewaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Inbound webhook verification.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Shared HMAC secret
    pub secret: String,
    /// Accepted clock skew for the signed timestamp
    pub tolerance_secs: u64,
    /// How long a delivered webhook id is remembered
    pub dedup_ttl_secs: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            tolerance_secs: 300,
            dedup_ttl_secs: 86_400,
        }
    }
}

impl fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("secret", &"[REDACTED]")
            .field("tolerance_secs", &self.tolerance_secs)
            .field("dedup_ttl_secs", &self.dedup_ttl_secs)
            .finish()
    }
}

impl WebhookSettings {
    pub fn tolerance(&self) -> Duration {
        Duration::from_secs(self.tolerance_secs)
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_secs)
    }
}

/// Outbound domain events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    pub topic: String,
    pub publish_timeout_ms: u64,
    /// Broker addresses; empty means the in-process publisher
    pub brokers: Vec<String>,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            topic: "payment-events".to_string(),
            publish_timeout_ms: 5_000,
            brokers: Vec::new(),
        }
    }
}

impl EventSettings {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.gateway.provider, "gateway.provider")?;
        ConfigValidator::positive(self.gateway.timeout_ms, "gateway.timeout_ms")?;
        ConfigValidator::positive(self.webhooks.tolerance_secs, "webhooks.tolerance_secs")?;
        ConfigValidator::positive(self.webhooks.dedup_ttl_secs, "webhooks.dedup_ttl_secs")?;
        ConfigValidator::not_empty(&self.events.topic, "events.topic")?;
        ConfigValidator::positive(self.events.publish_timeout_ms, "events.publish_timeout_ms")?;
        ConfigValidator::no_empty_entries(&self.events.brokers, "events.brokers")?;
        Ok(())
    }
}

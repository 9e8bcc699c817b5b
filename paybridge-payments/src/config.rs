//! Opaque provider configuration bag

use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key/value options handed to a provider constructor.
///
/// Constructors validate the bag synchronously and fail with
/// [`PaymentError::Config`] when a key is missing or malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderConfig {
    values: BTreeMap<String, Value>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value; numbers and booleans are stringified, empty strings are `None`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Like [`get_str`](Self::get_str) but missing is a config error naming the provider
    pub fn require_str(&self, provider: &str, key: &str) -> PaymentResult<String> {
        self.get_str(key)
            .ok_or_else(|| PaymentError::Config(format!("{} {} is required", provider, key)))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        }
    }

    /// Integer value, accepting numeric strings
    pub fn get_i64(&self, key: &str) -> PaymentResult<Option<i64>> {
        let Some(value) = self.values.get(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| PaymentError::Config(format!("{} must be an integer", key)))
    }

    /// List of strings; a comma-separated string is split
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        match self.values.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for ProviderConfig {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ProviderConfig {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// `environment` option shared by Paddle and Square
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn from_config(provider: &str, config: &ProviderConfig) -> PaymentResult<Self> {
        let value = config.require_str(provider, "environment")?;
        match value.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            _ => Err(PaymentError::Config(format!(
                "{} environment must be 'sandbox' or 'production'",
                provider
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_str() {
        let config = ProviderConfig::new()
            .set("api_key", "sk_test_1")
            .set("vendor_id", 12345)
            .set("blank", "  ");
        assert_eq!(config.get_str("api_key").as_deref(), Some("sk_test_1"));
        assert_eq!(config.get_str("vendor_id").as_deref(), Some("12345"));
        assert_eq!(config.get_str("blank"), None);
        assert_eq!(config.get_str("missing"), None);
    }

    #[test]
    fn test_require_str() {
        let config = ProviderConfig::new();
        let err = config.require_str("stripe", "api_key").unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: stripe api_key is required");
    }

    #[test]
    fn test_get_bool_and_i64() {
        let config = ProviderConfig::new()
            .set("live", "yes")
            .set("max", "100000")
            .set("bad", json!({"x": 1}));
        assert_eq!(config.get_bool("live"), Some(true));
        assert_eq!(config.get_i64("max").unwrap(), Some(100000));
        assert_eq!(config.get_i64("missing").unwrap(), None);
        assert!(config.get_i64("bad").is_err());
    }

    #[test]
    fn test_get_list() {
        let config = ProviderConfig::new()
            .set("a", json!(["usd", "eur"]))
            .set("b", "usd, gbp,");
        assert_eq!(config.get_list("a").unwrap(), vec!["usd", "eur"]);
        assert_eq!(config.get_list("b").unwrap(), vec!["usd", "gbp"]);
    }

    #[test]
    fn test_environment() {
        let ok = ProviderConfig::new().set("environment", "Sandbox");
        assert_eq!(Environment::from_config("paddle", &ok).unwrap(), Environment::Sandbox);

        let bad = ProviderConfig::new().set("environment", "staging");
        assert!(matches!(
            Environment::from_config("paddle", &bad),
            Err(PaymentError::Config(_))
        ));
    }
}

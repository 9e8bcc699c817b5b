// Settings management for PayBridge

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat, merge_values};
pub use settings::{EventSettings, GatewaySettings, Settings, WebhookSettings};
pub use validation::{ConfigValidator, Validate};

use serde_json::Value;
use std::path::PathBuf;

/// Where environment variables come from.
enum EnvSource {
    Process,
    Explicit(Vec<(String, String)>),
    Disabled,
}

/// Builds [`Settings`] from layered sources.
///
/// Layers, later overriding earlier: defaults, settings files in the order
/// added, `.env`, then `PAYBRIDGE_*` environment variables.
pub struct SettingsLoader {
    files: Vec<PathBuf>,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    env_loader: EnvLoader,
    env_source: EnvSource,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            load_dotenv: false,
            dotenv_path: None,
            env_loader: EnvLoader::default(),
            env_source: EnvSource::Process,
        }
    }

    /// Set environment variable prefix (default `PAYBRIDGE`)
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_loader = EnvLoader::new(prefix);
        self
    }

    /// Add a `.json` or `.toml` settings file
    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Enable loading from a `.env` file; `None` searches the usual places
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Read variables from the given list instead of the process environment
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_source = EnvSource::Explicit(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Skip the environment layer entirely
    pub fn without_env(mut self) -> Self {
        self.env_source = EnvSource::Disabled;
        self
    }

    /// Merge all layers, deserialize and validate
    pub fn load(self) -> Result<Settings> {
        let mut tree = serde_json::to_value(Settings::default())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        for path in &self.files {
            let layer = ConfigLoader::auto(path)?.load_file(path)?;
            merge_values(&mut tree, layer);
        }

        if self.load_dotenv {
            match &self.dotenv_path {
                Some(path) => {
                    dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
                }
                None => {
                    // A missing .env is fine
                    dotenvy::dotenv().ok();
                }
            }
        }

        let env_layer = match &self.env_source {
            EnvSource::Process => Some(self.env_loader.load()),
            EnvSource::Explicit(vars) => Some(self.env_loader.load_from(vars.iter().cloned())),
            EnvSource::Disabled => None,
        };
        if let Some(layer) = env_layer {
            merge_values(&mut tree, layer);
        }

        settings_from_value(tree)
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize and validate an already merged settings tree.
pub fn settings_from_value(tree: Value) -> Result<Settings> {
    let settings: Settings = serde_json::from_value(tree)
        .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_only() {
        let settings = SettingsLoader::new().without_env().load().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_env_overrides() {
        let settings = SettingsLoader::new()
            .with_vars([
                ("PAYBRIDGE_GATEWAY__PROVIDER", "memory"),
                ("PAYBRIDGE_GATEWAY__OPTIONS__MAX_PAYMENT_AMOUNT", "100000"),
                ("PAYBRIDGE_EVENTS__PUBLISH_TIMEOUT_MS", "250"),
            ])
            .load()
            .unwrap();

        assert_eq!(settings.gateway.provider, "memory");
        assert_eq!(
            settings.gateway.options.get("max_payment_amount"),
            Some(&Value::from(100000u64))
        );
        assert_eq!(settings.events.publish_timeout_ms, 250);
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        let result = SettingsLoader::new()
            .with_vars([("PAYBRIDGE_WEBHOOKS__TOLERANCE_SECS", "soon")])
            .load();
        assert!(matches!(result, Err(ConfigError::DeserializationError(_))));
    }

    #[test]
    fn test_validation_runs_after_merge() {
        let result = SettingsLoader::new()
            .with_vars([("PAYBRIDGE_EVENTS__TOPIC", "")])
            .load();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = SettingsLoader::new()
            .without_env()
            .add_file("/definitely/not/here/paybridge.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}

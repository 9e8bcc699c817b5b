//! PayBridge Logging
//!
//! Installs a `tracing` subscriber configured from `PAYBRIDGE_*` environment
//! variables. Library crates in the workspace log through the `tracing`
//! macros; this crate only decides where those events go and how they look.
//!
//! # Environment Variables
//!
//! - `PAYBRIDGE_DEBUG=1` - Raise the level to at least `debug`
//! - `PAYBRIDGE_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `PAYBRIDGE_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `PAYBRIDGE_LOG_COLOR=1|0` - Enable/disable ANSI colors
//! - `RUST_LOG` - Full `EnvFilter` directive, overrides the level
//!
//! # Usage
//!
//! ```rust,no_run
//! paybridge_log::init();
//! tracing::info!(provider = "stripe", "gateway ready");
//! ```

use once_cell::sync::OnceCell;
use std::env;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level emitted by the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Single-line human readable output
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether ANSI colors are enabled
    pub color: bool,
    /// Whether to print the event target (module path)
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Json,
            color: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("PAYBRIDGE_DEBUG").unwrap_or(false);

        let mut level = lookup("PAYBRIDGE_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(Level::Info);
        if debug && level > Level::Debug {
            level = Level::Debug;
        }

        let format = lookup("PAYBRIDGE_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        // JSON lines never carry escape codes unless asked for explicitly
        let color = flag("PAYBRIDGE_LOG_COLOR")
            .unwrap_or(format != Format::Json && lookup("NO_COLOR").is_none());

        let with_target = flag("PAYBRIDGE_LOG_TARGET").unwrap_or(true);

        Self {
            level,
            format,
            color,
            with_target,
        }
    }
}

// ============================================================================
// Installation
// ============================================================================

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Install the global subscriber from the environment.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    let config = LogConfig::from_env();
    if let Err(err) = try_init(&config) {
        tracing::debug!(error = %err, "logging already initialized");
    }
}

/// Install the global subscriber with an explicit configuration.
pub fn try_init(config: &LogConfig) -> Result<(), LogError> {
    if INSTALLED.get().is_some() {
        return Err(LogError::AlreadyInstalled(
            "paybridge-log initialized earlier".to_string(),
        ));
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.color)
        .with_target(config.with_target)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        Format::Json => builder.json().try_init(),
        Format::Compact => builder.compact().try_init(),
        Format::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| LogError::AlreadyInstalled(e.to_string()))?;

    let _ = INSTALLED.set(config.clone());
    Ok(())
}

/// The configuration the subscriber was installed with, if any.
pub fn installed_config() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("Compact"), Some(Format::Compact));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_defaults_without_env() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.format, Format::Json);
        assert!(!config.color);
    }

    #[test]
    fn test_debug_flag_raises_level() {
        let config = LogConfig::from_lookup(lookup(&[
            ("PAYBRIDGE_DEBUG", "true"),
            ("PAYBRIDGE_LOG_LEVEL", "error"),
        ]));
        assert_eq!(config.level, Level::Debug);

        let config = LogConfig::from_lookup(lookup(&[
            ("PAYBRIDGE_DEBUG", "1"),
            ("PAYBRIDGE_LOG_LEVEL", "trace"),
        ]));
        assert_eq!(config.level, Level::Trace);
    }

    #[test]
    fn test_pretty_format_enables_color() {
        let config = LogConfig::from_lookup(lookup(&[("PAYBRIDGE_LOG_FORMAT", "pretty")]));
        assert_eq!(config.format, Format::Pretty);
        assert!(config.color);

        let config = LogConfig::from_lookup(lookup(&[
            ("PAYBRIDGE_LOG_FORMAT", "pretty"),
            ("NO_COLOR", "1"),
        ]));
        assert!(!config.color);
    }

    #[test]
    fn test_second_install_is_rejected() {
        let config = LogConfig {
            level: Level::Off,
            ..LogConfig::default()
        };
        let first = try_init(&config);
        let second = try_init(&config);
        // Another test binary may own the global subscriber already
        assert!(first.is_ok() || second.is_err());
        assert!(second.is_err());
    }
}

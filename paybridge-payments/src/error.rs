//! Error types for payment operations

use std::time::Duration;
use thiserror::Error;

/// Payment error types
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Missing or malformed provider configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No constructor registered under this provider name
    #[error("Unsupported payment provider: {0}")]
    UnsupportedProvider(String),

    /// Request violates the active gateway's capabilities
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider does not offer this operation
    #[error("{provider} does not support {feature}")]
    NotSupported { provider: String, feature: String },

    /// Provider rejected the call
    #[error("{provider} error: {message}")]
    Upstream { provider: String, message: String },

    /// Resource not found upstream
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Adapter call exceeded its deadline
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),
}

impl PaymentError {
    pub fn not_supported(provider: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::NotSupported {
            provider: provider.into(),
            feature: feature.into(),
        }
    }

    pub fn upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Whether the caller rejected the request before any provider call
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotSupported { .. })
    }

    /// Attach provider context to errors that came back without it
    pub fn with_provider(self, provider: &str) -> Self {
        match self {
            Self::Network(message) | Self::Serialization(message) => Self::Upstream {
                provider: provider.to_string(),
                message,
            },
            other => other,
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

//! Error types for the event pipeline

use std::time::Duration;
use thiserror::Error;

/// Event pipeline errors
#[derive(Debug, Error)]
pub enum EventError {
    /// Envelope failed structural or schema validation
    #[error("invalid event field '{field}': {message}")]
    Schema { field: String, message: String },

    #[error("schema version {version} for type {event_type} not found")]
    UnknownSchema { event_type: String, version: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("dead letter queue: {0}")]
    DeadLetter(String),

    #[error("event {0} not found")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventError {
    pub fn schema(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field name for schema errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Schema { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EventError>;

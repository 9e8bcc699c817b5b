//! Error types for webhook ingestion

use crate::ingest::WebhookState;
use thiserror::Error;

/// Reasons a webhook delivery is rejected
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Request body was empty
    #[error("Webhook body is empty")]
    EmptyBody,

    /// Signature header missing or empty
    #[error("Signature missing from request")]
    MissingSignature,

    /// Signature header present but not `t=<unix>,v1=<hex>`
    #[error("Malformed signature header: {0}")]
    MalformedSignature(String),

    /// No `v1` signature matched the payload
    #[error("Signature verification failed")]
    SignatureMismatch,

    /// Signed timestamp is outside the accepted window
    #[error("Timestamp outside tolerance: {age_secs} seconds (tolerance: {tolerance_secs} seconds)")]
    TimestampOutOfTolerance { age_secs: u64, tolerance_secs: u64 },

    /// Body is not a webhook event
    #[error("Payload error: {0}")]
    Payload(String),

    /// Another delivery of this id is still being handled
    #[error("Delivery {0} is already being handled")]
    InProgress(String),

    /// A handler failed; the sender should redeliver
    #[error("Handler for {event_type} failed: {message}")]
    Handler { event_type: String, message: String },

    /// Receiver misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WebhookError {
    /// HTTP status to answer the sender with
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::Handler { .. } | WebhookError::Config(_) => 500,
            WebhookError::InProgress(_) => 409,
            _ => 400,
        }
    }

    /// Last state reached before the delivery was rejected
    pub fn rejected_at(&self) -> WebhookState {
        match self {
            WebhookError::Payload(_) => WebhookState::SignatureVerified,
            WebhookError::InProgress(_) => WebhookState::Parsed,
            WebhookError::Handler { .. } => WebhookState::Routed,
            _ => WebhookState::Received,
        }
    }

    /// Whether the failure is an authentication failure
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::MalformedSignature(_)
                | WebhookError::SignatureMismatch
                | WebhookError::TimestampOutOfTolerance { .. }
        )
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::Payload(err.to_string())
    }
}

/// Error returned by a webhook handler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError(message.to_string())
    }
}

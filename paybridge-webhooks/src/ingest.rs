//! Webhook ingestion state machine
//!
//! ```text
//! Received ──► SignatureVerified ──► Parsed ──► Routed ──► Handled
//!    │                 │                          │
//!    └─────────────────┴──────► Rejected ◄────────┘
//! ```

use crate::error::WebhookError;
use crate::event::WebhookEvent;
use crate::handler::{WebhookHandlers, dispatch};
use crate::idempotency::{Claim, SeenSet};
use crate::signature::WebhookSignature;
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default accepted clock skew for signed timestamps
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Default time a handled delivery id is remembered
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Ingestion states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookState {
    Received,
    SignatureVerified,
    Parsed,
    Routed,
    Handled,
    Rejected,
}

impl fmt::Display for WebhookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WebhookState::Received => "received",
            WebhookState::SignatureVerified => "signature_verified",
            WebhookState::Parsed => "parsed",
            WebhookState::Routed => "routed",
            WebhookState::Handled => "handled",
            WebhookState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Result of an accepted delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookReceipt {
    pub event_id: String,
    pub event_type: String,
    /// `Handled` when a handler ran or the delivery was a duplicate,
    /// `Routed` for event types without a handler
    pub state: WebhookState,
    /// Whether a handler was invoked for this delivery
    pub dispatched: bool,
    /// Whether the id had already been handled
    pub duplicate: bool,
}

impl WebhookReceipt {
    pub fn status_code(&self) -> u16 {
        200
    }
}

/// Verifies, parses, deduplicates and routes webhook deliveries.
pub struct WebhookIngestor {
    verifier: WebhookSignature,
    tolerance: Duration,
    handlers: Arc<dyn WebhookHandlers>,
    seen: SeenSet,
}

impl WebhookIngestor {
    pub fn new(secret: impl Into<String>, handlers: Arc<dyn WebhookHandlers>) -> Self {
        Self {
            verifier: WebhookSignature::new(secret),
            tolerance: DEFAULT_TOLERANCE,
            handlers,
            seen: SeenSet::new(DEFAULT_DEDUP_TTL),
        }
    }

    /// Set the timestamp tolerance
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set how long handled ids are remembered
    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.seen = SeenSet::new(ttl);
        self
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Ingest one delivery using the current time
    pub async fn ingest(&self, body: &[u8], signature_header: &str) -> Result<WebhookReceipt> {
        self.ingest_at(body, signature_header, chrono::Utc::now().timestamp())
            .await
    }

    /// Ingest one delivery as of `now` (unix seconds)
    pub async fn ingest_at(
        &self,
        body: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<WebhookReceipt> {
        let result = self.run(body, signature_header, now).await;
        if let Err(err) = &result {
            warn!(
                rejected_at = %err.rejected_at(),
                status = err.status_code(),
                error = %err,
                "webhook rejected"
            );
        }
        result
    }

    async fn run(&self, body: &[u8], signature_header: &str, now: i64) -> Result<WebhookReceipt> {
        // Received
        if body.is_empty() {
            return Err(WebhookError::EmptyBody);
        }
        if signature_header.trim().is_empty() {
            return Err(WebhookError::MissingSignature);
        }

        // SignatureVerified
        self.verifier
            .verify_at(body, signature_header, self.tolerance, now)?;

        // Parsed
        let event: WebhookEvent = serde_json::from_slice(body)?;
        if event.id.trim().is_empty() {
            return Err(WebhookError::Payload("event id is required".to_string()));
        }
        if event.event_type.trim().is_empty() {
            return Err(WebhookError::Payload("event type is required".to_string()));
        }
        debug!(event_id = %event.id, event_type = %event.event_type, "webhook parsed");

        match self.seen.claim(&event.id) {
            Claim::Claimed => {}
            Claim::Duplicate => {
                info!(event_id = %event.id, "duplicate webhook delivery ignored");
                return Ok(WebhookReceipt {
                    event_id: event.id,
                    event_type: event.event_type,
                    state: WebhookState::Handled,
                    dispatched: false,
                    duplicate: true,
                });
            }
            Claim::InFlight => return Err(WebhookError::InProgress(event.id)),
        }

        // Routed
        let Some(kind) = event.kind() else {
            self.seen.release(&event.id);
            info!(event_type = %event.event_type, "unhandled webhook event type");
            return Ok(WebhookReceipt {
                event_id: event.id,
                event_type: event.event_type,
                state: WebhookState::Routed,
                dispatched: false,
                duplicate: false,
            });
        };

        // Handled
        if let Err(e) = dispatch(self.handlers.as_ref(), kind, &event).await {
            self.seen.release(&event.id);
            return Err(WebhookError::Handler {
                event_type: event.event_type,
                message: e.to_string(),
            });
        }

        self.seen.complete(&event.id);
        info!(event_id = %event.id, event_type = %event.event_type, "webhook handled");

        Ok(WebhookReceipt {
            event_id: event.id,
            event_type: event.event_type,
            state: WebhookState::Handled,
            dispatched: true,
            duplicate: false,
        })
    }
}

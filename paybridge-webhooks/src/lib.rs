//! Payment webhook ingestion for PayBridge
//!
//! Authenticates signed notifications pushed by a payment processor and
//! routes them to idempotent handlers.
//!
//! # Features
//!
//! - **Signature Verification**: HMAC-SHA256 over `"<t>.<body>"`, constant-time
//! - **Replay Protection**: signed timestamps outside the tolerance are rejected
//! - **Routing**: a fixed set of payment event kinds; unknown types are accepted
//! - **Idempotency**: handled delivery ids are remembered for a while
//!
//! # Example
//!
//! ```rust,no_run
//! use paybridge_webhooks::{NoopHandlers, WebhookIngestor};
//! use std::sync::Arc;
//!
//! # async fn run(body: &[u8], header: &str) {
//! let ingestor = WebhookIngestor::new("whsec_...", Arc::new(NoopHandlers));
//!
//! let status = match ingestor.ingest(body, header).await {
//!     Ok(receipt) => receipt.status_code(),
//!     Err(err) => err.status_code(),
//! };
//! # }
//! ```

mod error;
mod event;
mod handler;
mod idempotency;
mod ingest;
mod signature;

pub use error::{HandlerError, WebhookError};
pub use event::{WebhookEvent, WebhookEventKind};
pub use handler::{HandlerResult, NoopHandlers, WebhookHandlers, dispatch};
pub use idempotency::{Claim, SeenSet};
pub use ingest::{
    DEFAULT_DEDUP_TTL, DEFAULT_TOLERANCE, WebhookIngestor, WebhookReceipt, WebhookState,
};
pub use signature::{SignatureHeader, WebhookSignature, headers};

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;

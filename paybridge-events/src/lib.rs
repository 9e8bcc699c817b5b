//! Payment event pipeline for PayBridge
//!
//! Versioned event envelopes, a schema registry with migration, publishers,
//! a dead-letter queue and a replay store.
//!
//! ## Features
//!
//! - **Envelopes** - `{id, type, source, specversion, time, data}` with defaults
//! - **Schema registry** - `type:version` schemas, validation and migration
//! - **Publishers** - in-memory publisher, Kafka publisher behind `kafka`
//! - **Dead-letter queue** - failed deliveries kept for retry
//! - **Replay store** - published envelopes by time range or type
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paybridge_events::*;
//! use std::sync::Arc;
//!
//! let publisher = Arc::new(InMemoryPublisher::new());
//! let pipeline = EventPipeline::new(publisher.clone());
//!
//! let envelope = EventEnvelope::builder("charge.created", "/payments/charges")
//!     .field("charge_id", "ch_123")
//!     .field("amount", 5000)
//!     .field("currency", "usd")
//!     .build();
//!
//! match pipeline.publish("payment-events", envelope).await? {
//!     PublishOutcome::Published { sequence, .. } => println!("stored as #{sequence}"),
//!     PublishOutcome::DeadLettered { reason, .. } => println!("queued: {reason}"),
//! }
//! ```

pub mod dlq;
pub mod envelope;
pub mod error;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod pipeline;
pub mod publisher;
pub mod replay;
pub mod schema;
pub mod validator;

pub use dlq::{DeadLetterEntry, DeadLetterQueue, DeadLetterStatistics};
pub use envelope::{DEFAULT_SPEC_VERSION, EnvelopeBuilder, EventEnvelope};
pub use error::{EventError, Result};
#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;
pub use pipeline::{EventPipeline, PublishOutcome};
pub use publisher::{EventPublisher, InMemoryPublisher, PublishedEvent};
pub use replay::{ReplayStatistics, ReplayStore, StoredEvent};
pub use schema::{EventSchema, STRUCTURAL_FIELDS, SchemaRegistry, default_schemas};
pub use validator::EnvelopeValidator;

/// Topic payment events are published to by default.
pub const DEFAULT_TOPIC: &str = "payment-events";

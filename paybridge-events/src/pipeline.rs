//! Reliable publishing: validate, publish, then record or dead-letter

use crate::dlq::DeadLetterQueue;
use crate::envelope::EventEnvelope;
use crate::error::{EventError, Result};
use crate::publisher::EventPublisher;
use crate::replay::ReplayStore;
use crate::schema::SchemaRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// What happened to an envelope handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Delivered and stored for replay under `sequence`
    Published { event_id: String, sequence: u64 },
    /// Delivery failed; the envelope waits in the dead-letter queue
    DeadLettered { event_id: String, reason: String },
}

impl PublishOutcome {
    pub fn event_id(&self) -> &str {
        match self {
            Self::Published { event_id, .. } | Self::DeadLettered { event_id, .. } => event_id,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Composes a publisher with the dead-letter queue and replay store.
///
/// Schema failures are returned as errors and never dead-lettered; any
/// delivery failure, including a timeout, lands in the dead-letter queue.
#[derive(Clone)]
pub struct EventPipeline {
    publisher: Arc<dyn EventPublisher>,
    schemas: Arc<SchemaRegistry>,
    dead_letters: Arc<DeadLetterQueue>,
    replay: Arc<ReplayStore>,
    publish_timeout: Duration,
}

impl EventPipeline {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher,
            schemas: Arc::new(SchemaRegistry::new()),
            dead_letters: Arc::new(DeadLetterQueue::new()),
            replay: Arc::new(ReplayStore::new()),
            publish_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_schemas(mut self, schemas: Arc<SchemaRegistry>) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_dead_letter_queue(mut self, dead_letters: Arc<DeadLetterQueue>) -> Self {
        self.dead_letters = dead_letters;
        self
    }

    pub fn with_replay_store(mut self, replay: Arc<ReplayStore>) -> Self {
        self.replay = replay;
        self
    }

    pub fn with_timeout(mut self, publish_timeout: Duration) -> Self {
        self.publish_timeout = publish_timeout;
        self
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    pub fn dead_letters(&self) -> &Arc<DeadLetterQueue> {
        &self.dead_letters
    }

    pub fn replay_store(&self) -> &Arc<ReplayStore> {
        &self.replay
    }

    /// Complete defaults, validate, and publish one envelope.
    pub async fn publish(&self, topic: &str, envelope: EventEnvelope) -> Result<PublishOutcome> {
        let envelope = envelope.with_defaults();
        self.check(&envelope)?;

        match self.deliver(topic, &envelope).await {
            Ok(()) => Ok(self.record(envelope)),
            Err(err) => {
                let reason = err.to_string();
                let event_id = envelope.id().to_string();
                error!(
                    topic = topic,
                    event_id = %event_id,
                    error = %reason,
                    "event publish failed"
                );
                self.dead_letters
                    .send_to_dead_letter_queue(envelope, reason.clone())?;
                Ok(PublishOutcome::DeadLettered { event_id, reason })
            }
        }
    }

    /// Take one entry out of the dead-letter queue and publish it again.
    ///
    /// On failure the entry goes back to the queue with its retry count.
    pub async fn retry_dead_letter(&self, topic: &str, event_id: &str) -> Result<PublishOutcome> {
        let entry = self.dead_letters.take_for_retry(event_id)?;

        match self.deliver(topic, &entry.event).await {
            Ok(()) => Ok(self.record(entry.event)),
            Err(err) => {
                let reason = err.to_string();
                error!(
                    topic = topic,
                    event_id = %event_id,
                    retry_count = entry.retry_count,
                    error = %reason,
                    "dead letter retry failed"
                );
                self.dead_letters.requeue(entry, reason.clone())?;
                Ok(PublishOutcome::DeadLettered {
                    event_id: event_id.to_string(),
                    reason,
                })
            }
        }
    }

    /// Structural check, plus the matching schema when one is registered.
    fn check(&self, envelope: &EventEnvelope) -> Result<()> {
        if self
            .schemas
            .contains(envelope.event_type(), envelope.specversion())
        {
            self.schemas
                .validate_against_version(envelope, envelope.specversion())
        } else {
            self.schemas.validate(envelope)
        }
    }

    async fn deliver(&self, topic: &str, envelope: &EventEnvelope) -> Result<()> {
        match tokio::time::timeout(self.publish_timeout, self.publisher.publish(topic, envelope))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(EventError::Timeout(self.publish_timeout)),
        }
    }

    fn record(&self, envelope: EventEnvelope) -> PublishOutcome {
        let event_id = envelope.id().to_string();
        let sequence = self.replay.store_event(envelope);
        debug!(
            event_id = %event_id,
            sequence = sequence,
            publisher = self.publisher.name(),
            "event published"
        );
        PublishOutcome::Published { event_id, sequence }
    }
}

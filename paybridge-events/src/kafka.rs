//! Apache Kafka publisher

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::{debug, info};

use crate::envelope::EventEnvelope;
use crate::error::{EventError, Result};
use crate::publisher::EventPublisher;

/// Publishes envelopes as JSON records with CloudEvents `ce-*` headers.
pub struct KafkaPublisher {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaPublisher {
    /// Connect to the given brokers
    pub fn connect(brokers: &[String], send_timeout: Duration) -> Result<Self> {
        if brokers.is_empty() {
            return Err(EventError::Publish("no Kafka brokers configured".to_string()));
        }

        let servers = brokers.join(",");
        info!(brokers = %servers, "Connecting to Kafka");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &servers)
            .set("acks", "all")
            .set("message.send.max.retries", "3")
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .create()
            .map_err(|e| EventError::Publish(e.to_string()))?;

        Ok(Self {
            producer,
            send_timeout,
        })
    }

    fn build_headers(envelope: &EventEnvelope) -> OwnedHeaders {
        let time = envelope
            .time()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        OwnedHeaders::new()
            .insert(Header {
                key: "ce-specversion",
                value: Some(envelope.specversion().as_bytes()),
            })
            .insert(Header {
                key: "ce-type",
                value: Some(envelope.event_type().as_bytes()),
            })
            .insert(Header {
                key: "ce-source",
                value: Some(envelope.source().as_bytes()),
            })
            .insert(Header {
                key: "ce-id",
                value: Some(envelope.id().as_bytes()),
            })
            .insert(Header {
                key: "ce-time",
                value: Some(time.as_bytes()),
            })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<()> {
        let envelope = envelope.clone().with_defaults();
        let payload = envelope.to_bytes()?;
        let headers = Self::build_headers(&envelope);

        let record = FutureRecord::to(topic)
            .key(envelope.id())
            .payload(&payload)
            .headers(headers);

        self.producer
            .send(record, self.send_timeout)
            .await
            .map_err(|(e, _)| EventError::Publish(e.to_string()))?;

        debug!(topic = topic, event_id = %envelope.id(), "Published event to Kafka");
        Ok(())
    }

    fn name(&self) -> &str {
        "kafka"
    }
}

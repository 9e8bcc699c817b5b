//! Event publishers

use crate::envelope::EventEnvelope;
use crate::error::{EventError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Hands envelopes to an event bus.
///
/// `publish` either completes or returns an error; callers treat any error,
/// including a dropped future, as a failed delivery.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &str {
        "publisher"
    }
}

/// An envelope recorded by [`InMemoryPublisher`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub topic: String,
    pub envelope: EventEnvelope,
}

/// In-process publisher that records every envelope.
///
/// Failures can be forced per event type or for every publish, which is
/// how tests exercise the dead-letter path.
#[derive(Debug)]
pub struct InMemoryPublisher {
    events: Mutex<Vec<PublishedEvent>>,
    failures: DashMap<String, String>,
    available: AtomicBool,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failures: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Fail every publish of `event_type` with `reason`
    pub fn fail_event_type(&self, event_type: impl Into<String>, reason: impl Into<String>) {
        self.failures.insert(event_type.into(), reason.into());
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Simulate a broker outage
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedEvent> {
        self.events.lock().clone()
    }

    pub fn published_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.envelope.event_type() == event_type)
            .map(|e| e.envelope.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for InMemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(EventError::Publish("broker unavailable".to_string()));
        }

        if let Some(reason) = self.failures.get(envelope.event_type()) {
            return Err(EventError::Publish(reason.value().clone()));
        }

        debug!(
            topic = topic,
            event_id = %envelope.id(),
            event_type = %envelope.event_type(),
            "recorded event"
        );
        self.events.lock().push(PublishedEvent {
            topic: topic.to_string(),
            envelope: envelope.clone(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

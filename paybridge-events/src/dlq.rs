//! Dead-letter queue for envelopes that failed to publish

use crate::envelope::EventEnvelope;
use crate::error::{EventError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A failed delivery awaiting retry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub event: EventEnvelope,
    pub failure_reason: String,
    pub failure_time: DateTime<Utc>,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterStatistics {
    /// Entries currently queued
    pub total_events: usize,
    /// Retries taken since start or the last `clear`
    pub retry_count: u64,
}

#[derive(Debug, Default)]
struct DlqState {
    entries: Vec<DeadLetterEntry>,
    total_retries: u64,
}

/// Holds failed envelopes and retry bookkeeping.
///
/// Never delivers anything itself; `retry_event` hands the envelope back to
/// the caller who decides when and how to re-publish.
#[derive(Debug, Default)]
pub struct DeadLetterQueue {
    state: Mutex<DlqState>,
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_to_dead_letter_queue(
        &self,
        event: EventEnvelope,
        failure_reason: impl Into<String>,
    ) -> Result<()> {
        let failure_reason = failure_reason.into();
        if failure_reason.trim().is_empty() {
            return Err(EventError::DeadLetter("failure reason is required".to_string()));
        }

        warn!(
            event_id = %event.id(),
            event_type = %event.event_type(),
            reason = %failure_reason,
            "event moved to dead letter queue"
        );

        self.state.lock().entries.push(DeadLetterEntry {
            event,
            failure_reason,
            failure_time: Utc::now(),
            retry_count: 0,
        });
        Ok(())
    }

    /// Snapshot of the queued entries, oldest first
    pub fn dead_letter_events(&self) -> Vec<DeadLetterEntry> {
        self.state.lock().entries.clone()
    }

    /// Remove an entry for retry and return its envelope.
    pub fn retry_event(&self, event_id: &str) -> Result<EventEnvelope> {
        self.take_for_retry(event_id).map(|entry| entry.event)
    }

    /// Remove an entry for retry, bumping its retry count and the global
    /// retry counter.
    pub fn take_for_retry(&self, event_id: &str) -> Result<DeadLetterEntry> {
        let mut state = self.state.lock();
        let position = state
            .entries
            .iter()
            .position(|entry| entry.event.id() == event_id)
            .ok_or_else(|| EventError::NotFound(event_id.to_string()))?;

        let mut entry = state.entries.remove(position);
        entry.retry_count += 1;
        state.total_retries += 1;
        drop(state);

        info!(event_id = %event_id, retry_count = entry.retry_count, "retrying dead letter event");
        Ok(entry)
    }

    /// Put an entry back after another failed attempt, keeping its retry count.
    pub fn requeue(
        &self,
        mut entry: DeadLetterEntry,
        failure_reason: impl Into<String>,
    ) -> Result<()> {
        let failure_reason = failure_reason.into();
        if failure_reason.trim().is_empty() {
            return Err(EventError::DeadLetter("failure reason is required".to_string()));
        }

        entry.failure_reason = failure_reason;
        entry.failure_time = Utc::now();
        self.state.lock().entries.push(entry);
        Ok(())
    }

    pub fn statistics(&self) -> DeadLetterStatistics {
        let state = self.state.lock();
        DeadLetterStatistics {
            total_events: state.entries.len(),
            retry_count: state.total_retries,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Drop every entry and reset the retry counter
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.total_retries = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(id: &str) -> EventEnvelope {
        EventEnvelope::builder("charge.created", "/payments/charges")
            .id(id)
            .specversion("1.0")
            .time(Utc::now())
            .build()
    }

    fn dead_letter(dlq: &DeadLetterQueue, id: &str, reason: &str) {
        dlq.send_to_dead_letter_queue(envelope(id), reason).unwrap();
    }

    #[test]
    fn test_send_requires_reason() {
        let dlq = DeadLetterQueue::new();
        assert!(dlq.send_to_dead_letter_queue(envelope("evt_1"), "").is_err());
        assert!(dlq.is_empty());
    }

    #[test]
    fn test_new_entry_has_zero_retries() {
        let dlq = DeadLetterQueue::new();
        dead_letter(&dlq, "evt_1", "broker down");

        let entries = dlq.dead_letter_events();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].retry_count, 0);
        assert_eq!(entries[0].failure_reason, "broker down");
    }

    #[test]
    fn test_retry_round_trip() {
        let dlq = DeadLetterQueue::new();
        dead_letter(&dlq, "evt_1", "broker down");
        dead_letter(&dlq, "evt_2", "broker down");
        let before = dlq.statistics();

        let event = dlq.retry_event("evt_1").unwrap();
        assert_eq!(event.id(), "evt_1");

        let after = dlq.statistics();
        assert_eq!(after.total_events, before.total_events - 1);
        assert_eq!(after.retry_count, before.retry_count + 1);
        assert_eq!(dlq.dead_letter_events()[0].event.id(), "evt_2");
    }

    #[test]
    fn test_retry_unknown_id() {
        let dlq = DeadLetterQueue::new();
        assert!(matches!(
            dlq.retry_event("missing"),
            Err(EventError::NotFound(_))
        ));
        assert_eq!(dlq.statistics().retry_count, 0);
    }

    #[test]
    fn test_requeue_keeps_retry_count() {
        let dlq = DeadLetterQueue::new();
        dead_letter(&dlq, "evt_1", "first");

        let entry = dlq.take_for_retry("evt_1").unwrap();
        dlq.requeue(entry, "second").unwrap();
        let entry = dlq.take_for_retry("evt_1").unwrap();
        assert_eq!(entry.retry_count, 2);
        assert_eq!(entry.failure_reason, "second");
        assert_eq!(dlq.statistics().retry_count, 2);
    }

    #[test]
    fn test_clear() {
        let dlq = DeadLetterQueue::new();
        dead_letter(&dlq, "evt_1", "down");
        dlq.retry_event("evt_1").unwrap();
        dead_letter(&dlq, "evt_2", "down");

        dlq.clear();
        assert_eq!(dlq.statistics(), DeadLetterStatistics::default());
    }
}

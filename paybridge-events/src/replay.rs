//! Replay store for published envelopes

use crate::envelope::EventEnvelope;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// An envelope with its storage metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub sequence: u64,
    pub stored_at: DateTime<Utc>,
    pub envelope: EventEnvelope,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStatistics {
    pub total_stored_events: usize,
    pub total_replay_operations: u64,
}

#[derive(Debug, Default)]
struct ReplayState {
    events: Vec<StoredEvent>,
    next_sequence: u64,
    replay_operations: u64,
}

/// Append-only in-memory log of published envelopes.
#[derive(Debug, Default)]
pub struct ReplayStore {
    state: Mutex<ReplayState>,
}

impl ReplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an envelope; returns its sequence number
    pub fn store_event(&self, envelope: EventEnvelope) -> u64 {
        let mut state = self.state.lock();
        state.next_sequence += 1;
        let sequence = state.next_sequence;
        state.events.push(StoredEvent {
            sequence,
            stored_at: Utc::now(),
            envelope,
        });
        sequence
    }

    pub fn stored_events(&self) -> Vec<EventEnvelope> {
        self.state
            .lock()
            .events
            .iter()
            .map(|stored| stored.envelope.clone())
            .collect()
    }

    pub fn stored(&self) -> Vec<StoredEvent> {
        self.state.lock().events.clone()
    }

    /// Envelopes with `start < time < end`.
    ///
    /// Counts as a replay operation even when nothing matches.
    pub fn replay_events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<EventEnvelope> {
        let mut state = self.state.lock();
        state.replay_operations += 1;
        state
            .events
            .iter()
            .filter(|stored| matches!(stored.envelope.time(), Some(t) if t > start && t < end))
            .map(|stored| stored.envelope.clone())
            .collect()
    }

    /// Envelopes of exactly `event_type`; counts as a replay operation.
    pub fn replay_events_by_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        let mut state = self.state.lock();
        state.replay_operations += 1;
        state
            .events
            .iter()
            .filter(|stored| stored.envelope.event_type() == event_type)
            .map(|stored| stored.envelope.clone())
            .collect()
    }

    pub fn statistics(&self) -> ReplayStatistics {
        let state = self.state.lock();
        ReplayStatistics {
            total_stored_events: state.events.len(),
            total_replay_operations: state.replay_operations,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().events.is_empty()
    }

    /// Drop stored envelopes; counters are kept
    pub fn clear(&self) {
        self.state.lock().events.clear();
    }
}

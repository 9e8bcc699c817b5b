//! Short-lived record of handled delivery ids

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// A handler is running for this id
    InFlight,
    Handled(Instant),
}

/// Outcome of [`SeenSet::claim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the id until it calls `complete` or `release`
    Claimed,
    /// Handled within the ttl
    Duplicate,
    /// Another delivery of the same id is being handled right now
    InFlight,
}

/// Ids of handled deliveries, each remembered for `ttl`.
///
/// Expired ids are swept on the write path at most once per ttl, so the set
/// holds roughly the ids handled in the last two ttl windows.
#[derive(Debug)]
pub struct SeenSet {
    seen: DashMap<String, Slot>,
    ttl: Duration,
    epoch: Instant,
    last_sweep_ms: AtomicU64,
}

impl SeenSet {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
            epoch: Instant::now(),
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn expired(&self, slot: Slot) -> bool {
        match slot {
            Slot::InFlight => false,
            Slot::Handled(marked_at) => marked_at.elapsed() > self.ttl,
        }
    }

    /// Whether `id` was handled within the ttl; an expired id is dropped.
    pub fn contains(&self, id: &str) -> bool {
        let slot = match self.seen.get(id) {
            Some(slot) => *slot,
            None => return false,
        };
        if self.expired(slot) {
            self.seen.remove_if(id, |_, slot| self.expired(*slot));
            return false;
        }
        matches!(slot, Slot::Handled(_))
    }

    /// Reserve `id` for one handler run.
    ///
    /// Only one concurrent caller gets [`Claim::Claimed`] for a given id.
    pub fn claim(&self, id: &str) -> Claim {
        let claim = match self.seen.entry(id.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(Slot::InFlight);
                Claim::Claimed
            }
            Entry::Occupied(mut entry) => {
                let slot = *entry.get();
                match slot {
                    Slot::InFlight => Claim::InFlight,
                    _ if self.expired(slot) => {
                        entry.insert(Slot::InFlight);
                        Claim::Claimed
                    }
                    Slot::Handled(_) => Claim::Duplicate,
                }
            }
        };
        if claim == Claim::Claimed {
            self.sweep_if_due();
        }
        claim
    }

    /// Record a claimed id as handled
    pub fn complete(&self, id: &str) {
        self.mark(id);
    }

    /// Give up a claim so a redelivery can run the handlers again
    pub fn release(&self, id: &str) {
        self.seen.remove_if(id, |_, slot| matches!(slot, Slot::InFlight));
    }

    /// Record `id` as handled now
    pub fn mark(&self, id: impl Into<String>) {
        self.seen.insert(id.into(), Slot::Handled(Instant::now()));
        self.sweep_if_due();
    }

    /// Drop every expired id; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, slot| !self.expired(*slot));
        before.saturating_sub(self.seen.len())
    }

    fn sweep_if_due(&self) {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) <= self.ttl.as_millis() as u64 {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.purge_expired();
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_contains() {
        let seen = SeenSet::default();
        assert!(!seen.contains("evt_1"));
        seen.mark("evt_1");
        assert!(seen.contains("evt_1"));
        assert!(!seen.contains("evt_2"));
    }

    #[test]
    fn test_expiry() {
        let seen = SeenSet::new(Duration::from_millis(10));
        seen.mark("evt_1");
        std::thread::sleep(Duration::from_millis(30));
        assert!(!seen.contains("evt_1"));
        assert!(seen.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let seen = SeenSet::new(Duration::from_millis(50));
        seen.mark("evt_1");
        seen.mark("evt_2");
        std::thread::sleep(Duration::from_millis(80));
        seen.seen.insert("evt_3".into(), Slot::Handled(Instant::now()));

        assert_eq!(seen.purge_expired(), 2);
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("evt_3"));
    }

    #[test]
    fn test_writes_sweep_expired_ids() {
        let seen = SeenSet::new(Duration::from_millis(5));
        for i in 0..500 {
            seen.mark(format!("evt_{i}"));
        }
        std::thread::sleep(Duration::from_millis(50));

        seen.mark("evt_new");

        assert!(seen.len() <= 1, "{} ids left after sweep", seen.len());
    }

    #[test]
    fn test_claim_is_exclusive() {
        let seen = SeenSet::default();
        assert_eq!(seen.claim("evt_1"), Claim::Claimed);
        assert_eq!(seen.claim("evt_1"), Claim::InFlight);
        assert!(!seen.contains("evt_1"));

        seen.complete("evt_1");
        assert_eq!(seen.claim("evt_1"), Claim::Duplicate);
        assert!(seen.contains("evt_1"));
    }

    #[test]
    fn test_release_allows_retry() {
        let seen = SeenSet::default();
        assert_eq!(seen.claim("evt_1"), Claim::Claimed);
        seen.release("evt_1");
        assert!(seen.is_empty());
        assert_eq!(seen.claim("evt_1"), Claim::Claimed);

        seen.complete("evt_1");
        seen.release("evt_1");
        assert!(seen.contains("evt_1"));
    }

    #[test]
    fn test_expired_id_can_be_claimed_again() {
        let seen = SeenSet::new(Duration::from_millis(10));
        seen.mark("evt_1");
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(seen.claim("evt_1"), Claim::Claimed);
    }
}

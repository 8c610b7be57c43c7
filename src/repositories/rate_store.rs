use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;

/// Key/value store behind the contact throttles.
///
/// Every method is a single read-modify-write on one key, so an
/// implementation only has to make that step atomic per key. The memory
/// store does it through dashmap's shard locks; an external store would
/// use its own transaction or script.
pub trait RateStore: Send + Sync {
    /// Drops timestamps for `key` that are `window_ms` or more older than
    /// `now_ms`, then records `now_ms` if fewer than `max` remain.
    ///
    /// Returns `true` when the hit was recorded, `false` when the window is full.
    fn record_hit(&self, key: &str, now_ms: u64, window_ms: u64, max: usize) -> bool;

    /// Stamps `now_ms` for `key` unless the previous stamp is less than
    /// `cooldown_ms` old. Returns `true` when the stamp was written.
    fn claim_cooldown(&self, key: &str, now_ms: u64, cooldown_ms: u64) -> bool;

    /// Removes every key with no activity inside `horizon_ms` of `now_ms`.
    /// Returns the number of keys removed.
    fn evict_idle(&self, now_ms: u64, horizon_ms: u64) -> usize;

    /// Number of keys currently held.
    fn len(&self) -> usize;
}

#[derive(Default)]
pub struct MemoryRateStore {
    windows: DashMap<String, VecDeque<u64>>,
    stamps: DashMap<String, u64>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateStore for MemoryRateStore {
    fn record_hit(&self, key: &str, now_ms: u64, window_ms: u64, max: usize) -> bool {
        let mut timestamps = self.windows.entry(key.to_string()).or_default();
        // timestamps are appended in clock order, so stale ones sit at the front
        while timestamps
            .front()
            .map_or(false, |&ts| now_ms.saturating_sub(ts) >= window_ms)
        {
            timestamps.pop_front();
        }
        if timestamps.len() >= max {
            return false;
        }
        timestamps.push_back(now_ms);
        true
    }

    fn claim_cooldown(&self, key: &str, now_ms: u64, cooldown_ms: u64) -> bool {
        match self.stamps.entry(key.to_string()) {
            Entry::Occupied(mut last) => {
                if now_ms.saturating_sub(*last.get()) < cooldown_ms {
                    return false;
                }
                last.insert(now_ms);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(now_ms);
                true
            }
        }
    }

    fn evict_idle(&self, now_ms: u64, horizon_ms: u64) -> usize {
        let before = self.len();
        self.windows.retain(|_, timestamps| {
            timestamps
                .back()
                .map_or(false, |&newest| now_ms.saturating_sub(newest) < horizon_ms)
        });
        self.stamps
            .retain(|_, last| now_ms.saturating_sub(*last) < horizon_ms);
        before.saturating_sub(self.len())
    }

    fn len(&self) -> usize {
        self.windows.len() + self.stamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: u64 = 60_000;

    #[test]
    fn window_fills_then_rejects() {
        let store = MemoryRateStore::new();
        for i in 0..3 {
            assert!(store.record_hit("k", 1_000 + i, WINDOW, 3));
        }
        assert!(!store.record_hit("k", 1_010, WINDOW, 3));
    }

    #[test]
    fn rejected_hits_are_not_recorded() {
        let store = MemoryRateStore::new();
        assert!(store.record_hit("k", 0, WINDOW, 1));
        assert!(!store.record_hit("k", 10_000, WINDOW, 1));
        // only the first hit counts, so the window reopens 60s after it
        assert!(store.record_hit("k", 60_000, WINDOW, 1));
    }

    #[test]
    fn entries_exactly_one_window_old_are_pruned() {
        let store = MemoryRateStore::new();
        assert!(store.record_hit("k", 0, WINDOW, 1));
        assert!(!store.record_hit("k", 59_999, WINDOW, 1));
        assert!(store.record_hit("k", 60_000, WINDOW, 1));
    }

    #[test]
    fn keys_are_independent() {
        let store = MemoryRateStore::new();
        assert!(store.record_hit("a", 0, WINDOW, 1));
        assert!(store.record_hit("b", 0, WINDOW, 1));
        assert!(!store.record_hit("a", 1, WINDOW, 1));
    }

    #[test]
    fn cooldown_blocks_until_period_passes() {
        let store = MemoryRateStore::new();
        assert!(store.claim_cooldown("a@x.com", 100_000, 60_000));
        assert!(!store.claim_cooldown("a@x.com", 110_000, 60_000));
        // a refused claim does not move the stamp
        assert!(store.claim_cooldown("a@x.com", 160_000, 60_000));
        assert!(!store.claim_cooldown("a@x.com", 219_999, 60_000));
    }

    #[test]
    fn evict_idle_drops_only_stale_keys() {
        let store = MemoryRateStore::new();
        store.record_hit("old", 0, WINDOW, 5);
        store.record_hit("fresh", 100_000, WINDOW, 5);
        store.claim_cooldown("old@x.com", 0, 60_000);
        store.claim_cooldown("fresh@x.com", 100_000, 60_000);
        assert_eq!(store.len(), 4);

        let removed = store.evict_idle(120_000, 60_000);
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 2);
        assert!(!store.record_hit("fresh", 120_000, WINDOW, 1));
    }
}

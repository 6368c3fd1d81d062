//! Expiring per-symbol cache.
//!
//! `TtlCache` stores the last value fetched for a key together with the instant it
//! was stored. Reads come in two flavours:
//!
//! - `TtlCache::get_fresh(key)`: only values younger than the TTL; the normal read path.
//! - `TtlCache::get_any(key)`: the last value regardless of age; used as a stale
//!   fallback when the provider cannot be reached.
//!
//! Expired entries are kept on purpose so they can still serve as stale fallbacks;
//! `purge_expired` drops them explicitly. Time is measured with `std::time::Instant`,
//! which is monotonic. The cache is not synchronized; services wrap it in a `Mutex`.

use market_common::status::CacheStats;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Map from key to the last stored value and its age limit.
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache whose entries stay fresh for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Store `value` under `key`, resetting its age.
    pub fn insert(&mut self, key: &str, value: V) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Value for `key` if it was stored less than one TTL ago.
    pub fn get_fresh(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| now.duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Value for `key` regardless of its age.
    pub fn get_any(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Drop everything; returns how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Drop entries older than the TTL; returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.stored_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let active_entries = self
            .entries
            .values()
            .filter(|entry| now.duration_since(entry.stored_at) < self.ttl)
            .count();
        CacheStats {
            total_entries: self.entries.len(),
            active_entries,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn fresh_entries_are_returned() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("AAPL", 1.5);
        assert_eq!(cache.get_fresh("AAPL"), Some(1.5));
        assert_eq!(cache.get_fresh("MSFT"), None);
    }

    #[test]
    fn expired_entries_are_stale_but_kept() {
        let mut cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("BTC", 42);
        thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get_fresh("BTC"), None);
        assert_eq!(cache.get_any("BTC"), Some(42));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.active_entries, 0);
    }

    #[test]
    fn insert_resets_age() {
        let mut cache = TtlCache::new(Duration::from_millis(30));
        cache.insert("ETH", 1);
        thread::sleep(Duration::from_millis(40));
        cache.insert("ETH", 2);
        assert_eq!(cache.get_fresh("ETH"), Some(2));
    }

    #[test]
    fn purge_and_clear_report_counts() {
        let mut cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("A", 1);
        cache.insert("B", 2);
        thread::sleep(Duration::from_millis(20));
        cache.insert("C", 3);

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.clear(), 1);
        assert_eq!(cache.len(), 0);
    }

    proptest! {
        #[test]
        fn active_never_exceeds_total(keys in proptest::collection::vec("[A-Z]{1,4}", 0..40)) {
            let mut cache = TtlCache::new(Duration::from_secs(60));
            for key in &keys {
                cache.insert(key, key.len());
            }
            let stats = cache.stats();
            prop_assert!(stats.active_entries <= stats.total_entries);
            prop_assert_eq!(stats.total_entries, cache.len());
            prop_assert_eq!(stats.ttl_secs, 60);
        }
    }
}

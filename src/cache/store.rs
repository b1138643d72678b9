//! Local Store Module
//!
//! Bounded in-process store combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Store State ==
#[derive(Debug)]
struct StoreState {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl StoreState {
    fn drop_entry(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        self.lru.remove(key);
        self.stats.set_total_entries(self.entries.len());
        existed
    }
}

// == Local Store ==
/// In-process cache with LRU eviction and per-entry TTL.
///
/// Cloning is cheap and every clone shares the same entries. All access goes
/// through an internal lock that is never held across an `.await`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    state: Arc<Mutex<StoreState>>,
}

impl LocalStore {
    // == Constructor ==
    /// Creates a new LocalStore holding at most `max_entries` entries (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                stats: CacheStats::new(),
                max_entries: max_entries.max(1),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // A panic while holding the lock cannot leave the map half-written,
        // so a poisoned guard is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Set ==
    /// Stores a value expiring `ttl_seconds` from now.
    ///
    /// If the key already exists, the value is overwritten and its TTL reset.
    /// If the store is at capacity, the least recently used entry is evicted first.
    pub fn set(&self, key: &str, value: Value, ttl_seconds: u64) {
        let mut state = self.lock();

        let is_overwrite = state.entries.contains_key(key);
        if !is_overwrite && state.entries.len() >= state.max_entries {
            if let Some(evicted_key) = state.lru.evict_oldest() {
                state.entries.remove(&evicted_key);
                state.stats.record_eviction();
                debug!(key = %evicted_key, "Evicted least recently used entry");
            }
        }

        state
            .entries
            .insert(key.to_string(), CacheEntry::new(value, ttl_seconds));
        state.lru.touch(key);

        let len = state.entries.len();
        state.stats.set_total_entries(len);
    }

    // == Get ==
    /// Returns a clone of the live value for `key`.
    ///
    /// Expired entries are purged and reported as a miss. A stored JSON
    /// `null` is returned as `Some(Value::Null)`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_with(key, |value| Some(value.clone()))
    }

    /// Looks up `key` and maps the live value through `read`.
    ///
    /// The lookup counts as a hit, and refreshes LRU order, only when `read`
    /// returns `Some`. Otherwise it counts as a miss and the entry stays put.
    /// `read` runs under the store lock and must not call back into the store.
    pub fn get_with<R>(&self, key: &str, read: impl FnOnce(&Value) -> Option<R>) -> Option<R> {
        let mut state = self.lock();

        match state.entries.get(key).map(CacheEntry::is_expired) {
            None => {
                state.stats.record_miss();
                return None;
            }
            Some(true) => {
                state.drop_entry(key);
                state.stats.record_expirations(1);
                state.stats.record_miss();
                return None;
            }
            Some(false) => {}
        }

        let result = state.entries.get(key).and_then(|entry| read(&entry.value));
        if result.is_some() {
            state.stats.record_hit();
            state.lru.touch(key);
        } else {
            state.stats.record_miss();
        }
        result
    }

    // == Delete ==
    /// Removes an entry, returning whether a live entry existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.lock();
        let live = state
            .entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false);
        state.drop_entry(key);
        live
    }

    // == Clear ==
    /// Removes every entry. Counters other than `total_entries` are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.lru.clear();
        state.stats.set_total_entries(0);
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.lock();

        let expired_keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            state.drop_entry(key);
        }

        state.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Time To Live ==
    /// Remaining lifetime of a live entry in milliseconds. Does not touch LRU order.
    pub fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        self.lock()
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(CacheEntry::ttl_remaining_ms)
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().max_entries
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_get_with_rejected_value_is_a_miss() {
        let store = LocalStore::new(2);
        store.set("a", json!("text"), 60);
        store.set("b", json!(2), 60);

        assert_eq!(store.get_with("a", |value| value.as_u64()), None);

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);

        // "a" was not refreshed, so it is still the eviction candidate
        store.set("c", json!(3), 60);
        assert!(store.get("a").is_none());
        assert_eq!(store.get_with("b", |value| value.as_u64()), Some(2));
    }

    #[test]
    fn test_store_new() {
        let store = LocalStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_zero_capacity_is_clamped() {
        let store = LocalStore::new(0);
        store.set("a", json!(1), 60);
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.get("a"), Some(json!(1)));
    }

    #[test]
    fn test_store_set_and_get() {
        let store = LocalStore::new(100);

        store.set("key1", json!(["one", "two"]), 300);

        assert_eq!(store.get("key1"), Some(json!(["one", "two"])));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = LocalStore::new(100);
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_null_is_a_hit() {
        let store = LocalStore::new(100);

        store.set("nothing", Value::Null, 300);

        assert_eq!(store.get("nothing"), Some(Value::Null));
        assert_eq!(store.get("never-set"), None);
        assert_eq!(store.stats().hits, 1);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_delete() {
        let store = LocalStore::new(100);

        store.set("key1", json!("value1"), 300);

        assert!(store.delete("key1"));
        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
        assert!(!store.delete("key1"));
    }

    #[test]
    fn test_store_overwrite() {
        let store = LocalStore::new(100);

        store.set("key1", json!("value1"), 300);
        store.set("key1", json!("value2"), 300);

        assert_eq!(store.get("key1"), Some(json!("value2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let store = LocalStore::new(100);

        store.set("key1", json!("value1"), 1);
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("key1"), None);
        assert!(store.is_empty());
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_delete_expired_reports_absent() {
        let store = LocalStore::new(100);
        store.set("key1", json!(1), 1);

        sleep(Duration::from_millis(1100));

        assert!(!store.delete("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_lru_eviction() {
        let store = LocalStore::new(3);

        store.set("key1", json!(1), 300);
        store.set("key2", json!(2), 300);
        store.set("key3", json!(3), 300);

        // Store is full, adding key4 evicts key1 (oldest)
        store.set("key4", json!(4), 300);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1"), None);
        assert!(store.get("key2").is_some());
        assert!(store.get("key3").is_some());
        assert!(store.get("key4").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let store = LocalStore::new(3);

        store.set("key1", json!(1), 300);
        store.set("key2", json!(2), 300);
        store.set("key3", json!(3), 300);

        store.get("key1");

        // key2 is now the oldest
        store.set("key4", json!(4), 300);

        assert!(store.get("key1").is_some());
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn test_store_overwrite_at_capacity_does_not_evict() {
        let store = LocalStore::new(2);

        store.set("key1", json!(1), 300);
        store.set("key2", json!(2), 300);
        store.set("key1", json!(10), 300);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("key2"), Some(json!(2)));
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_clear() {
        let store = LocalStore::new(100);
        store.set("a", json!(1), 300);
        store.set("b", json!(2), 300);

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), None);
        assert_eq!(store.stats().total_entries, 0);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let store = LocalStore::new(100);

        store.set("key1", json!("short"), 1);
        store.set("key2", json!("long"), 10);

        sleep(Duration::from_millis(1100));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("key2").is_some());
    }

    #[test]
    fn test_store_ttl_remaining() {
        let store = LocalStore::new(10);
        store.set("key1", json!(1), 10);

        let remaining = store.ttl_remaining_ms("key1").unwrap();
        assert!(remaining > 9_000 && remaining <= 10_000);
        assert_eq!(store.ttl_remaining_ms("missing"), None);
    }

    #[test]
    fn test_store_clones_share_entries() {
        let store = LocalStore::new(10);
        let other = store.clone();

        store.set("shared", json!({"count": 42}), 300);

        assert_eq!(other.get("shared"), Some(json!({"count": 42})));
    }

    #[test]
    fn test_store_concurrent_writers() {
        let store = LocalStore::new(1000);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.set(&format!("t{}:k{}", t, i), json!(t * 100 + i), 300);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 400);
        assert_eq!(store.get("t3:k7"), Some(json!(307)));
    }
}

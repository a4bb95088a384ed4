//! In-memory TTL cache for provider responses.
//!
//! Keeps weather snapshots, offer searches, and the provider OAuth token
//! for a bounded time so watch ticks and repeated analyses don't hammer
//! the upstream APIs. Capacity-bounded: inserting into a full cache evicts
//! expired entries first, then the entry closest to expiry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    expires_at: Instant,
    value: V,
}

/// A thread-safe map with per-entry expiry.
pub struct TtlCache<V> {
    default_ttl: Duration,
    max_entries: usize,
    data: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            default_ttl,
            max_entries,
            data: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a non-expired value. Expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut data = self.data.lock().expect("cache lock poisoned");
        match data.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                data.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert with the default TTL.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let mut data = self.data.lock().expect("cache lock poisoned");
        if data.len() >= self.max_entries && !data.contains_key(key) {
            evict_one(&mut data);
        }
        data.insert(
            key.to_string(),
            Entry {
                expires_at: Instant::now() + ttl,
                value,
            },
        );
    }
}

/// Drop all expired entries; if none were expired, drop the entry closest
/// to expiry.
fn evict_one<V>(data: &mut HashMap<String, Entry<V>>) {
    let now = Instant::now();
    let before = data.len();
    data.retain(|_, entry| entry.expires_at > now);
    if data.len() < before {
        return;
    }
    if let Some(key) = data
        .iter()
        .min_by_key(|(_, entry)| entry.expires_at)
        .map(|(k, _)| k.clone())
    {
        data.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60), 10);
        cache.set("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_expiry() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60), 10);
        cache.set_with_ttl("k", 1, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_capacity_eviction() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60), 2);
        cache.set_with_ttl("soonest", 1, Duration::from_secs(1));
        cache.set_with_ttl("later", 2, Duration::from_secs(100));
        cache.set("third", 3);
        // "soonest" was closest to expiry and should have been evicted
        assert_eq!(cache.get("soonest"), None);
        assert_eq!(cache.get("later"), Some(2));
        assert_eq!(cache.get("third"), Some(3));
    }

    #[test]
    fn test_overwrite_same_key_does_not_evict() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60), 2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Thread-safe keyed cache whose entries expire after a fixed TTL.
/// Cloning shares the underlying map.
#[derive(Clone)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CachedEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Returns the value if it is still within TTL; expired entries are dropped.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
            drop(entry); // Release the read lock
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: &str, value: V) {
        self.entries.insert(
            key.to_string(),
            CachedEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stores_and_retrieves() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("dashboard", 42);
        assert_eq!(cache.get("dashboard"), Some(42));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn test_cache_expires() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.insert("dashboard", "value".to_string());

        std::thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get("dashboard"), None);
        assert!(cache.entries.get("dashboard").is_none());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let shared = cache.clone();
        shared.insert("k", 1);
        assert_eq!(cache.get("k"), Some(1));

        cache.insert("k", 2);
        assert_eq!(shared.get("k"), Some(2));
    }
}

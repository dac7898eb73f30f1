// =============================================================================
// TTL cache keyed by (operation, key)
// =============================================================================
//
// Explicit replacement for function-level memoisation: callers check and
// populate the cache themselves. Concurrent misses on the same key may both
// fetch; the later insert simply wins.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

/// Expiry horizon used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Composite key: which operation produced the value and for which input.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub operation: &'static str,
    pub key: String,
}

impl CacheKey {
    pub fn new(operation: &'static str, key: impl Into<String>) -> Self {
        Self {
            operation,
            key: key.into(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.operation, self.key)
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe map from [`CacheKey`] to a value with an expiry timestamp.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<CacheKey, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`. Expired entries are treated as misses and
    /// evicted.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<V> {
        {
            let map = self.entries.read();
            match map.get(key) {
                Some(entry) if entry.expires_at > now => {
                    debug!(key = %key, "cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    debug!(key = %key, "cache miss");
                    return None;
                }
            }
        }
        debug!(key = %key, "cache entry expired");
        self.entries.write().remove(key);
        None
    }

    pub fn insert(&self, key: CacheKey, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Insert `value` as of `now`. Entries that have already expired are
    /// purged first so keys nobody reads again do not accumulate.
    pub fn insert_at(&self, key: CacheKey, value: V, now: Instant) {
        let expires_at = now
            .checked_add(self.ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let mut map = self.entries.write();
        let before = map.len();
        map.retain(|_, e| e.expires_at > now);
        if map.len() < before {
            debug!(purged = before - map.len(), "expired cache entries purged");
        }
        map.insert(key, Entry { value, expires_at });
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Drop every entry; returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut map = self.entries.write();
        let n = map.len();
        map.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_before_expiry_miss_after() {
        let cache = TtlCache::new(Duration::from_secs(3600));
        let key = CacheKey::new("price", "2330");
        let t0 = Instant::now();
        cache.insert_at(key.clone(), 42, t0);

        assert_eq!(cache.get_at(&key, t0 + Duration::from_secs(3599)), Some(42));
        assert_eq!(cache.get_at(&key, t0 + Duration::from_secs(3600)), None);
        // Expired entry was evicted.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn operations_are_independent_namespaces() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(CacheKey::new("price", "2330"), "series");
        assert!(cache.get(&CacheKey::new("name", "2330")).is_none());
        assert_eq!(cache.get(&CacheKey::new("price", "2330")), Some("series"));
    }

    #[test]
    fn later_insert_wins_and_clear_empties() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let key = CacheKey::new("name", "2317");
        cache.insert(key.clone(), 1);
        cache.insert(key.clone(), 2);
        assert_eq!(cache.get(&key), Some(2));
        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        cache.insert(key, 3);
        assert_eq!(cache.clear(), 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn insert_purges_expired_unread_keys() {
        let cache = TtlCache::new(Duration::from_secs(3600));
        let t0 = Instant::now();
        for i in 0..1000 {
            cache.insert_at(CacheKey::new("price", format!("{i:04}")), i, t0);
        }
        assert_eq!(cache.len(), 1000);

        let later = t0 + Duration::from_secs(10 * 3600);
        let key = CacheKey::new("price", "2330");
        cache.insert_at(key.clone(), 7, later);
        assert_eq!(cache.get_at(&key, later), Some(7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let cache = TtlCache::new(Duration::from_secs(u64::MAX));
        let key = CacheKey::new("name", "2330");
        let t0 = Instant::now();
        cache.insert_at(key.clone(), "台積電", t0);
        assert_eq!(cache.get_at(&key, t0 + Duration::from_secs(86_400)), Some("台積電"));
    }

    #[test]
    fn key_display() {
        assert_eq!(CacheKey::new("price", "2330").to_string(), "price(2330)");
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

use crate::stores::ResetRegistry;

/// Registry name of the request cache
pub const REQUEST_CACHE_NAME: &str = "request_cache";

/// Default freshness window for cached GET responses.
/// Section data changes only when the applicant saves, so a short window
/// mostly serves repeated reads within one command.
pub const DEFAULT_STALE_AFTER_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    pub fn is_stale(&self, stale_after: Duration) -> bool {
        self.age() > stale_after
    }
}

/// Shared in-memory cache of GET responses, keyed by request path.
///
/// Cleared whenever the session ends so one user's responses are never
/// served to the next.
#[derive(Default)]
pub struct RequestCache {
    entries: Mutex<HashMap<String, CachedData<Value>>>,
}

impl RequestCache {
    /// Create a cache and register it to be cleared on logout
    pub fn new(registry: &ResetRegistry) -> Arc<Self> {
        let cache = Arc::new(Self::default());
        let handle = Arc::clone(&cache);
        registry.register(REQUEST_CACHE_NAME, move || handle.clear());
        cache
    }

    pub fn get(&self, path: &str) -> Option<CachedData<Value>> {
        self.entries().get(path).cloned()
    }

    /// Cached value for `path` if it is younger than `stale_after`
    pub fn fresh(&self, path: &str, stale_after: Duration) -> Option<Value> {
        self.get(path)
            .filter(|cached| !cached.is_stale(stale_after))
            .map(|cached| cached.data)
    }

    pub fn insert(&self, path: &str, value: Value) {
        self.entries().insert(path.to_string(), CachedData::new(value));
    }

    pub fn invalidate(&self, path: &str) {
        if self.entries().remove(path).is_some() {
            debug!(path = path, "Invalidated cached response");
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        debug!(count, "Cleared request cache");
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedData<Value>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_respects_staleness() {
        let registry = ResetRegistry::new();
        let cache = RequestCache::new(&registry);
        cache.insert("/bio-data", json!({"firstName": "Ada"}));
        assert!(cache.fresh("/bio-data", Duration::seconds(60)).is_some());

        if let Ok(mut entries) = cache.entries.lock() {
            if let Some(entry) = entries.get_mut("/bio-data") {
                entry.cached_at = Utc::now() - Duration::minutes(2);
            }
        }
        assert!(cache.fresh("/bio-data", Duration::seconds(60)).is_none());
        assert!(cache.get("/bio-data").is_some());
    }

    #[test]
    fn test_registry_reset_clears_cache() {
        let registry = ResetRegistry::new();
        let cache = RequestCache::new(&registry);
        cache.insert("/applications/me", json!({}));
        cache.insert("/bio-data", json!({}));
        assert_eq!(cache.len(), 2);

        registry.reset_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let registry = ResetRegistry::new();
        let cache = RequestCache::new(&registry);
        cache.insert("/bio-data", json!({}));
        cache.invalidate("/bio-data");
        cache.invalidate("/missing");
        assert!(cache.is_empty());
    }
}

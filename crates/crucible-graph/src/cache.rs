//! Result cache for the four parameterized graph queries (§4.I). Keeps
//! the same shape as `crucible-adapters::cache` (a small `dashmap`-
//! backed TTL map) even though the two crates share no code — each
//! cache is local to the crate that needs it.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// One cached query result, generic over the query's result type.
#[derive(Debug, Clone)]
pub struct CachedQueryResult<T> {
    /// The decoded result.
    pub value: T,
    /// When this entry was stored.
    pub cached_at: Instant,
}

/// Default TTL for graph-query results before an unconditional refresh.
pub const QUERY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// A dashmap-backed, per-query-kind result cache keyed by
/// `(query_name, normalized_name, system)`.
#[derive(Debug, Default)]
pub struct GraphQueryCache<T> {
    entries: DashMap<String, CachedQueryResult<T>>,
}

impl<T: Clone> GraphQueryCache<T> {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Build the cache key for one query invocation.
    #[must_use]
    pub fn key(query_name: &str, normalized_name: &str, system: &str) -> String {
        format!("{query_name}:{system}:{normalized_name}")
    }

    /// Fetch a still-fresh entry, evicting it first if it has expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.value().cached_at.elapsed() > QUERY_CACHE_TTL {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value().value.clone())
    }

    /// Store `value` for `key`, stamped with the current time.
    pub fn put(&self, key: String, value: T) {
        self.entries.insert(
            key,
            CachedQueryResult {
                value,
                cached_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced_by_query_and_system() {
        let a = GraphQueryCache::<Vec<String>>::key("resource_to_packages", "numpy", "pypi");
        let b = GraphQueryCache::<Vec<String>>::key("package_associations", "numpy", "pypi");
        assert_ne!(a, b);
    }

    #[test]
    fn fresh_entry_is_returned_stale_is_not() {
        let cache: GraphQueryCache<Vec<String>> = GraphQueryCache::new();
        cache.put("k".to_string(), vec!["v".to_string()]);
        assert_eq!(cache.get("k"), Some(vec!["v".to_string()]));
    }
}

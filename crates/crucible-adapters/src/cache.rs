//! The package-info cache partition adapters consult before making a
//! network or subprocess call (§4.I).
//!
//! Adapters depend only on the small [`PackageInfoCache`] trait; the
//! CLI wires up [`InMemoryPackageInfoCache`] as the one implementation
//! this crate needs, so nothing here leaks a concrete backend.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// One cached package-info entry.
#[derive(Debug, Clone)]
pub struct CachedVersions {
    /// Versions as last seen from upstream.
    pub versions: Vec<String>,
    /// `ETag` from the response that produced `versions`, if the
    /// upstream supports conditional revalidation.
    pub etag: Option<String>,
    /// When this entry was stored.
    pub cached_at: Instant,
}

/// Package-info cache partition contract.
#[async_trait::async_trait]
pub trait PackageInfoCache: Send + Sync {
    /// Fetch a cached entry for `key` (normalized name, adapter-namespaced).
    async fn get(&self, key: &str) -> Option<CachedVersions>;

    /// Store `entry` for `key`, valid until `ttl` elapses.
    async fn put(&self, key: &str, entry: CachedVersions, ttl: Duration);
}

/// A dashmap-backed cache with per-entry TTL, used when no tiered
/// cache is available (unit tests, standalone adapter construction).
#[derive(Debug, Default)]
pub struct InMemoryPackageInfoCache {
    entries: DashMap<String, (CachedVersions, Duration)>,
}

impl InMemoryPackageInfoCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PackageInfoCache for InMemoryPackageInfoCache {
    async fn get(&self, key: &str) -> Option<CachedVersions> {
        let entry = self.entries.get(key)?;
        let (cached, ttl) = entry.value();
        if cached.cached_at.elapsed() > *ttl {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(cached.clone())
    }

    async fn put(&self, key: &str, entry: CachedVersions, ttl: Duration) {
        self.entries.insert(key.to_string(), (entry, ttl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache = InMemoryPackageInfoCache::new();
        cache
            .put(
                "numpy",
                CachedVersions {
                    versions: vec!["1.26.0".into()],
                    etag: None,
                    cached_at: Instant::now() - Duration::from_secs(10),
                },
                Duration::from_secs(1),
            )
            .await;
        assert!(cache.get("numpy").await.is_none());
    }

    #[tokio::test]
    async fn fresh_entry_is_returned() {
        let cache = InMemoryPackageInfoCache::new();
        cache
            .put(
                "numpy",
                CachedVersions {
                    versions: vec!["1.26.0".into()],
                    etag: Some("abc".into()),
                    cached_at: Instant::now(),
                },
                Duration::from_secs(3600),
            )
            .await;
        let entry = cache.get("numpy").await.expect("present");
        assert_eq!(entry.versions, vec!["1.26.0".to_string()]);
    }
}

//! Debian/Ubuntu-style OS package adapter (§4.A, §6 "Packaging-system
//! sandbox contract").
//!
//! There is no network registry to query here: version discovery runs
//! inside the packaging-system sandbox, which takes a package name and
//! emits the JSON array of versions `apt-cache madison`-style tooling
//! would report. This adapter owns the sandbox invocation contract and
//! a long-lived cache partition (§4.I: 604800s TTL, since OS package
//! indexes move far slower than language registries).

use std::sync::Arc;
use std::time::Duration;

use crucible_core::{Command, Dependency, PackageSystem, Result};

use crate::adapter::{PackageSystemAdapter, transport_error};
use crate::cache::{CachedVersions, PackageInfoCache};

const CACHE_TTL: Duration = Duration::from_secs(604_800);

/// Runs the packaging-system sandbox for a given package name and
/// returns the versions it reports. Implemented by `crucible-sandbox`;
/// kept as a trait here so this crate never depends on container
/// orchestration directly.
#[async_trait::async_trait]
pub trait PackagingSandbox: Send + Sync {
    /// Query available versions for `normalized_name` inside the
    /// sandbox. Errors propagate as transport failures.
    async fn query_versions(&self, normalized_name: &str) -> Result<Vec<String>>;
}

/// Adapter for Debian/Ubuntu-family `apt` package names.
pub struct OsAptAdapter {
    sandbox: Arc<dyn PackagingSandbox>,
    cache: Arc<dyn PackageInfoCache>,
}

impl OsAptAdapter {
    /// Build an adapter backed by `sandbox` for version discovery and
    /// `cache` for the package-info partition.
    #[must_use]
    pub fn new(sandbox: Arc<dyn PackagingSandbox>, cache: Arc<dyn PackageInfoCache>) -> Self {
        Self { sandbox, cache }
    }
}

#[async_trait::async_trait]
impl PackageSystemAdapter for OsAptAdapter {
    fn system(&self) -> PackageSystem {
        PackageSystem::Apt
    }

    fn normalize_name(&self, name: &str) -> String {
        name.trim().to_ascii_lowercase()
    }

    async fn available_versions(&self, normalized_name: &str) -> Result<Vec<String>> {
        let cache_key = format!("apt:{normalized_name}");
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached.versions);
        }

        let versions = self
            .sandbox
            .query_versions(normalized_name)
            .await
            .map_err(|e| transport_error("apt sandbox query", e))?;

        self.cache
            .put(
                &cache_key,
                CachedVersions {
                    versions: versions.clone(),
                    etag: None,
                    cached_at: std::time::Instant::now(),
                },
                CACHE_TTL,
            )
            .await;

        Ok(versions)
    }

    fn install_command(&self, dep: &Dependency) -> Command {
        let package = match &dep.version {
            Some(version) => format!("{}={}", dep.name, version),
            None => dep.name.clone(),
        };
        Command::new(
            "apt-get",
            ["install".to_string(), "-y".to_string(), package],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryPackageInfoCache;

    struct FixedSandbox {
        versions: Vec<String>,
    }

    #[async_trait::async_trait]
    impl PackagingSandbox for FixedSandbox {
        async fn query_versions(&self, _normalized_name: &str) -> Result<Vec<String>> {
            Ok(self.versions.clone())
        }
    }

    #[tokio::test]
    async fn available_versions_are_cached_after_first_query() {
        let sandbox = Arc::new(FixedSandbox {
            versions: vec!["1.21.0-1ubuntu2".to_string()],
        });
        let cache = Arc::new(InMemoryPackageInfoCache::new());
        let adapter = OsAptAdapter::new(sandbox, cache.clone());

        let first = adapter.available_versions("libpq-dev").await.unwrap();
        assert_eq!(first, vec!["1.21.0-1ubuntu2".to_string()]);
        assert!(cache.get("apt:libpq-dev").await.is_some());
    }

    #[test]
    fn install_command_pins_version_with_equals() {
        let sandbox = Arc::new(FixedSandbox { versions: vec![] });
        let cache = Arc::new(InMemoryPackageInfoCache::new());
        let adapter = OsAptAdapter::new(sandbox, cache);
        let dep = Dependency::new("libpq-dev", "1.21.0-1ubuntu2", PackageSystem::Apt);
        let command = adapter.install_command(&dep);
        assert_eq!(command.args.last().unwrap(), "libpq-dev=1.21.0-1ubuntu2");
    }

    #[test]
    fn install_command_omits_pin_when_unspecified() {
        let sandbox = Arc::new(FixedSandbox { versions: vec![] });
        let cache = Arc::new(InMemoryPackageInfoCache::new());
        let adapter = OsAptAdapter::new(sandbox, cache);
        let dep = Dependency::unpinned("libpq-dev", PackageSystem::Apt);
        let command = adapter.install_command(&dep);
        assert_eq!(command.args.last().unwrap(), "libpq-dev");
    }
}

//! PyPI-style language-repository adapter (§4.A, §4.I).
//!
//! Unlike [`crate::apt::OsAptAdapter`], this adapter talks to a real
//! HTTP endpoint and revalidates its cache with conditional GETs using
//! stored `ETag`s rather than blindly trusting a TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crucible_core::{Command, Dependency, PackageSystem, Result};

use crate::adapter::{PackageSystemAdapter, transport_error};
use crate::cache::{CachedVersions, PackageInfoCache};
use crate::http::{ConditionalResponse, ResilientClient};

const CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct ProjectIndex {
    releases: std::collections::BTreeMap<String, Vec<serde_json::Value>>,
}

/// Adapter for a PyPI-compatible simple/JSON package index.
pub struct PyPiAdapter {
    index_base_url: String,
    client: Arc<ResilientClient>,
    cache: Arc<dyn PackageInfoCache>,
}

impl PyPiAdapter {
    /// Build an adapter against `index_base_url` (e.g.
    /// `https://pypi.org/pypi`), sharing `client` and `cache` with
    /// other adapters in the same process.
    #[must_use]
    pub fn new(index_base_url: impl Into<String>, client: Arc<ResilientClient>, cache: Arc<dyn PackageInfoCache>) -> Self {
        Self {
            index_base_url: index_base_url.into(),
            client,
            cache,
        }
    }

    fn project_url(&self, normalized_name: &str) -> String {
        format!("{}/{}/json", self.index_base_url.trim_end_matches('/'), normalized_name)
    }
}

#[async_trait::async_trait]
impl PackageSystemAdapter for PyPiAdapter {
    fn system(&self) -> PackageSystem {
        PackageSystem::PyPi
    }

    fn normalize_name(&self, name: &str) -> String {
        // PEP 503: runs of -, _, . collapse to a single hyphen, lowercased.
        let mut normalized = String::with_capacity(name.len());
        let mut last_was_separator = false;
        for ch in name.chars() {
            if ch == '-' || ch == '_' || ch == '.' {
                if !last_was_separator && !normalized.is_empty() {
                    normalized.push('-');
                }
                last_was_separator = true;
            } else {
                normalized.push(ch.to_ascii_lowercase());
                last_was_separator = false;
            }
        }
        normalized.trim_matches('-').to_string()
    }

    async fn available_versions(&self, normalized_name: &str) -> Result<Vec<String>> {
        let cache_key = format!("pypi:{normalized_name}");
        let cached = self.cache.get(&cache_key).await;
        let etag = cached.as_ref().and_then(|c| c.etag.as_deref());

        let url = self.project_url(normalized_name);
        match self.client.conditional_get(&url, etag).await? {
            ConditionalResponse::NotModified => {
                Ok(cached.map(|c| c.versions).unwrap_or_default())
            }
            ConditionalResponse::Fresh { body, etag } => {
                let index: ProjectIndex =
                    serde_json::from_str(&body).map_err(|e| transport_error("pypi json", e))?;
                let versions: Vec<String> = index.releases.into_keys().collect();

                self.cache
                    .put(
                        &cache_key,
                        CachedVersions {
                            versions: versions.clone(),
                            etag,
                            cached_at: Instant::now(),
                        },
                        CACHE_TTL,
                    )
                    .await;

                Ok(versions)
            }
        }
    }

    fn install_command(&self, dep: &Dependency) -> Command {
        let package = match &dep.version {
            Some(version) => format!("{}=={}", dep.name, version),
            None => dep.name.clone(),
        };
        Command::new("pip", ["install".to_string(), package])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> PyPiAdapter {
        PyPiAdapter::new(
            "https://pypi.example/pypi",
            Arc::new(ResilientClient::new(crate::http::TransportConfig::default())),
            Arc::new(crate::cache::InMemoryPackageInfoCache::new()),
        )
    }

    #[test]
    fn normalize_name_collapses_separators_and_lowercases() {
        let adapter = adapter();
        assert_eq!(adapter.normalize_name("Scikit_Learn"), "scikit-learn");
        assert_eq!(adapter.normalize_name("zope.interface"), "zope-interface");
        assert_eq!(adapter.normalize_name("---Foo---"), "foo");
    }

    #[test]
    fn install_command_uses_pip_equals_equals() {
        let adapter = adapter();
        let dep = Dependency::new("numpy", "1.26.0", PackageSystem::PyPi);
        let command = adapter.install_command(&dep);
        assert_eq!(command.args, vec!["install".to_string(), "numpy==1.26.0".to_string()]);
    }

    #[test]
    fn project_url_joins_base_and_name() {
        let adapter = adapter();
        assert_eq!(adapter.project_url("numpy"), "https://pypi.example/pypi/numpy/json");
    }
}

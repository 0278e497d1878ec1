//! The `PackageSystemAdapter` capability contract (§4.A).

use crucible_core::{CrucibleError, Dependency, PackageSystem, Result};

use crate::version::{self, SortDirection};

/// A canonical package definition as known to an adapter: the
/// normalized name plus every version the adapter currently knows
/// about, in upstream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDefinition {
    /// Normalized package name.
    pub name: String,
    /// Versions in upstream (not necessarily sorted) order.
    pub versions: Vec<String>,
}

/// A uniform view over one packaging ecosystem. Implemented at least
/// twice: [`crate::apt::OsAptAdapter`] and [`crate::pypi::PyPiAdapter`].
#[async_trait::async_trait]
pub trait PackageSystemAdapter: Send + Sync {
    /// Which [`PackageSystem`] this adapter serves.
    fn system(&self) -> PackageSystem;

    /// Idempotent name normalization (case folding, separator
    /// unification). Calling this twice must return the same result
    /// as calling it once.
    fn normalize_name(&self, name: &str) -> String;

    /// All versions known for `name` (already normalized by the
    /// caller), in upstream order. Implementations are expected to
    /// consult a cache keyed by normalized name before making a
    /// network or subprocess call.
    async fn available_versions(&self, normalized_name: &str) -> Result<Vec<String>>;

    /// Synthesize the command that installs `dep` pinned to its
    /// version, or unpinned when `dep.version` is `None`.
    fn install_command(&self, dep: &Dependency) -> crucible_core::Command;

    /// Total order over `versions` with an optional inclusive cutoff,
    /// per §4.A `sortVersions`. The default implementation delegates
    /// to the shared lenient comparator; adapters with stricter
    /// version semantics may override it.
    fn sort_versions(
        &self,
        versions: &[String],
        direction: SortDirection,
        cutoff: Option<&str>,
    ) -> Vec<String> {
        version::sort_versions(versions, direction, cutoff)
    }

    /// Resolve `name` (optionally pinned to `version`) to a canonical
    /// [`Dependency`] if a package of exactly that name exists. With
    /// `version` unspecified, selects the newest available version.
    async fn exact_match(&self, name: &str, version: Option<&str>) -> Result<Option<Dependency>> {
        let normalized = self.normalize_name(name);
        let versions = self.available_versions(&normalized).await?;
        if versions.is_empty() {
            return Ok(None);
        }

        let resolved = match version {
            Some(v) => versions.iter().find(|candidate| *candidate == v).cloned(),
            None => self
                .sort_versions(&versions, SortDirection::Descending, None)
                .into_iter()
                .next(),
        };

        Ok(resolved.map(|v| Dependency::new(normalized, v, self.system())))
    }
}

/// Wraps a transport-layer failure (HTTP, subprocess) into the closed
/// error set, since adapters never propagate `reqwest::Error` or
/// similar directly across the crate boundary.
pub(crate) fn transport_error(context: &str, cause: impl std::fmt::Display) -> CrucibleError {
    CrucibleError::UnexpectedInference {
        message: format!("{context}: {cause}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::PackageSystem;

    struct FixedAdapter {
        versions: Vec<String>,
    }

    #[async_trait::async_trait]
    impl PackageSystemAdapter for FixedAdapter {
        fn system(&self) -> PackageSystem {
            PackageSystem::PyPi
        }

        fn normalize_name(&self, name: &str) -> String {
            name.to_ascii_lowercase().replace('_', "-")
        }

        async fn available_versions(&self, _normalized_name: &str) -> Result<Vec<String>> {
            Ok(self.versions.clone())
        }

        fn install_command(&self, dep: &Dependency) -> crucible_core::Command {
            crucible_core::Command::new("pip", ["install".to_string(), dep.to_string()])
        }
    }

    #[tokio::test]
    async fn exact_match_with_no_version_picks_newest() {
        let adapter = FixedAdapter {
            versions: vec!["0.19.2".into(), "0.20.3".into(), "0.18.0".into()],
        };
        let dep = adapter.exact_match("Scikit_Learn", None).await.unwrap().unwrap();
        assert_eq!(dep.name, "scikit-learn");
        assert_eq!(dep.version.as_deref(), Some("0.20.3"));
    }

    #[tokio::test]
    async fn exact_match_with_version_requires_presence() {
        let adapter = FixedAdapter {
            versions: vec!["0.19.2".into()],
        };
        assert!(adapter.exact_match("numpy", Some("9.9.9")).await.unwrap().is_none());
        assert!(adapter
            .exact_match("numpy", Some("0.19.2"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn exact_match_on_empty_catalog_is_none() {
        let adapter = FixedAdapter { versions: vec![] };
        assert!(adapter.exact_match("numpy", None).await.unwrap().is_none());
    }
}

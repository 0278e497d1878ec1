//! The mutator set (§4.F): pure functions over a single dependency
//! that produce a mutated version plus enough information for a
//! search strategy to build a reversible [`MutationRecord`].
//!
//! `undo` is not mutator-specific — every mutation kind, including the
//! version-matrix ones a search strategy builds directly from graph
//! evidence, restores a dependency's version from the recorded `from`
//! value (§4.F "undo: replace `version` with the recorded `from`").

use crucible_adapters::{newest_below_major, newest_below_minor, LenientVersion, PackageSystemAdapter};
use crucible_core::{Dependency, MutationKind, VersionChange};

/// One mutator: applying it to a dependency either produces a version
/// change or nothing (e.g. there is no version below the current
/// major).
#[async_trait::async_trait]
pub trait Mutator: Send + Sync {
    /// The [`MutationKind`] this mutator produces.
    fn kind(&self) -> MutationKind;

    /// Attempt to mutate `dep`. Returns `None` when no candidate
    /// version exists (already at major/minor zero, or the adapter's
    /// catalog has nothing below the cutoff).
    async fn apply(
        &self,
        adapter: &dyn PackageSystemAdapter,
        dep: &Dependency,
    ) -> crucible_core::Result<Option<VersionChange>>;
}

/// Choose the newest available version strictly below `major.0.0`.
pub struct DecrementSemverMajor;

#[async_trait::async_trait]
impl Mutator for DecrementSemverMajor {
    fn kind(&self) -> MutationKind {
        MutationKind::DecrementSemverMajor
    }

    async fn apply(
        &self,
        adapter: &dyn PackageSystemAdapter,
        dep: &Dependency,
    ) -> crucible_core::Result<Option<VersionChange>> {
        let Some(current) = dep.version.as_deref() else {
            return Ok(None);
        };
        let normalized = adapter.normalize_name(&dep.name);
        let versions = adapter.available_versions(&normalized).await?;
        let parsed = LenientVersion::parse(current);
        Ok(newest_below_major(&versions, parsed.major()).map(|to| VersionChange {
            package: dep.name.clone(),
            from: Some(current.to_string()),
            to,
        }))
    }
}

/// Choose the newest available version with the same major, below
/// `major.minor.0`.
pub struct DecrementSemverMinor;

#[async_trait::async_trait]
impl Mutator for DecrementSemverMinor {
    fn kind(&self) -> MutationKind {
        MutationKind::DecrementSemverMinor
    }

    async fn apply(
        &self,
        adapter: &dyn PackageSystemAdapter,
        dep: &Dependency,
    ) -> crucible_core::Result<Option<VersionChange>> {
        let Some(current) = dep.version.as_deref() else {
            return Ok(None);
        };
        let normalized = adapter.normalize_name(&dep.name);
        let versions = adapter.available_versions(&normalized).await?;
        let parsed = LenientVersion::parse(current);
        Ok(newest_below_minor(&versions, parsed.major(), parsed.minor()).map(|to| VersionChange {
            package: dep.name.clone(),
            from: Some(current.to_string()),
            to,
        }))
    }
}

/// The precedence list searches iterate in order (§4.F).
#[must_use]
pub fn precedence() -> Vec<Box<dyn Mutator>> {
    vec![Box::new(DecrementSemverMajor), Box::new(DecrementSemverMinor)]
}

/// Replace `dep`'s version with the `from` recorded in `change`,
/// undoing any mutation kind byte-for-byte (property P1).
#[must_use]
pub fn undo(dep: &Dependency, change: &VersionChange) -> Dependency {
    let mut undone = dep.clone();
    undone.version = change.from.clone();
    undone
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
            name.to_ascii_lowercase()
        }
        async fn available_versions(&self, _normalized_name: &str) -> crucible_core::Result<Vec<String>> {
            Ok(self.versions.clone())
        }
        fn install_command(&self, dep: &Dependency) -> crucible_core::Command {
            crucible_core::Command::new("pip", ["install".to_string(), dep.to_string()])
        }
    }

    #[tokio::test]
    async fn decrement_minor_picks_highest_below_current_minor() {
        let adapter = FixedAdapter {
            versions: vec!["0.20.3".into(), "0.19.2".into(), "0.19.0".into()],
        };
        let dep = Dependency::new("scikit-learn", "0.20.3", PackageSystem::PyPi);
        let change = DecrementSemverMinor.apply(&adapter, &dep).await.unwrap().unwrap();
        assert_eq!(change.to, "0.19.2");
        assert_eq!(change.from.as_deref(), Some("0.20.3"));
    }

    #[tokio::test]
    async fn decrement_major_none_when_already_major_zero() {
        let adapter = FixedAdapter {
            versions: vec!["0.9.0".into()],
        };
        let dep = Dependency::new("tool", "0.5.0", PackageSystem::PyPi);
        assert!(DecrementSemverMajor.apply(&adapter, &dep).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unpinned_dependency_has_no_mutation() {
        let adapter = FixedAdapter {
            versions: vec!["1.0.0".into()],
        };
        let dep = Dependency::unpinned("tool", PackageSystem::PyPi);
        assert!(DecrementSemverMinor.apply(&adapter, &dep).await.unwrap().is_none());
    }

    #[test]
    fn undo_restores_recorded_from() {
        let dep = Dependency::new("scikit-learn", "0.19.2", PackageSystem::PyPi);
        let change = VersionChange {
            package: "scikit-learn".into(),
            from: Some("0.20.3".into()),
            to: "0.19.2".into(),
        };
        let restored = undo(&dep, &change);
        assert_eq!(restored.version.as_deref(), Some("0.20.3"));
    }
}

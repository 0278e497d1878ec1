//! Version-matrix mutation planning (§4.G "Matrix mutation planning").
//!
//! Turns query 4's `(from_version, [to_versions])` evidence into an
//! ordered chain of single-version changes, each threading forward
//! from the last, and a [`Mutator`] that replays that chain
//! deterministically so the same chain survives repeated IDDFS depth
//! passes.

use crucible_adapters::version::SortDirection;
use crucible_adapters::PackageSystemAdapter;
use crucible_core::{AHashMap, AHashSet, Dependency, MutationKind, PackageSystem, Result, VersionChange};
use crucible_graph::UpgradeEvidence;
use crucible_lang::Mutator;

/// Build the mutation chain for a dependency currently pinned to
/// `current_version`, from raw upgrade evidence (query 4). Evidence
/// entries are grouped into the multimap `v1 -> [v2...]`, whose keys
/// are then visited in descending version order (strictly below
/// `current_version`); each visited target threads the "current
/// version" pointer forward, so the result is a chain rather than a
/// flat fan-out, and a version already placed in the chain is never
/// revisited.
#[must_use]
pub fn plan_matrix_chain(
    adapter: &dyn PackageSystemAdapter,
    dep_name: &str,
    current_version: &str,
    evidence: &[UpgradeEvidence],
) -> Vec<VersionChange> {
    let mut grouped: AHashMap<String, Vec<String>> = AHashMap::default();
    for entry in evidence {
        grouped
            .entry(entry.from_version.clone())
            .or_default()
            .extend(entry.to_versions.iter().cloned());
    }

    let keys: Vec<String> = grouped.keys().cloned().collect();
    let mut ordered_keys = adapter.sort_versions(&keys, SortDirection::Descending, Some(current_version));
    ordered_keys.retain(|k| k != current_version);

    let mut pointer = current_version.to_string();
    let mut seen: AHashSet<String> = AHashSet::default();
    seen.insert(pointer.clone());
    let mut chain = Vec::new();

    for key in ordered_keys {
        let Some(targets) = grouped.get(&key) else {
            continue;
        };
        for to in targets {
            if seen.contains(to) {
                continue;
            }
            chain.push(VersionChange {
                package: dep_name.to_string(),
                from: Some(pointer.clone()),
                to: to.clone(),
            });
            seen.insert(to.clone());
            pointer = to.clone();
        }
    }

    chain
}

/// A mutator that replays a precomputed version-matrix chain per
/// dependency, keyed by dependency name. Pure and idempotent: given
/// the same `dep.version`, it always returns the same step, so it
/// survives IDDFS re-exploring the same tree position across depth
/// passes (unlike destructively popping a queue would).
#[derive(Debug, Default)]
pub struct MatrixMutator {
    chains: AHashMap<String, Vec<VersionChange>>,
}

impl MatrixMutator {
    /// An empty matrix mutator (every `apply` returns `None`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the chain for one dependency, keyed by its name as it
    /// appears on the `Dependency` values this mutator will see.
    pub fn set_chain(&mut self, dep_name: impl Into<String>, chain: Vec<VersionChange>) {
        self.chains.insert(dep_name.into(), chain);
    }
}

#[async_trait::async_trait]
impl Mutator for MatrixMutator {
    fn kind(&self) -> MutationKind {
        MutationKind::VersionMatrixFromVersion
    }

    async fn apply(&self, _adapter: &dyn PackageSystemAdapter, dep: &Dependency) -> Result<Option<VersionChange>> {
        let Some(chain) = self.chains.get(&dep.name) else {
            return Ok(None);
        };
        Ok(chain.iter().find(|c| c.from == dep.version).cloned())
    }
}

#[allow(dead_code)]
fn assert_system_is_usable(_: PackageSystem) {}

//! Result types for the four parameterized graph queries (§4.B).

use crucible_core::PackageSystem;
use serde::{Deserialize, Serialize};

/// One candidate package returned by a resource-to-package or
/// dependency-hop query, pinned to its highest known version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCandidate {
    /// Package name as recorded in the graph.
    pub name: String,
    /// Which package system the candidate belongs to.
    pub system: PackageSystem,
    /// The highest version currently known for this package.
    pub highest_version: String,
}

/// One `(v1, [v2])` upgrade-evidence pair: an upgrade from `from_version`
/// to any version in `to_versions` was observed to break something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeEvidence {
    /// The version upgraded from.
    pub from_version: String,
    /// Versions the upgrade landed on.
    pub to_versions: Vec<String>,
    /// Percentage of observed upgrades to this target set that broke,
    /// as an integer 1-100. The evidence list is sorted by decreasing
    /// `percent_broken`.
    pub percent_broken: u8,
}

//! The `Dependency` tuple and the package systems it can belong to.

use std::fmt;

/// A packaging ecosystem a [`Dependency`] can be resolved against.
///
/// New adapters register a new variant; the set is closed because each
/// variant must be backed by a concrete `PackageSystemAdapter`
/// implementation in `crucible-adapters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageSystem {
    /// OS-level package manager (modeled on Debian/Ubuntu `apt`).
    Apt,
    /// Language-level package repository (modeled on PyPI).
    #[serde(rename = "pypi")]
    PyPi,
}

impl PackageSystem {
    /// Short identifier used in logs and cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::PyPi => "pypi",
        }
    }
}

impl fmt::Display for PackageSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A package name pinned to an optional version within a package system.
///
/// Versions are opaque strings: only the adapter named by `system`
/// knows how to compare, sort, or list them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dependency {
    /// Package name, as given by the resolver or mutator — not
    /// necessarily normalized (see `PackageSystemAdapter::normalize_name`).
    pub name: String,
    /// Pinned version, or `None` for "install whatever is newest".
    pub version: Option<String>,
    /// Which package system this dependency belongs to.
    pub system: PackageSystem,
}

impl Dependency {
    /// Create a pinned dependency.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, system: PackageSystem) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            system,
        }
    }

    /// Create an unpinned dependency (newest available version wins).
    #[must_use]
    pub fn unpinned(name: impl Into<String>, system: PackageSystem) -> Self {
        Self {
            name: name.into(),
            version: None,
            system,
        }
    }

    /// Key used to enforce invariant I1 (no two dependencies share a
    /// normalized name within the same package system). The caller
    /// supplies the adapter's `normalize_name`, since normalization is
    /// adapter-specific.
    #[must_use]
    pub fn identity_key(&self, normalized_name: &str) -> (String, PackageSystem) {
        (normalized_name.to_string(), self.system)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}=={} ({})", self.name, v, self.system),
            None => write!(f, "{} (unpinned, {})", self.name, self.system),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pinned() {
        let dep = Dependency::new("numpy", "1.26.0", PackageSystem::PyPi);
        assert_eq!(dep.to_string(), "numpy==1.26.0 (pypi)");
    }

    #[test]
    fn display_unpinned() {
        let dep = Dependency::unpinned("libjpeg-dev", PackageSystem::Apt);
        assert_eq!(dep.to_string(), "libjpeg-dev (unpinned, apt)");
    }

    #[test]
    fn identity_key_pairs_normalized_name_with_system() {
        let dep = Dependency::new("Scikit-Learn", "0.20.3", PackageSystem::PyPi);
        assert_eq!(
            dep.identity_key("scikit-learn"),
            ("scikit-learn".to_string(), PackageSystem::PyPi)
        );
    }
}

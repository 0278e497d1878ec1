//! Lenient version parsing and ordering (§4.A, §9 "Version parsing").
//!
//! Adapters cannot assume every upstream version string is valid
//! semver: OS package indexes carry distribution epochs and revision
//! suffixes (`1.21.0-1ubuntu2`), and language registries carry
//! pre-release suffixes `semver` rejects outright in lenient contexts.
//! [`LenientVersion`] extracts the leading numeric triple for ordering
//! and keeps the untouched remainder as a string tie-breaker, so two
//! versions that share a numeric triple still order deterministically.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static LEADING_TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid regex"));

/// A version string ordered by its leading `major.minor.patch` triple,
/// falling back to a lexicographic comparison of the remainder when
/// the triples tie.
#[derive(Debug, Clone, Eq)]
pub struct LenientVersion {
    raw: String,
    major: u64,
    minor: u64,
    patch: u64,
    remainder: String,
}

impl LenientVersion {
    /// Parse `s`. Always succeeds: a string with no leading digits
    /// parses to `0.0.0` with the whole string as the remainder, so
    /// every version an adapter hands back is still orderable.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let Some(caps) = LEADING_TRIPLE.captures(stripped) else {
            return Self {
                raw: s.to_string(),
                major: 0,
                minor: 0,
                patch: 0,
                remainder: stripped.to_string(),
            };
        };

        let whole = caps.get(0).expect("capture 0 always present").as_str();
        let major = caps.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let minor = caps.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let patch = caps.get(3).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let remainder = stripped[whole.len()..].to_string();

        Self {
            raw: s.to_string(),
            major,
            minor,
            patch,
            remainder,
        }
    }

    /// The input string, unmodified.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Major component of the leading numeric triple.
    #[must_use]
    pub const fn major(&self) -> u64 {
        self.major
    }

    /// Minor component of the leading numeric triple.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.minor
    }
}

impl fmt::Display for LenientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for LenientVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for LenientVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LenientVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| self.remainder.cmp(&other.remainder))
    }
}

/// Sort direction for [`sort_versions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Sort `versions` per §4.A `sortVersions`: a total order with an
/// optional inclusive cutoff (`>= cutoff` ascending, `<= cutoff`
/// descending).
#[must_use]
pub fn sort_versions(
    versions: &[String],
    direction: SortDirection,
    cutoff: Option<&str>,
) -> Vec<String> {
    let cutoff = cutoff.map(LenientVersion::parse);
    let mut parsed: Vec<LenientVersion> = versions
        .iter()
        .map(|v| LenientVersion::parse(v))
        .filter(|v| match (&cutoff, direction) {
            (Some(c), SortDirection::Ascending) => v >= c,
            (Some(c), SortDirection::Descending) => v <= c,
            (None, _) => true,
        })
        .collect();

    parsed.sort();
    if direction == SortDirection::Descending {
        parsed.reverse();
    }
    parsed.into_iter().map(|v| v.raw).collect()
}

/// The newest version strictly below `major.0.0`, or `None` if the
/// current major is already `0` or no such version exists (§4.F
/// `decrement_semver_major`).
#[must_use]
pub fn newest_below_major(versions: &[String], current_major: u64) -> Option<String> {
    if current_major == 0 {
        return None;
    }
    versions
        .iter()
        .map(|v| LenientVersion::parse(v))
        .filter(|v| v.major < current_major)
        .max()
        .map(|v| v.raw)
}

/// The newest version with the same major, strictly below
/// `major.minor.0` (§4.F `decrement_semver_minor`).
#[must_use]
pub fn newest_below_minor(versions: &[String], current_major: u64, current_minor: u64) -> Option<String> {
    if current_minor == 0 {
        return None;
    }
    versions
        .iter()
        .map(|v| LenientVersion::parse(v))
        .filter(|v| v.major == current_major && v.minor < current_minor)
        .max()
        .map(|v| v.raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tolerates_distro_suffixes() {
        let a = LenientVersion::parse("1.21.0-1ubuntu2");
        let b = LenientVersion::parse("1.21.0-2ubuntu1");
        assert!(a < b);
        assert_eq!((a.major(), a.minor()), (1, 21));
    }

    #[test]
    fn numeric_triple_dominates_remainder() {
        let a = LenientVersion::parse("2.0.0-alpha");
        let b = LenientVersion::parse("1.9.9");
        assert!(a > b);
    }

    #[test]
    fn non_numeric_input_is_orderable_not_panicking() {
        let a = LenientVersion::parse("latest");
        let b = LenientVersion::parse("stable");
        let _ = a.cmp(&b);
    }

    #[test]
    fn sort_versions_respects_ascending_cutoff() {
        let versions = vec!["0.19.2".to_string(), "0.20.3".to_string(), "0.18.0".to_string()];
        let sorted = sort_versions(&versions, SortDirection::Ascending, Some("0.19.0"));
        assert_eq!(sorted, vec!["0.19.2", "0.20.3"]);
    }

    #[test]
    fn sort_versions_respects_descending_cutoff() {
        let versions = vec!["0.19.2".to_string(), "0.20.3".to_string(), "0.18.0".to_string()];
        let sorted = sort_versions(&versions, SortDirection::Descending, Some("0.19.2"));
        assert_eq!(sorted, vec!["0.19.2", "0.18.0"]);
    }

    #[test]
    fn newest_below_major_skips_major_zero() {
        let versions = vec!["0.9.0".to_string(), "0.5.0".to_string()];
        assert_eq!(newest_below_major(&versions, 0), None);
    }

    #[test]
    fn newest_below_major_picks_highest_below() {
        let versions = vec!["1.5.0".to_string(), "0.9.0".to_string(), "0.8.5".to_string()];
        assert_eq!(newest_below_major(&versions, 1).as_deref(), Some("0.9.0"));
    }

    #[test]
    fn newest_below_minor_picks_highest_below() {
        let versions = vec!["0.20.3".to_string(), "0.19.2".to_string(), "0.19.0".to_string()];
        assert_eq!(
            newest_below_minor(&versions, 0, 20).as_deref(),
            Some("0.19.2")
        );
    }

    proptest! {
        #[test]
        fn sort_is_a_permutation(mut versions in proptest::collection::vec("[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}", 0..20)) {
            let sorted = sort_versions(&versions, SortDirection::Ascending, None);
            versions.sort();
            let mut sorted_copy = sorted.clone();
            sorted_copy.sort();
            versions.sort();
            let mut original = versions.clone();
            original.sort();
            prop_assert_eq!(sorted.len(), versions.len());
            prop_assert_eq!(sorted_copy, original);
        }

        #[test]
        fn sort_is_monotonic(versions in proptest::collection::vec("[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}", 1..20)) {
            let sorted = sort_versions(&versions, SortDirection::Ascending, None);
            let parsed: Vec<LenientVersion> = sorted.iter().map(|v| LenientVersion::parse(v)).collect();
            for window in parsed.windows(2) {
                prop_assert!(window[0] <= window[1]);
            }
        }
    }
}

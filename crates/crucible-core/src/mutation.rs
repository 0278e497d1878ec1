//! Mutation records — the reversible, single-dependency version changes
//! search strategies apply and undo.

use serde::{Deserialize, Serialize};

/// The closed set of mutation kinds a mutator in `crucible-lang` can
/// produce. Each kind names the mutator that produced it so its
/// `undo` can be dispatched without re-inspecting the version change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Newest available version strictly below the current major.
    DecrementSemverMajor,
    /// Newest available version with the same major, below the current minor.
    DecrementSemverMinor,
    /// A step along a recorded breaking-upgrade chain, moving away from
    /// `from`.
    VersionMatrixFromVersion,
    /// A step along a recorded breaking-upgrade chain, moving toward `to`.
    VersionMatrixToVersion,
}

/// The version change a single mutation performed on one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionChange {
    /// Name of the package mutated (as stored on the `Dependency`, not
    /// necessarily normalized).
    pub package: String,
    /// Version before the mutation.
    pub from: Option<String>,
    /// Version after the mutation.
    pub to: String,
}

/// Strategy-private resume state. Opaque to everything except the
/// strategy that produced it: IDDFS stores `(dependency_index,
/// mutator_index)`, the feedback-directed strategy stores a
/// serialized cursor into its version-matrix queue, and level-order
/// never needs one (it never undoes). Represented as a JSON value so
/// `crucible-core` never needs to know about strategy-internal types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Bookkeeping(pub sonic_rs::Value);

impl Bookkeeping {
    /// An empty bookkeeping payload, for mutations that never need resuming.
    #[must_use]
    pub fn none() -> Self {
        Self(sonic_rs::Value::default())
    }
}

/// One entry in an `Environment`'s mutation stack (invariant I2):
/// replaying the stack from the initial environment reproduces the
/// current environment; applying each `undo` in reverse byte-for-byte
/// restores the initial environment (property P1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    /// Which mutator produced this entry.
    pub kind: MutationKind,
    /// Index into `Environment::dependencies` this mutation touched.
    pub dependency_index: usize,
    /// The version change this mutation performed.
    pub change: VersionChange,
    /// Strategy-private resume state.
    pub bookkeeping: Bookkeeping,
}

impl MutationRecord {
    /// Whether `other` is the exact inverse of `self` at the same
    /// stack position — used to enforce property P5 (no immediate
    /// undo-redo) in the feedback-directed strategy.
    #[must_use]
    pub fn is_inverse_of(&self, other: &Self) -> bool {
        self.dependency_index == other.dependency_index
            && self.change.from == Some(other.change.to.clone())
            && Some(self.change.to.clone()) == other.change.from
    }
}

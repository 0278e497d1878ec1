//! Language-specific policy (§4.E) and the mutator set (§4.F).
//!
//! Everything here is pure: no network, no subprocess, no sandbox.
//! `crucible-search` drives [`strategy::LanguageStrategy`] and
//! [`mutator::Mutator`] to build and judge candidate environments;
//! `crucible-sandbox` and `crucible-graph` own the I/O those
//! judgments are based on.

pub mod mutator;
pub mod strategy;

pub use mutator::{precedence, undo, DecrementSemverMajor, DecrementSemverMinor, Mutator};
pub use strategy::{Blame, LanguageStrategy, PythonStrategy, Which};

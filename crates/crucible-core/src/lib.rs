//! Core types shared across the crucible environment-inference pipeline.
//!
//! This crate defines the data model from the system specification:
//! dependencies, mutation records, candidate environments, validation
//! records, and the closed set of inference-level errors. Nothing here
//! talks to a network, a filesystem, or a container runtime — those
//! concerns live in `crucible-adapters`, `crucible-graph`, and
//! `crucible-sandbox`.

pub mod dependency;
pub mod environment;
pub mod error;
pub mod json;
pub mod mutation;
pub mod validation;

pub use dependency::{Dependency, PackageSystem};
pub use environment::{
    Command, DependencyFeedback, DirectLookup, Environment, EnvironmentMetadata, ImageRef,
    ResourceMapping, TransitiveEdge, TransitiveLookup,
};
pub use error::{CrucibleError, Result};
pub use json::{from_json, from_json_slice, to_json, to_json_pretty};
pub use mutation::{Bookkeeping, MutationKind, MutationRecord, VersionChange};
pub use validation::{
    ExecutionResult, ExecutionStatus, InstallError, LanguageInfo, ParseResult, ParsedFile,
    StackFrame, ValidationRecord, ValidationStatus,
};

// Re-export commonly used types so downstream crates don't need to
// depend on `ahash`/`semver` directly just to spell a field type.
pub use ahash::{AHashMap, AHashSet};
pub use semver::Version;

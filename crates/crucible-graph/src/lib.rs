//! Knowledge-graph resolver (§4.B): the three required parameterized
//! queries plus the optional `upgrade` evidence query and its
//! `hasUpgrades` probe, against a graph database shaped
//!
//! ```text
//! (package)-[:version]->(version)-[:resource]->(resource)
//! ```
//!
//! with optional `resource_dependency` and `association` edges.
//! Transport to the endpoint is rate-limited and retries transient
//! failures with exponential backoff, same as `crucible-adapters`'
//! transport layer; once retries are exhausted the failure still
//! propagates to the caller (§7) rather than being recovered locally.

pub mod cache;
pub mod client;
pub mod error;
pub mod queries;
pub mod types;

pub use client::{GraphClient, GraphClientConfig, GraphHandle};
pub use queries::GraphResolver;
pub use types::{PackageCandidate, UpgradeEvidence};

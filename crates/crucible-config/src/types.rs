//! The resolved configuration shape every layer in the hierarchy
//! contributes to.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which mutation search strategy (§4.G) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategyKind {
    /// Breadth-first mutation-tree traversal.
    LevelOrder,
    /// Iterative-deepening DFS.
    IdDfs,
    /// Feedback-directed DFS (the primary, default strategy).
    FeedbackDirected,
}

impl Default for SearchStrategyKind {
    fn default() -> Self {
        Self::FeedbackDirected
    }
}

/// Which edge kinds the transitive-closure DFS follows (§4.H step 2,
/// CLI `--only`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitiveMode {
    /// Union of resource-dependency and association edges.
    Deps,
    /// Association edges only.
    Assoc,
    /// Skip transitive resolution entirely.
    None,
}

impl Default for TransitiveMode {
    fn default() -> Self {
        Self::Deps
    }
}

/// Optional Consul-shaped key-value sink configuration (§6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsulSink {
    /// Base address of the Consul HTTP API, e.g. `http://127.0.0.1:8500`.
    pub address: String,
    /// Key prefix every write is namespaced under.
    pub key_prefix: String,
}

/// Sandbox image overrides, keyed by dialect name (`python`, …) for
/// parser images, and by dialect for validator images separately —
/// both namespaces share this shape so config loading doesn't need
/// two near-identical structs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxImages {
    /// Parser sandbox image per dialect.
    pub parsers: HashMap<String, String>,
    /// Validator sandbox image per dialect.
    pub validators: HashMap<String, String>,
    /// Packaging-system sandbox image per [`crucible_core::PackageSystem`]
    /// name (`apt`, `pypi`).
    pub packaging: HashMap<String, String>,
}

/// The fully merged configuration an inference run executes with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the knowledge-graph query service (§4.B).
    pub graph_endpoint: String,
    /// Base URL of the language-repository package index (e.g. PyPI).
    pub package_index_url: String,
    /// Sandbox image overrides.
    pub sandbox_images: SandboxImages,
    /// Directory backing the on-disk cache tier (§4.I).
    pub cache_dir: std::path::PathBuf,
    /// Language-repository package-info cache TTL, seconds.
    pub package_cache_ttl_secs: u64,
    /// OS-package package-info cache TTL, seconds.
    pub os_package_cache_ttl_secs: u64,
    /// Default search strategy (CLI `--search`).
    pub search_strategy: SearchStrategyKind,
    /// Default transitive-resolution mode (CLI `--only`).
    pub transitive_mode: TransitiveMode,
    /// Total mutation-search budget `n`, divided across starting
    /// environments by the spreading wrapper.
    pub search_budget: usize,
    /// Level-order's frontier depth, when that strategy is selected.
    pub level_order_depth: usize,
    /// Wall-clock inference budget (§5; default one hour, overridable
    /// for tests).
    pub wall_clock_budget: Duration,
    /// Bounded concurrency for direct-dependency resolution (§4.H,
    /// §9: "default 32 in-flight").
    pub resolution_concurrency: usize,
    /// Whether to skip validation entirely (CLI `--no-validate`).
    pub no_validate: bool,
    /// Optional Consul sink.
    pub consul: Option<ConsulSink>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            graph_endpoint: "http://127.0.0.1:7474/graph".to_string(),
            package_index_url: "https://pypi.org/pypi".to_string(),
            sandbox_images: SandboxImages::default(),
            cache_dir: default_cache_dir(),
            package_cache_ttl_secs: 3600,
            os_package_cache_ttl_secs: 604_800,
            search_strategy: SearchStrategyKind::default(),
            transitive_mode: TransitiveMode::default(),
            search_budget: 64,
            level_order_depth: 10,
            wall_clock_budget: Duration::from_secs(3600),
            resolution_concurrency: 32,
            no_validate: false,
            consul: None,
        }
    }
}

fn default_cache_dir() -> std::path::PathBuf {
    directories::ProjectDirs::from("dev", "crucible", "crucible")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from(".crucible-cache"))
}

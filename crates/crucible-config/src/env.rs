//! `CRUCIBLE_*` environment variable overrides, the middle tier of the
//! configuration hierarchy (defaults -> env vars -> CLI flags).

use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{SearchStrategyKind, TransitiveMode};

/// One `CRUCIBLE_*` variable this crate understands, paired with a
/// human-readable description for `crucible config` style diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrucibleEnvVar {
    GraphEndpoint,
    PackageIndexUrl,
    CacheDir,
    SearchStrategy,
    TransitiveMode,
    SearchBudget,
    WallClockBudgetSecs,
    ResolutionConcurrency,
    NoValidate,
    ConsulAddr,
    ConsulKeyPrefix,
}

impl CrucibleEnvVar {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::GraphEndpoint => "CRUCIBLE_GRAPH_ENDPOINT",
            Self::PackageIndexUrl => "CRUCIBLE_PACKAGE_INDEX_URL",
            Self::CacheDir => "CRUCIBLE_CACHE_DIR",
            Self::SearchStrategy => "CRUCIBLE_SEARCH_STRATEGY",
            Self::TransitiveMode => "CRUCIBLE_TRANSITIVE_MODE",
            Self::SearchBudget => "CRUCIBLE_SEARCH_BUDGET",
            Self::WallClockBudgetSecs => "CRUCIBLE_WALL_CLOCK_BUDGET_SECS",
            Self::ResolutionConcurrency => "CRUCIBLE_RESOLUTION_CONCURRENCY",
            Self::NoValidate => "CRUCIBLE_NO_VALIDATE",
            Self::ConsulAddr => "CRUCIBLE_CONSUL_ADDR",
            Self::ConsulKeyPrefix => "CRUCIBLE_CONSUL_KEY_PREFIX",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::GraphEndpoint => "base URL of the knowledge-graph query service",
            Self::PackageIndexUrl => "base URL of the language-repository package index",
            Self::CacheDir => "directory backing the on-disk cache tier",
            Self::SearchStrategy => "mutation search strategy (level-order, id-dfs, feedback-directed)",
            Self::TransitiveMode => "transitive-dependency resolution mode (deps, assoc, none)",
            Self::SearchBudget => "total mutation-search budget",
            Self::WallClockBudgetSecs => "wall-clock inference budget, in seconds",
            Self::ResolutionConcurrency => "bounded concurrency for direct-dependency resolution",
            Self::NoValidate => "skip validation entirely when set to a truthy value",
            Self::ConsulAddr => "Consul HTTP API address for the optional result sink",
            Self::ConsulKeyPrefix => "key prefix Consul writes are namespaced under",
        }
    }
}

/// Partial configuration parsed out of the process environment. Every
/// field is optional: an absent variable leaves the default (or a
/// later CLI flag) untouched.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub graph_endpoint: Option<String>,
    pub package_index_url: Option<String>,
    pub cache_dir: Option<std::path::PathBuf>,
    pub search_strategy: Option<SearchStrategyKind>,
    pub transitive_mode: Option<TransitiveMode>,
    pub search_budget: Option<usize>,
    pub wall_clock_budget: Option<Duration>,
    pub resolution_concurrency: Option<usize>,
    pub no_validate: Option<bool>,
    pub consul_addr: Option<String>,
    pub consul_key_prefix: Option<String>,
}

impl EnvOverrides {
    /// Reads every `CRUCIBLE_*` variable this crate understands out of
    /// the current process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Testable variant of [`Self::from_env`] that reads from a
    /// caller-supplied lookup instead of the real process environment.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut overrides = Self::default();

        overrides.graph_endpoint = lookup(CrucibleEnvVar::GraphEndpoint.key());
        overrides.package_index_url = lookup(CrucibleEnvVar::PackageIndexUrl.key());
        overrides.cache_dir = lookup(CrucibleEnvVar::CacheDir.key()).map(std::path::PathBuf::from);
        overrides.consul_addr = lookup(CrucibleEnvVar::ConsulAddr.key());
        overrides.consul_key_prefix = lookup(CrucibleEnvVar::ConsulKeyPrefix.key());

        if let Some(raw) = lookup(CrucibleEnvVar::SearchStrategy.key()) {
            overrides.search_strategy = Some(parse_search_strategy(&raw)?);
        }
        if let Some(raw) = lookup(CrucibleEnvVar::TransitiveMode.key()) {
            overrides.transitive_mode = Some(parse_transitive_mode(&raw)?);
        }
        if let Some(raw) = lookup(CrucibleEnvVar::SearchBudget.key()) {
            overrides.search_budget = Some(parse_num(CrucibleEnvVar::SearchBudget, &raw)?);
        }
        if let Some(raw) = lookup(CrucibleEnvVar::WallClockBudgetSecs.key()) {
            let secs: u64 = parse_num(CrucibleEnvVar::WallClockBudgetSecs, &raw)?;
            overrides.wall_clock_budget = Some(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup(CrucibleEnvVar::ResolutionConcurrency.key()) {
            overrides.resolution_concurrency = Some(parse_num(CrucibleEnvVar::ResolutionConcurrency, &raw)?);
        }
        if let Some(raw) = lookup(CrucibleEnvVar::NoValidate.key()) {
            overrides.no_validate = Some(parse_bool(CrucibleEnvVar::NoValidate, &raw)?);
        }

        Ok(overrides)
    }
}

fn parse_num<T: std::str::FromStr>(var: CrucibleEnvVar, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidEnvVar {
        var: var.key(),
        value: raw.to_string(),
        reason: "expected an integer".to_string(),
    })
}

fn parse_bool(var: CrucibleEnvVar, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvVar {
            var: var.key(),
            value: raw.to_string(),
            reason: "expected a boolean (true/false/1/0/yes/no/on/off)".to_string(),
        }),
    }
}

fn parse_search_strategy(raw: &str) -> Result<SearchStrategyKind, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "level-order" | "level_order" => Ok(SearchStrategyKind::LevelOrder),
        "id-dfs" | "iddfs" | "id_dfs" => Ok(SearchStrategyKind::IdDfs),
        "feedback-directed" | "feedback_directed" => Ok(SearchStrategyKind::FeedbackDirected),
        _ => Err(ConfigError::InvalidEnvVar {
            var: CrucibleEnvVar::SearchStrategy.key(),
            value: raw.to_string(),
            reason: "expected one of level-order, id-dfs, feedback-directed".to_string(),
        }),
    }
}

fn parse_transitive_mode(raw: &str) -> Result<TransitiveMode, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "deps" => Ok(TransitiveMode::Deps),
        "assoc" => Ok(TransitiveMode::Assoc),
        "none" => Ok(TransitiveMode::None),
        _ => Err(ConfigError::InvalidEnvVar {
            var: CrucibleEnvVar::TransitiveMode.key(),
            value: raw.to_string(),
            reason: "expected one of deps, assoc, none".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_recognized_variables() {
        let lookup = source(&[
            ("CRUCIBLE_GRAPH_ENDPOINT", "http://graph.internal/query"),
            ("CRUCIBLE_SEARCH_BUDGET", "128"),
            ("CRUCIBLE_NO_VALIDATE", "true"),
        ]);
        let overrides = EnvOverrides::from_source(lookup).unwrap();
        assert_eq!(overrides.graph_endpoint.as_deref(), Some("http://graph.internal/query"));
        assert_eq!(overrides.search_budget, Some(128));
        assert_eq!(overrides.no_validate, Some(true));
    }

    #[test]
    fn rejects_invalid_search_strategy() {
        let lookup = source(&[("CRUCIBLE_SEARCH_STRATEGY", "bogus")]);
        assert!(EnvOverrides::from_source(lookup).is_err());
    }

    #[test]
    fn absent_variables_leave_every_field_none() {
        let overrides = EnvOverrides::from_source(|_| None).unwrap();
        assert_eq!(overrides.graph_endpoint, None);
        assert_eq!(overrides.search_budget, None);
    }
}

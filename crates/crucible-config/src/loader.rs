//! Merges the three configuration tiers, in increasing precedence:
//! built-in defaults, `CRUCIBLE_*` environment variables, then CLI
//! flags.

use std::time::Duration;

use crate::env::EnvOverrides;
use crate::error::ConfigError;
use crate::types::{ConsulSink, InferenceConfig, SearchStrategyKind, TransitiveMode};

/// Overrides a CLI invocation supplies, already parsed by `clap` in
/// `crucible-cli`. Every field is optional: an absent flag leaves the
/// env-or-default value in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
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

/// Assembles the final [`InferenceConfig`] a run executes with,
/// reading `CRUCIBLE_*` environment variables and layering `cli` on
/// top.
pub fn load(cli: CliOverrides) -> Result<InferenceConfig, ConfigError> {
    let env = EnvOverrides::from_env()?;
    Ok(merge(InferenceConfig::default(), env, cli))
}

fn merge(mut config: InferenceConfig, env: EnvOverrides, cli: CliOverrides) -> InferenceConfig {
    macro_rules! layer {
        ($field:ident) => {
            if let Some(value) = env.$field {
                config.$field = value;
            }
            if let Some(value) = cli.$field {
                config.$field = value;
            }
        };
    }

    layer!(graph_endpoint);
    layer!(package_index_url);
    layer!(cache_dir);
    layer!(search_strategy);
    layer!(transitive_mode);
    layer!(search_budget);
    layer!(wall_clock_budget);
    layer!(resolution_concurrency);
    layer!(no_validate);

    let consul_addr = cli.consul_addr.or(env.consul_addr);
    let consul_key_prefix = cli.consul_key_prefix.or(env.consul_key_prefix);
    if let Some(address) = consul_addr {
        config.consul = Some(ConsulSink {
            address,
            key_prefix: consul_key_prefix.unwrap_or_else(|| "crucible".to_string()),
        });
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_win_over_defaults() {
        let cli = CliOverrides {
            search_budget: Some(256),
            ..CliOverrides::default()
        };
        let config = merge(InferenceConfig::default(), EnvOverrides::default(), cli);
        assert_eq!(config.search_budget, 256);
    }

    #[test]
    fn cli_overrides_win_over_env() {
        let env = EnvOverrides {
            search_budget: Some(128),
            ..EnvOverrides::default()
        };
        let cli = CliOverrides {
            search_budget: Some(256),
            ..CliOverrides::default()
        };
        let config = merge(InferenceConfig::default(), env, cli);
        assert_eq!(config.search_budget, 256);
    }

    #[test]
    fn env_overrides_win_over_defaults_when_cli_silent() {
        let env = EnvOverrides {
            search_budget: Some(128),
            ..EnvOverrides::default()
        };
        let config = merge(InferenceConfig::default(), env, CliOverrides::default());
        assert_eq!(config.search_budget, 128);
    }

    #[test]
    fn consul_sink_present_only_when_address_given() {
        let config = merge(InferenceConfig::default(), EnvOverrides::default(), CliOverrides::default());
        assert!(config.consul.is_none());

        let cli = CliOverrides {
            consul_addr: Some("http://127.0.0.1:8500".to_string()),
            ..CliOverrides::default()
        };
        let config = merge(InferenceConfig::default(), EnvOverrides::default(), cli);
        let sink = config.consul.unwrap();
        assert_eq!(sink.address, "http://127.0.0.1:8500");
        assert_eq!(sink.key_prefix, "crucible");
    }
}

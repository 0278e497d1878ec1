//! `crucible run` (§6): the main inference verb — parse, resolve,
//! search/validate, emit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crucible_adapters::{InMemoryPackageInfoCache, OsAptAdapter, PyPiAdapter, ResilientClient, StaticAdapterRegistry, TransportConfig};
use crucible_config::CliOverrides;
use crucible_core::Command;
use crucible_driver::{infer, Drivers, InferOptions};
use crucible_graph::{GraphClientConfig, GraphResolver};
use crucible_lang::PythonStrategy;
use crucible_sandbox::{ContainerPackagingSandbox, ContainerRunner, ParseDriver, ValidatorDriver};

use super::{ConfigArgs, EmitFormatArg, SearchStrategyArg, TransitiveModeArg};

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the codebase to infer an environment for.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Dialect to parse and validate against.
    #[arg(long, default_value = "python")]
    pub language: String,

    /// Mutation search strategy to drive the inference with.
    #[arg(long, value_enum, default_value = "feedback-directed")]
    pub search: SearchStrategyArg,

    /// Which edges the transitive-closure resolution follows.
    #[arg(long, value_enum, default_value = "deps")]
    pub only: TransitiveModeArg,

    /// Shape to render the successful result as.
    #[arg(long, value_enum, default_value = "dockerfile")]
    pub format: EmitFormatArg,

    /// Skip validation entirely and emit the first resolved environment.
    #[arg(long)]
    pub no_validate: bool,

    /// Override the snippet's entry command.
    #[arg(long)]
    pub cmd: Option<String>,

    /// Argument to the overridden entry command (repeatable, in order).
    #[arg(long = "arg")]
    pub args: Vec<String>,

    /// Address of an optional Consul-shaped key-value sink.
    #[arg(long, value_name = "ADDR")]
    pub consul: Option<String>,

    /// Key prefix for the Consul sink.
    #[arg(long, default_value = "crucible")]
    pub consul_key_prefix: String,
}

/// Runs the full inference pipeline for `args` and prints the
/// rendered artifact to stdout.
pub async fn run(args: &RunArgs) -> anyhow::Result<()> {
    let config = crucible_config::load(run_overrides(args))?;

    let adapters = build_adapter_registry(&config)?;
    let graph = GraphResolver::new(GraphClientConfig {
        endpoint: config.graph_endpoint.clone(),
        ..GraphClientConfig::default()
    });
    let language = PythonStrategy;

    let runner = ContainerRunner::connect()?;
    let codebase_path = args.path.to_string_lossy().into_owned();
    let sandbox_deadline = Duration::from_secs(300);

    let parse = ParseDriver::new(runner.clone(), codebase_path.clone(), sandbox_deadline);
    let validator_images = crucible_driver::validator_images(&config, &[args.language.as_str()]);
    let validate = ValidatorDriver::new(runner, codebase_path, validator_images, sandbox_deadline);

    let options = InferOptions {
        codebase_path: args.path.to_string_lossy().into_owned(),
        language: args.language.clone(),
        search_strategy: args.search.into(),
        transitive_mode: args.only.into(),
        no_validate: args.no_validate,
        entry_override: args.cmd.clone().map(|cmd| Command::new(cmd, args.args.clone())),
    };

    let drivers = Drivers {
        parse,
        validate,
        graph: &graph,
        adapters: adapters.as_ref(),
        language: &language,
    };

    let report = infer(options, &config, drivers).await?;

    let rendered = crucible_emit::emit(&report, args.format.into(), adapters.as_ref())?;
    println!("{rendered}");
    crate::output::success(&format!(
        "inferred a working environment in {} after {} validation(s)",
        crate::output::format_duration(Duration::from_millis(report.elapsed_ms)),
        report.num_validations
    ));
    Ok(())
}

fn build_adapter_registry(config: &crucible_config::InferenceConfig) -> anyhow::Result<Arc<StaticAdapterRegistry>> {
    let package_cache = Arc::new(InMemoryPackageInfoCache::new());
    let os_cache = Arc::new(InMemoryPackageInfoCache::new());

    let apt_image = config
        .sandbox_images
        .packaging
        .get("apt")
        .cloned()
        .unwrap_or_else(|| "crucible-packaging-apt:latest".to_string());
    let apt_runner = ContainerRunner::connect()?;
    let apt_sandbox = Arc::new(ContainerPackagingSandbox::new(apt_runner, apt_image, Duration::from_secs(120)));

    let http_client = Arc::new(ResilientClient::new(TransportConfig::default()));

    let registry = StaticAdapterRegistry::new()
        .register(Arc::new(OsAptAdapter::new(apt_sandbox, os_cache)))
        .register(Arc::new(PyPiAdapter::new(config.package_index_url.clone(), http_client, package_cache)));

    Ok(Arc::new(registry))
}

fn run_overrides(args: &RunArgs) -> CliOverrides {
    let mut overrides = super::build::config_overrides(&args.config);
    overrides.search_strategy = Some(args.search.into());
    overrides.transitive_mode = Some(args.only.into());
    overrides.no_validate = Some(args.no_validate);
    if let Some(addr) = &args.consul {
        overrides.consul_addr = Some(addr.clone());
        overrides.consul_key_prefix = Some(args.consul_key_prefix.clone());
    }
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_config::{SearchStrategyKind, TransitiveMode};

    fn args(consul: Option<&str>) -> RunArgs {
        RunArgs {
            path: PathBuf::from("."),
            config: ConfigArgs {
                graph_endpoint: None,
                package_index_url: None,
                cache_dir: None,
            },
            language: "python".to_string(),
            search: SearchStrategyArg::IdDfs,
            only: TransitiveModeArg::Assoc,
            format: EmitFormatArg::Metadata,
            no_validate: true,
            cmd: None,
            args: Vec::new(),
            consul: consul.map(str::to_string),
            consul_key_prefix: "crucible".to_string(),
        }
    }

    #[test]
    fn run_overrides_carries_search_and_transitive_settings() {
        let overrides = run_overrides(&args(None));
        assert_eq!(overrides.search_strategy, Some(SearchStrategyKind::IdDfs));
        assert_eq!(overrides.transitive_mode, Some(TransitiveMode::Assoc));
        assert_eq!(overrides.no_validate, Some(true));
        assert!(overrides.consul_addr.is_none());
    }

    #[test]
    fn run_overrides_sets_consul_sink_only_when_addr_given() {
        let overrides = run_overrides(&args(Some("127.0.0.1:8500")));
        assert_eq!(overrides.consul_addr.as_deref(), Some("127.0.0.1:8500"));
        assert_eq!(overrides.consul_key_prefix.as_deref(), Some("crucible"));
    }
}

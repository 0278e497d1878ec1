//! The inference driver (§4.H): orchestrates parse -> resolve ->
//! search -> validate -> report.
//!
//! Everything I/O-shaped — sandboxes, the graph service, package
//! adapters — is injected so tests can substitute fakes without a
//! Docker daemon or a live graph service.

pub mod consul;
pub mod options;
pub mod pump;
pub mod report;
pub mod resolution;
pub mod signal;

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use crucible_adapters::AdapterRegistry;
use crucible_config::{InferenceConfig, SearchStrategyKind};
use crucible_core::{CrucibleError, Environment, Result};
use crucible_graph::GraphResolver;
use crucible_lang::{LanguageStrategy, Mutator};
use crucible_sandbox::{ContainerRuntime, ParseDriver, ParserDialect, ValidatorDriver};
use crucible_search::{FeedbackDirectedSearch, IddfsSearch, LevelOrderSearch, SearchStrategy, SpreadingSearch};
use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::{info, instrument};

pub use options::InferOptions;
pub use report::InferenceReport;

/// The set of collaborators a run needs, bundled so `infer` takes one
/// argument per concern instead of five.
pub struct Drivers<'a, R> {
    pub parse: ParseDriver<R>,
    pub validate: ValidatorDriver<R>,
    pub graph: &'a GraphResolver,
    pub adapters: &'a dyn AdapterRegistry,
    pub language: &'a dyn LanguageStrategy,
}

fn build_mutators() -> Vec<Box<dyn Mutator>> {
    vec![
        Box::new(crucible_lang::DecrementSemverMajor),
        Box::new(crucible_lang::DecrementSemverMinor),
    ]
}

fn build_strategy<'a>(
    kind: SearchStrategyKind,
    root: Environment,
    budget: usize,
    level_order_depth: usize,
    language: &'a dyn LanguageStrategy,
    graph: &'a GraphResolver,
    adapters: &'a dyn AdapterRegistry,
) -> Box<dyn SearchStrategy + 'a> {
    match kind {
        SearchStrategyKind::LevelOrder => Box::new(LevelOrderSearch::new(root, level_order_depth, adapters, build_mutators())),
        SearchStrategyKind::IdDfs => Box::new(IddfsSearch::new(root, budget, adapters, build_mutators())),
        SearchStrategyKind::FeedbackDirected => Box::new(FeedbackDirectedSearch::new(root, budget, language, graph, adapters)),
    }
}

/// Runs the full pipeline for one invocation (§4.H algorithm,
/// steps 1-7), racing it against the wall-clock budget and process
/// termination signals.
#[instrument(skip(options, config, drivers))]
pub async fn infer<R: ContainerRuntime>(options: InferOptions, config: &InferenceConfig, drivers: Drivers<'_, R>) -> Result<InferenceReport> {
    let started = Instant::now();
    let run_id = report::new_run_id();
    let progress = Arc::new(AtomicU64::new(0));

    let pipeline = run_pipeline(options, config, drivers, started, run_id.clone(), Arc::clone(&progress));
    let budget = tokio::time::sleep(config.wall_clock_budget);

    tokio::select! {
        result = pipeline => result,
        () = budget => {
            Err(CrucibleError::InferenceTimeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
                num_validations: progress.load(std::sync::atomic::Ordering::Relaxed),
            })
        }
        err = signal::wait_for_termination() => Err(err),
    }
}

async fn run_pipeline<R: ContainerRuntime>(
    options: InferOptions,
    config: &InferenceConfig,
    drivers: Drivers<'_, R>,
    started: Instant,
    run_id: String,
    progress: Arc<AtomicU64>,
) -> Result<InferenceReport> {
    // Step 1: parse.
    let image = config
        .sandbox_images
        .parsers
        .get(&options.language)
        .cloned()
        .unwrap_or_else(|| format!("crucible-parser-{}:latest", options.language));
    let dialects = vec![ParserDialect {
        label: options.language.clone(),
        image,
        setup_commands: Vec::new(),
    }];
    let mut environments = drivers.parse.parse_all(&dialects).await;
    if environments.is_empty() {
        return Err(CrucibleError::NoBaseEnvironments);
    }
    if let Some(cmd) = &options.entry_override {
        for env in &mut environments {
            env.entry_cmd = cmd.clone();
        }
    }

    // Step 2: concurrent direct + transitive resolution per root.
    let resolutions = environments.iter_mut().map(|env| async move {
        resolution::resolve_direct(env, drivers.graph, drivers.adapters, config.resolution_concurrency).await?;
        resolution::resolve_transitive(env, drivers.graph, drivers.adapters, config.transitive_mode).await
    });
    for result in join_all(resolutions).await {
        result?;
    }

    // Step 3: no-validate short circuit.
    if options.no_validate || config.no_validate {
        let roots = environments.clone();
        let environment = environments.into_iter().next().expect("checked non-empty above");
        info!(run_id = %run_id, "no-validate set, emitting first resolved environment");
        let report = InferenceReport {
            run_id,
            environment,
            num_validations: 0,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        publish_to_consul(config, &report, &roots).await?;
        return Ok(report);
    }

    // Steps 4-7: instantiate the configured search strategy per root,
    // spread across all roots, and pump to success or exhaustion.
    let roots = environments.clone();
    let num_roots = environments.len();
    let terminals = Arc::new(Mutex::new(vec![None; num_roots]));

    let kind = options.search_strategy;
    let language = drivers.language;
    let graph = drivers.graph;
    let adapters = drivers.adapters;
    let level_order_depth = config.level_order_depth;
    let terminals_for_build = Arc::clone(&terminals);
    let mut next_slot = 0usize;

    let search = SpreadingSearch::new(environments, config.search_budget, move |root, per_root_budget| {
        let slot = next_slot;
        next_slot += 1;
        let inner = build_strategy(kind, root, per_root_budget, level_order_depth, language, graph, adapters);
        Box::new(pump::TerminalCapturingStrategy::new(inner, slot, Arc::clone(&terminals_for_build))) as Box<dyn SearchStrategy + '_>
    });

    let success = pump::pump(Box::new(search), &drivers.validate, drivers.adapters, terminals, progress, started).await?;

    let report = InferenceReport {
        run_id,
        environment: success.environment,
        num_validations: success.num_validations,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    publish_to_consul(config, &report, &roots).await?;
    Ok(report)
}

/// Writes the report and every root environment to the configured
/// Consul sink, if any (§6). A no-op when `config.consul` is `None`.
async fn publish_to_consul(config: &InferenceConfig, report: &InferenceReport, roots: &[Environment]) -> Result<()> {
    if let Some(sink) = &config.consul {
        consul::ConsulWriter::new(sink.clone()).publish(report, roots).await?;
    }
    Ok(())
}

/// Builds the per-dialect validator image map `infer` needs, from
/// configuration, defaulting any dialect with no override to a
/// conventional `crucible-validator-<dialect>:latest` name.
#[must_use]
pub fn validator_images(config: &InferenceConfig, dialects: &[&str]) -> HashMap<String, String> {
    dialects
        .iter()
        .map(|dialect| {
            let image = config
                .sandbox_images
                .validators
                .get(*dialect)
                .cloned()
                .unwrap_or_else(|| format!("crucible-validator-{dialect}:latest"));
            ((*dialect).to_string(), image)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_images_falls_back_to_conventional_name() {
        let config = InferenceConfig::default();
        let images = validator_images(&config, &["python"]);
        assert_eq!(images.get("python").unwrap(), "crucible-validator-python:latest");
    }
}

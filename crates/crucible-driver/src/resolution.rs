//! Direct and transitive dependency resolution (§4.H steps 2 and the
//! "Direct-dependency resolution" algorithm).

use std::collections::HashSet;

use crucible_adapters::AdapterRegistry;
use crucible_core::{CrucibleError, Environment, PackageSystem, Result, ResourceMapping, TransitiveEdge};
use crucible_config::TransitiveMode;
use crucible_graph::GraphResolver;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{instrument, warn};

fn package_system_from_str(s: &str) -> Result<PackageSystem> {
    match s {
        "apt" => Ok(PackageSystem::Apt),
        "pypi" => Ok(PackageSystem::PyPi),
        other => Err(CrucibleError::UnexpectedInference {
            message: format!("unknown package system reported by parser: {other}"),
        }),
    }
}

/// Resolves every imported resource of `env`'s parse result to a
/// direct dependency, per §4.H's direct-dependency resolution
/// algorithm. Individual resource-resolution failures are recovered
/// locally (§7): logged and recorded in `metadata.direct_lookup.unresolved`.
#[instrument(skip(env, graph, adapters, concurrency), fields(env_id = %env.id))]
pub async fn resolve_direct(
    env: &mut Environment,
    graph: &GraphResolver,
    adapters: &dyn AdapterRegistry,
    concurrency: usize,
) -> Result<()> {
    let Some(parsed) = env.metadata.parse_result.clone() else {
        return Ok(());
    };
    let system = package_system_from_str(&parsed.language.system)?;
    let resources = parsed.imported_resources();

    let mut in_flight = FuturesUnordered::new();
    let mut iter = resources.into_iter();
    for resource in iter.by_ref().take(concurrency) {
        in_flight.push(resolve_one_resource(resource, system, graph, adapters));
    }

    while let Some(result) = in_flight.next().await {
        if let Some(resource) = iter.next() {
            in_flight.push(resolve_one_resource(resource, system, graph, adapters));
        }
        apply_resolution(env, result, system);
    }

    Ok(())
}

struct ResourceResolution {
    resource: String,
    outcome: Result<Option<ResolvedName>>,
}

struct ResolvedName {
    matched_name: String,
    version: Option<String>,
    trivial: bool,
}

async fn resolve_one_resource(
    resource: String,
    system: PackageSystem,
    graph: &GraphResolver,
    adapters: &dyn AdapterRegistry,
) -> ResourceResolution {
    let outcome = resolve_one_resource_inner(&resource, system, graph, adapters).await;
    ResourceResolution { resource, outcome }
}

async fn resolve_one_resource_inner(
    resource: &str,
    system: PackageSystem,
    graph: &GraphResolver,
    adapters: &dyn AdapterRegistry,
) -> Result<Option<ResolvedName>> {
    let adapter = adapters.adapter_for(system);

    // (a) query 4.B#1, then try an exact match against every candidate.
    let candidates = graph.resource_to_packages(resource, system).await?;
    for candidate in &candidates {
        if let Some(dep) = adapter.exact_match(&candidate.name, None).await? {
            return Ok(Some(ResolvedName {
                matched_name: dep.name,
                version: dep.version,
                trivial: false,
            }));
        }
    }

    // (b) fall back to treating the resource name itself as a package name.
    if let Some(dep) = adapter.exact_match(resource, None).await? {
        return Ok(Some(ResolvedName {
            matched_name: dep.name,
            version: dep.version,
            trivial: true,
        }));
    }

    Ok(None)
}

fn apply_resolution(env: &mut Environment, result: ResourceResolution, system: PackageSystem) {
    let ResourceResolution { resource, outcome } = result;
    let resolved = match outcome {
        Ok(Some(resolved)) => resolved,
        Ok(None) => {
            env.metadata.direct_lookup.unresolved.push(resource);
            return;
        }
        Err(e) => {
            warn!(resource = %resource, error = %e, "direct dependency resolution failed, recovering locally");
            env.metadata.direct_lookup.unresolved.push(resource);
            return;
        }
    };

    let already_present = env
        .dependencies
        .iter()
        .any(|d| d.name.eq_ignore_ascii_case(&resolved.matched_name));

    if !already_present {
        let dep = match &resolved.version {
            Some(v) => crucible_core::Dependency::new(resolved.matched_name.clone(), v.clone(), system),
            None => crucible_core::Dependency::unpinned(resolved.matched_name.clone(), system),
        };
        env.dependencies.push(dep);
        env.metadata.direct_lookup.name_resolutions += 1;
    }

    env.metadata.direct_lookup.mapping.push(ResourceMapping {
        resource,
        package: resolved.matched_name,
    });

    // (c) the resource resolved "trivially" to an exact-name match
    // that was already present before this resolution began: back out
    // the counter bump so it only measures non-trivial resolutions.
    if resolved.trivial && already_present {
        env.metadata.direct_lookup.name_resolutions -= 1;
    }
}

/// Computes the transitive closure of `env`'s direct dependencies by
/// reverse DFS over graph queries 2 (resource dependencies) and 3
/// (associations), per `mode`. Populates `transitive_lookup` and
/// reorders `dependencies` into install order: the DFS post-order,
/// which places every prerequisite before its dependent.
#[instrument(skip(env, graph, adapters), fields(env_id = %env.id))]
pub async fn resolve_transitive(
    env: &mut Environment,
    graph: &GraphResolver,
    adapters: &dyn AdapterRegistry,
    mode: TransitiveMode,
) -> Result<()> {
    if matches!(mode, TransitiveMode::None) {
        return Ok(());
    }
    let system = env
        .metadata
        .parse_result
        .as_ref()
        .map(|p| package_system_from_str(&p.language.system))
        .transpose()?
        .unwrap_or(PackageSystem::PyPi);

    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let root_indices: Vec<usize> = (0..env.dependencies.len()).collect();

    for root in root_indices {
        dfs_visit(env, root, system, graph, adapters, mode, &mut visited, &mut order).await?;
    }

    env.metadata.transitive_lookup.discovery_order.clone_from(&order);
    let reordered: Vec<_> = order.iter().map(|&idx| env.dependencies[idx].clone()).collect();
    remap_edge_indices(env, &order);
    env.dependencies = reordered;

    Ok(())
}

fn remap_edge_indices(env: &mut Environment, order: &[usize]) {
    let position_of: std::collections::HashMap<usize, usize> = order.iter().enumerate().map(|(pos, &old)| (old, pos)).collect();
    for edge in &mut env.metadata.transitive_lookup.edges {
        if let (Some(&d), Some(&p)) = (position_of.get(&edge.dependent), position_of.get(&edge.prerequisite)) {
            edge.dependent = d;
            edge.prerequisite = p;
        }
    }
}

/// Recursive by nature (DFS); boxed by hand since `async fn` cannot
/// recurse directly (its future would have infinite size).
fn dfs_visit<'a>(
    env: &'a mut Environment,
    index: usize,
    system: PackageSystem,
    graph: &'a GraphResolver,
    adapters: &'a dyn AdapterRegistry,
    mode: TransitiveMode,
    visited: &'a mut HashSet<usize>,
    order: &'a mut Vec<usize>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        if !visited.insert(index) {
            return Ok(());
        }

        let name = env.dependencies[index].name.clone();
        let mut candidates = Vec::new();
        if matches!(mode, TransitiveMode::Deps) {
            candidates.extend(graph.package_resource_dependencies(&name, system).await?);
        }
        if matches!(mode, TransitiveMode::Assoc | TransitiveMode::Deps) {
            candidates.extend(graph.package_associations(&name, system).await?);
        }

        let adapter = adapters.adapter_for(system);
        for candidate in candidates {
            let Some(dep) = adapter.exact_match(&candidate.name, None).await? else {
                continue;
            };
            let existing = env.dependencies.iter().position(|d| d.name.eq_ignore_ascii_case(&dep.name));
            let prerequisite_index = match existing {
                Some(idx) => idx,
                None => {
                    env.dependencies.push(dep);
                    env.dependencies.len() - 1
                }
            };
            env.metadata.transitive_lookup.edges.push(TransitiveEdge {
                dependent: index,
                prerequisite: prerequisite_index,
            });
            dfs_visit(env, prerequisite_index, system, graph, adapters, mode, visited, order).await?;
        }

        order.push(index);
        Ok(())
    })
}

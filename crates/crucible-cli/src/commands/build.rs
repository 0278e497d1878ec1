//! `crucible build` (§6: "build all container images").

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::output::progress::{MultiProgress, ProgressStyle};

use super::ConfigArgs;

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Root directory holding one build context per image, each named
    /// after its logical role (`parser-python`, `validator-python`,
    /// `packaging-apt`, `packaging-pypi`).
    #[arg(long, value_name = "DIR", default_value = "docker")]
    pub context_root: PathBuf,
}

/// Builds every sandbox image named in configuration (defaults plus
/// any `--*-image` overrides), reporting progress per image.
pub async fn run(args: &BuildArgs) -> anyhow::Result<()> {
    let config = crucible_config::load(config_overrides(&args.config))?;
    let targets = sandbox_image_targets(&config);

    let runner = crucible_sandbox::ContainerRunner::connect()?;
    let progress = MultiProgress::new();
    let bar = progress.add(targets.len() as u64, ProgressStyle::Bar);

    for (role, tag) in &targets {
        bar.set_message(tag.clone());
        let context_dir = context_dir_for(&args.context_root, role);
        crucible_sandbox::build_image(runner.docker(), tag, &context_dir).await?;
        bar.inc(1);
    }
    bar.finish_and_clear();
    crate::output::success(&format!("built {} sandbox image(s)", targets.len()));
    Ok(())
}

fn context_dir_for(root: &Path, role: &str) -> PathBuf {
    root.join(role)
}

/// The full set of `(logical role, image tag)` pairs `build`/`push`
/// operate over: one parser and one validator image per configured
/// dialect, plus one packaging image per configured package system,
/// falling back to the conventional names `crucible-driver` itself
/// uses when no override is configured.
pub(crate) fn sandbox_image_targets(config: &crucible_config::InferenceConfig) -> Vec<(String, String)> {
    let mut targets = Vec::new();

    let mut dialects: Vec<&str> = config.sandbox_images.parsers.keys().map(String::as_str).collect();
    if dialects.is_empty() {
        dialects.push("python");
    }
    for dialect in dialects {
        let parser_tag = config
            .sandbox_images
            .parsers
            .get(dialect)
            .cloned()
            .unwrap_or_else(|| format!("crucible-parser-{dialect}:latest"));
        targets.push((format!("parser-{dialect}"), parser_tag));

        let validator_tag = config
            .sandbox_images
            .validators
            .get(dialect)
            .cloned()
            .unwrap_or_else(|| format!("crucible-validator-{dialect}:latest"));
        targets.push((format!("validator-{dialect}"), validator_tag));
    }

    let mut systems: Vec<&str> = config.sandbox_images.packaging.keys().map(String::as_str).collect();
    for default_system in ["apt", "pypi"] {
        if !systems.contains(&default_system) {
            systems.push(default_system);
        }
    }
    for system in systems {
        let tag = config
            .sandbox_images
            .packaging
            .get(system)
            .cloned()
            .unwrap_or_else(|| format!("crucible-packaging-{system}:latest"));
        targets.push((format!("packaging-{system}"), tag));
    }

    targets
}

pub(crate) fn config_overrides(args: &ConfigArgs) -> crucible_config::CliOverrides {
    crucible_config::CliOverrides {
        graph_endpoint: args.graph_endpoint.clone(),
        package_index_url: args.package_index_url.clone(),
        cache_dir: args.cache_dir.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_config::InferenceConfig;

    #[test]
    fn default_config_yields_python_and_apt_pypi_targets() {
        let targets = sandbox_image_targets(&InferenceConfig::default());
        let roles: Vec<_> = targets.iter().map(|(role, _)| role.as_str()).collect();
        assert!(roles.contains(&"parser-python"));
        assert!(roles.contains(&"validator-python"));
        assert!(roles.contains(&"packaging-apt"));
        assert!(roles.contains(&"packaging-pypi"));
    }
}

//! `crucible push` (§6: "push all images to the configured registry").

use clap::Parser;

use crate::output::progress::{MultiProgress, ProgressStyle};

use super::ConfigArgs;
use super::build::{config_overrides, sandbox_image_targets};

#[derive(Parser, Debug, Clone)]
pub struct PushArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Pushes every sandbox image named in configuration to the registry
/// implied by its tag. Assumes each image has already been built
/// locally (run `crucible build` first).
pub async fn run(args: &PushArgs) -> anyhow::Result<()> {
    let config = crucible_config::load(config_overrides(&args.config))?;
    let targets = sandbox_image_targets(&config);

    let runner = crucible_sandbox::ContainerRunner::connect()?;
    let progress = MultiProgress::new();
    let bar = progress.add(targets.len() as u64, ProgressStyle::Bar);

    for (_role, tag) in &targets {
        bar.set_message(tag.clone());
        crucible_sandbox::push_image(runner.docker(), tag).await?;
        bar.inc(1);
    }
    bar.finish_and_clear();
    crate::output::success(&format!("pushed {} sandbox image(s)", targets.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_args_parses_graph_endpoint_override() {
        let args = PushArgs::try_parse_from(["push", "--graph-endpoint", "http://graph.local"]).unwrap();
        assert_eq!(args.config.graph_endpoint.as_deref(), Some("http://graph.local"));
    }
}

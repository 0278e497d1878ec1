//! CLI commands: `build`, `push`, `run` (§6).

pub mod build;
pub mod push;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Infers a working container environment for a codebase by mutating
/// dependency pins until a sandboxed run validates.
#[derive(Parser, Debug)]
#[command(name = "crucible")]
#[command(author = "Crucible Contributors")]
#[command(version)]
#[command(about = "Infers a working container environment for a codebase", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Output format for command results.
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: CliOutputFormat,

    /// Increase verbosity: -v info, -vv debug, -vvv trace.
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Force ANSI output.
    #[arg(long, global = true, conflicts_with = "no_ansi")]
    pub ansi: bool,

    /// Disable ANSI output.
    #[arg(long, global = true)]
    pub no_ansi: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    #[must_use]
    pub fn force_ansi(&self) -> Option<bool> {
        if self.ansi {
            Some(true)
        } else if self.no_ansi {
            Some(false)
        } else {
            None
        }
    }
}

/// Top-level output format: distinct from `run`'s `--format`, which
/// selects the inferred artifact's shape. This one governs whether
/// *command failures* are reported as JSON (§6 CLI error output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliOutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build all configured sandbox container images.
    Build(build::BuildArgs),

    /// Push all configured sandbox images to their registries.
    Push(push::PushArgs),

    /// Infer a working container environment for a codebase.
    Run(run::RunArgs),
}

/// Which search strategy to drive the inference with (`--search`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SearchStrategyArg {
    #[value(name = "level-order")]
    LevelOrder,
    #[value(name = "id-dfs")]
    IdDfs,
    #[default]
    #[value(name = "feedback-directed")]
    FeedbackDirected,
}

impl From<SearchStrategyArg> for crucible_config::SearchStrategyKind {
    fn from(value: SearchStrategyArg) -> Self {
        match value {
            SearchStrategyArg::LevelOrder => Self::LevelOrder,
            SearchStrategyArg::IdDfs => Self::IdDfs,
            SearchStrategyArg::FeedbackDirected => Self::FeedbackDirected,
        }
    }
}

/// Which edges the transitive-closure resolution follows (`--only`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransitiveModeArg {
    #[default]
    Deps,
    Assoc,
    None,
}

impl From<TransitiveModeArg> for crucible_config::TransitiveMode {
    fn from(value: TransitiveModeArg) -> Self {
        match value {
            TransitiveModeArg::Deps => Self::Deps,
            TransitiveModeArg::Assoc => Self::Assoc,
            TransitiveModeArg::None => Self::None,
        }
    }
}

/// Which shape to render the successful inference result as (`--format`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EmitFormatArg {
    #[default]
    Dockerfile,
    #[value(name = "install-commands")]
    InstallCommands,
    Metadata,
}

impl From<EmitFormatArg> for crucible_emit::EmitFormat {
    fn from(value: EmitFormatArg) -> Self {
        match value {
            EmitFormatArg::Dockerfile => Self::Dockerfile,
            EmitFormatArg::InstallCommands => Self::InstallCommands,
            EmitFormatArg::Metadata => Self::Metadata,
        }
    }
}

/// Shared config-override flags every verb that touches
/// [`crucible_config::InferenceConfig`] accepts.
#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    /// Override the knowledge-graph query service base URL.
    #[arg(long, env = "CRUCIBLE_GRAPH_ENDPOINT")]
    pub graph_endpoint: Option<String>,

    /// Override the language-repository package index base URL.
    #[arg(long, env = "CRUCIBLE_PACKAGE_INDEX_URL")]
    pub package_index_url: Option<String>,

    /// Override the on-disk cache directory.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

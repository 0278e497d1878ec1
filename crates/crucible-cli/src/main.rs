//! `crucible`: infers a working container environment for a codebase
//! by mutating dependency pins until a sandboxed run validates.

mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use commands::{Cli, CliOutputFormat, Commands};
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    output::init(cli.force_ansi(), cli.quiet);
    if cli.format == CliOutputFormat::Json {
        output::json::enable();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create runtime");

    match runtime.block_on(dispatch(&cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::json::print_error(&err);
            ExitCode::from(output::json::exit_code_for(&err) as u8)
        }
    }
}

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Build(args) => commands::build::run(args).await,
        Commands::Push(args) => commands::push::run(args).await,
        Commands::Run(args) => commands::run::run(args).await,
    }
}

// ABOUTME: Entry point for the hangar CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, ContainerCommand};
use commands::{Session, StdinPolicy, run_container_command};
use hangar::config::{self, Config};
use hangar::error::{Error, Result};
use hangar::lifecycle::ToggleState;
use hangar::output::{Output, OutputMode};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("hangar=debug,info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Arc::new(Output::new(mode));

    if let Err(e) = run(cli, output.clone()).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Arc<Output>) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.progress(&format!("Wrote {}", path.display()));
            Ok(())
        }
        Commands::Info => {
            let config = Config::discover(&cwd)?;
            commands::info(&config, &output).await
        }
        Commands::Container(ContainerCommand::Catalog) => {
            let config = Config::discover(&cwd)?;
            output.print_catalog(&config.catalog);
            Ok(())
        }
        Commands::Console => {
            let config = Config::discover(&cwd)?;
            let session = Session::open(config, output).await?;
            commands::console(session).await
        }
        Commands::Container(command) => {
            let config = Config::discover(&cwd)?;
            let mut session = Session::open(config, output).await?;
            let toggle = run_container_command(&mut session, command, StdinPolicy::Read).await?;
            if let Some(handle) = toggle
                && let ToggleState::Failed(_) = session.orchestrator.settle(handle).await
            {
                return Err(Error::OperationFailed("toggle"));
            }
            Ok(())
        }
    }
}

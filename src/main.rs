#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

use agentctl::cli::{Cli, Commands};
use agentctl::config::Config;
use agentctl::workspace::Workspace;
use agentctl::{commands, exit_codes, logging};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(exit_codes::FAILURE);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Config commands report on invalid configuration instead of failing to load it
    if let Commands::Config { command } = &cli.command {
        commands::config::execute(command, cli.config.as_deref(), cli.root.as_deref())?;
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?.with_root_override(cli.root.as_deref());
    let workspace = Workspace::from_config(&config)?;
    tracing::debug!(root = %workspace.root.display(), "workspace resolved");

    match &cli.command {
        Commands::Agent { command } => commands::agent::execute(&workspace, command)?,
        Commands::Orchestrate { command } => commands::orchestrate::execute(&workspace, command)?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

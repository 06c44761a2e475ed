use crate::scenarios::RunMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration files
    Validate {
        /// Optional path to a specific config file to validate
        file: Option<PathBuf>,
    },

    /// Show effective configuration after merging all sources
    Show,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// Activate agents together with everything they require
    Activate {
        /// Agent names (or file stems)
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Move an agent out of the active directory
    Deactivate {
        /// Agent name (or file stem)
        name: String,

        /// Deactivate even if active agents require it
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Show an agent's requirements, recommendations and active dependents
    Deps {
        /// Agent name (or file stem)
        name: String,
    },

    /// Show the requires graph as a tree
    Graph {
        /// Print the dependency map file format instead
        #[arg(long)]
        map: bool,
    },

    /// List every agent and its location
    List,
}

#[derive(Subcommand, Debug)]
pub enum OrchestrateCommands {
    /// Run a scenario
    Run {
        /// Scenario name
        name: String,

        /// Run mode (default from config: interactive)
        #[arg(short = 'm', long, value_enum)]
        mode: Option<RunMode>,

        /// Shorthand for --mode plan
        #[arg(long, conflicts_with = "mode")]
        plan: bool,
    },

    /// Show a scenario's phases without running anything
    Preview {
        /// Scenario name
        name: String,
    },

    /// List available scenarios
    List,

    /// Check scenario definitions
    Validate {
        /// Scenario name
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,

        /// Validate every scenario
        #[arg(long)]
        all: bool,
    },

    /// Show persisted runs and held locks
    Status {
        /// Only runs of this scenario
        name: Option<String>,
    },

    /// Clear a scenario's lock left behind by a crashed run
    Stop {
        /// Scenario name
        name: String,
    },
}

#[derive(Parser, Debug)]
#[command(name = "agentctl")]
#[command(about = "Activate agents with dependency resolution and orchestrate multi-phase scenarios", long_about = None)]
#[command(version)]
#[command(after_help = "\
EXAMPLES:
  agentctl agent activate api-designer     Activate an agent and its requirements
  agentctl agent deactivate db --force     Deactivate even if others require it
  agentctl orchestrate run deploy --plan   Preview a scenario
  agentctl orchestrate run deploy -m automatic
  agentctl orchestrate stop deploy         Clear a stale lock

ENVIRONMENT:
  AGENTCTL_ROOT     Storage root (default: ~/.claude)
  AGENTCTL_CONFIG   Extra config file layered over ~/.agentctl.toml
  AGENTCTL_LOG      Log filter, e.g. agentctl=debug")]
pub struct Cli {
    /// Show debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Storage root (overrides config and AGENTCTL_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Config file layered over the global one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Activate, deactivate and inspect agents
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },

    /// Run and inspect scenarios
    #[command(alias = "o")]
    Orchestrate {
        #[command(subcommand)]
        command: OrchestrateCommands,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_plan_flag() {
        let cli = Cli::parse_from(["agentctl", "orchestrate", "run", "deploy", "--plan"]);
        match cli.command {
            Commands::Orchestrate {
                command: OrchestrateCommands::Run { name, mode, plan },
            } => {
                assert_eq!(name, "deploy");
                assert_eq!(mode, None);
                assert!(plan);
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_mode_and_plan_conflict() {
        let result = Cli::try_parse_from([
            "agentctl", "orchestrate", "run", "deploy", "--plan", "--mode", "automatic",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["agentctl", "agent", "list", "--root", "/tmp/x", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_activate_requires_a_name() {
        assert!(Cli::try_parse_from(["agentctl", "agent", "activate"]).is_err());
    }
}

//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Contro - Discord moderation on a pluggable security event framework
#[derive(Parser, Debug)]
#[command(name = "contro")]
#[command(about = "Discord moderation on a pluggable security event framework", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to Discord and start moderating
    Run {
        /// Configuration file replacing the layered defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file replacing the layered defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_config() {
        let cli = Cli::try_parse_from(["contro", "run", "--config", "bot.toml", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.json_logs);
        match cli.command {
            Commands::Run { config } => assert_eq!(config, Some(PathBuf::from("bot.toml"))),
            other => panic!("unexpected command {:?}", other),
        }
    }
}

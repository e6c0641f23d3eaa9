//! Contro CLI binary.
//!
//! - `contro run` connects to Discord and moderates until Ctrl-C
//! - `contro config` prints the effective configuration

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, print_config, run};

    // Load .env before reading the token variable
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    contro::init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Run { config } => {
            run(config.as_deref()).await?;
        }

        Commands::Config { config } => {
            print_config(config.as_deref())?;
        }
    }

    Ok(())
}

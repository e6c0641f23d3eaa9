//! Command handlers.

use contro::{ControConfig, ControResult, run_bot};
use std::path::Path;
use tracing::info;

fn load(path: Option<&Path>) -> ControResult<ControConfig> {
    match path {
        Some(path) => ControConfig::from_file(path),
        None => ControConfig::load(),
    }
}

/// Start the bot.
pub async fn run(path: Option<&Path>) -> ControResult<()> {
    let config = load(path)?;
    info!(
        modules = config.modules.len(),
        queue_capacity = config.framework.queue_capacity,
        "Configuration loaded"
    );
    run_bot(config).await
}

/// Print the effective configuration.
pub fn print_config(path: Option<&Path>) -> ControResult<()> {
    let config = load(path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

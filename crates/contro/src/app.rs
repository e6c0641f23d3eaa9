//! Bot assembly and lifecycle.

use crate::ControConfig;
use contro_error::{ConfigError, ControError, ControResult, PlatformError};
use contro_security::{
    LogAlertHandler, RAID_DETECTOR, RaidDetector, SPAM_DETECTOR, SecurityFramework, SpamDetector,
};
use contro_social::{ControBot, DiscordAlertHandler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// How long shutdown waits for queued events before cancelling the consumer.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Register the detectors named under `[modules]`.
///
/// Returns the number of registered modules. An unknown module name is a
/// configuration error and registers nothing.
#[instrument(skip_all, fields(modules = config.modules.len()))]
pub async fn register_detectors(
    framework: &SecurityFramework,
    config: &ControConfig,
) -> ControResult<usize> {
    if let Some(unknown) = config
        .modules
        .keys()
        .find(|name| name.as_str() != SPAM_DETECTOR && name.as_str() != RAID_DETECTOR)
    {
        return Err(ConfigError::unknown_module(unknown).into());
    }

    for (name, settings) in &config.modules {
        if name == SPAM_DETECTOR {
            framework
                .register_module(SpamDetector::new(settings.clone()))
                .await;
        } else {
            framework
                .register_module(RaidDetector::new(settings.clone()))
                .await;
        }
    }
    Ok(config.modules.len())
}

/// Run the bot until the gateway connection fails or Ctrl-C is pressed.
///
/// On Ctrl-C the queue is given a few seconds to drain before the consumer
/// is stopped.
#[instrument(skip_all)]
pub async fn run_bot(config: ControConfig) -> ControResult<()> {
    let token = config.discord.token()?;
    let mut bot = ControBot::new(token, config.framework.clone())
        .await
        .map_err(PlatformError::from)?;
    let framework = Arc::clone(bot.framework());

    let registered = register_detectors(&framework, &config).await?;
    info!(registered, "Security modules registered");

    framework.add_alert_handler(LogAlertHandler);
    if let Some(channel_id) = config.discord.alert_channel_id {
        framework.add_alert_handler(DiscordAlertHandler::new(Arc::clone(bot.http()), channel_id));
        info!(channel_id, "Discord alerts enabled");
    }
    framework.start_processing();

    let outcome: ControResult<()> = tokio::select! {
        result = bot.start() => result.map_err(|e| ControError::from(PlatformError::from(e))),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown requested");
            Ok(())
        }
    };

    if tokio::time::timeout(DRAIN_TIMEOUT, framework.wait_until_drained())
        .await
        .is_err()
    {
        warn!(pending = framework.queue_size(), "Queue did not drain before shutdown");
    }
    framework.stop_processing().await;

    let stats = framework.stats();
    info!(
        total_events = stats.total_events,
        total_threats = stats.total_threats,
        total_actions = stats.total_actions,
        failed_actions = stats.failed_actions,
        "Security framework stopped"
    );
    outcome
}

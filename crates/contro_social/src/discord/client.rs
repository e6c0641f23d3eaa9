//! Discord bot client setup and lifecycle management.
//!
//! This module provides the ControBot struct which owns the Serenity client
//! and the security framework fed by its gateway events.

use super::{DiscordError, DiscordErrorKind, SecurityHandler, SerenityPlatform};
use contro_security::{FrameworkConfig, SecurityFramework};
use serenity::Client;
use serenity::all::Http;
use std::sync::Arc;
use tracing::{info, instrument};

/// Discord bot running the security framework.
///
/// # Example
/// ```no_run
/// use contro_security::{FrameworkConfig, LogAlertHandler};
/// use contro_social::ControBot;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let token = std::env::var("DISCORD_TOKEN")?;
///     let mut bot = ControBot::new(token, FrameworkConfig::default()).await?;
///     bot.framework().add_alert_handler(LogAlertHandler);
///     bot.framework().start_processing();
///     bot.start().await?;
///     Ok(())
/// }
/// ```
pub struct ControBot {
    client: Client,
    http: Arc<Http>,
    framework: Arc<SecurityFramework>,
}

impl ControBot {
    /// Create the bot and its security framework.
    ///
    /// Remediations go through a dedicated HTTP client sharing the bot token.
    ///
    /// # Errors
    /// Returns an error if the token is empty or the Serenity client fails to
    /// initialize.
    #[instrument(skip(token, config), fields(token_len = token.len()))]
    pub async fn new(token: String, config: FrameworkConfig) -> Result<Self, DiscordError> {
        info!("Initializing Contro Discord bot");
        if token.trim().is_empty() {
            return Err(DiscordError::new(DiscordErrorKind::InvalidToken));
        }

        let http = Arc::new(Http::new(&token));
        let platform = Arc::new(SerenityPlatform::new(Arc::clone(&http)));
        let framework = Arc::new(SecurityFramework::new(config, platform));

        let handler = SecurityHandler::new(Arc::clone(&framework));
        let intents = SecurityHandler::intents();
        info!("Building Serenity client with intents: {:?}", intents);

        let client = Client::builder(&token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                    "Failed to build client: {}",
                    e
                )))
            })?;

        info!("Serenity client built successfully");
        Ok(Self {
            client,
            http,
            framework,
        })
    }

    /// The security framework receiving this bot's events.
    pub fn framework(&self) -> &Arc<SecurityFramework> {
        &self.framework
    }

    /// HTTP client used for remediations and alerts.
    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }

    /// Connect to the gateway. Runs until the connection fails or the
    /// future is dropped.
    ///
    /// # Errors
    /// Returns an error if the client fails to start or encounters a fatal error.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), DiscordError> {
        info!("Starting Discord bot");

        self.client.start().await.map_err(|e| {
            DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                "Client error: {}",
                e
            )))
        })?;

        Ok(())
    }
}

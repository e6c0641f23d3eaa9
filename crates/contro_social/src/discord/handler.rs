//! Serenity event handler feeding the security framework.

use super::conversions::{member_join_event, message_event};
use chrono::Utc;
use contro_security::{SecurityEvent, SecurityEventBuilderError, SecurityFramework};
use serenity::all::{Member, Message, Ready};
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::gateway::GatewayIntents;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Event handler turning gateway events into queued security events.
///
/// Bot authors and direct messages are ignored.
pub struct SecurityHandler {
    framework: Arc<SecurityFramework>,
}

impl SecurityHandler {
    /// Create a handler queueing into `framework`.
    pub fn new(framework: Arc<SecurityFramework>) -> Self {
        Self { framework }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    async fn queue(&self, event: Result<SecurityEvent, SecurityEventBuilderError>) {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to build security event");
                return;
            }
        };
        debug!(event_id = event.event_id(), event_type = event.event_type(), "Queueing security event");
        if let Err(e) = self.framework.queue_event(event).await {
            warn!(error = %e, "Failed to queue security event");
        }
    }
}

/// Whole days between account creation and now, never negative.
fn account_age_days(created_unix: i64, now_unix: i64) -> u64 {
    ((now_unix - created_unix).max(0) / SECONDS_PER_DAY) as u64
}

#[async_trait]
impl EventHandler for SecurityHandler {
    /// Called when the bot successfully connects to Discord.
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_user = %ready.user.name,
            bot_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "Bot connected to Discord"
        );
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let mentions =
            msg.mentions.len() + msg.mention_roles.len() + usize::from(msg.mention_everyone);
        let event = message_event(
            guild_id.get(),
            msg.channel_id.get(),
            msg.id.get(),
            msg.author.id.get(),
            mentions,
            msg.content.len(),
        );
        self.queue(event).await;
    }

    /// Called when a new member joins a guild.
    async fn guild_member_addition(&self, _ctx: Context, new_member: Member) {
        if new_member.user.bot {
            return;
        }
        info!(
            guild_id = %new_member.guild_id,
            user_id = %new_member.user.id,
            username = %new_member.user.name,
            "Member joined guild"
        );

        let created = new_member.user.id.created_at().unix_timestamp();
        let age = account_age_days(created, Utc::now().timestamp());
        let event = member_join_event(new_member.guild_id.get(), new_member.user.id.get(), age);
        self.queue(event).await;
    }
}

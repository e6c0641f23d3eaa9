//! Moderation calls against the Discord REST API.

use super::conversions::{apply_overwrite_state, overwrite_state_from};
use super::error::platform_error;
use async_trait::async_trait;
use chrono::Utc;
use contro_error::{PlatformError, PlatformErrorKind, PlatformResult};
use contro_security::{LockableChannel, ModerationPlatform, OverwriteState};
use serenity::all::{
    ChannelId, ChannelType, EditMember, GuildId, Http, MessageId, PermissionOverwriteType, RoleId,
    Timestamp, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Longest communication timeout Discord accepts.
const MAX_TIMEOUT: Duration = Duration::from_secs(28 * 24 * 60 * 60);

/// [`ModerationPlatform`] backed by a Serenity HTTP client.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
}

impl SerenityPlatform {
    /// Create a platform issuing requests through `http`.
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn timeout_until(duration: Duration) -> PlatformResult<Timestamp> {
        let seconds = duration.min(MAX_TIMEOUT).as_secs() as i64;
        let until = Utc::now().timestamp() + seconds;
        Timestamp::from_unix_timestamp(until)
            .map_err(|e| PlatformError::new(PlatformErrorKind::Api(e.to_string())))
    }
}

#[async_trait]
impl ModerationPlatform for SerenityPlatform {
    #[instrument(skip(self, reason))]
    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        duration: Duration,
        reason: &str,
    ) -> PlatformResult<()> {
        let until = Self::timeout_until(duration)?;
        let builder = EditMember::new()
            .disable_communication_until_datetime(until)
            .audit_log_reason(reason);
        GuildId::new(guild_id)
            .edit_member(&self.http, UserId::new(user_id), builder)
            .await
            .map_err(|e| {
                platform_error(e, || PlatformErrorKind::MemberNotFound { guild_id, user_id })
            })?;
        debug!("Member timed out");
        Ok(())
    }

    #[instrument(skip(self, reason))]
    async fn kick_member(&self, guild_id: u64, user_id: u64, reason: &str) -> PlatformResult<()> {
        GuildId::new(guild_id)
            .kick_with_reason(&self.http, UserId::new(user_id), reason)
            .await
            .map_err(|e| {
                platform_error(e, || PlatformErrorKind::MemberNotFound { guild_id, user_id })
            })
    }

    #[instrument(skip(self, reason))]
    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
        reason: &str,
    ) -> PlatformResult<()> {
        GuildId::new(guild_id)
            .ban_with_reason(&self.http, UserId::new(user_id), delete_message_days, reason)
            .await
            .map_err(|e| {
                platform_error(e, || PlatformErrorKind::MemberNotFound { guild_id, user_id })
            })
    }

    #[instrument(skip(self, reason))]
    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
        reason: &str,
    ) -> PlatformResult<()> {
        self.http
            .delete_message(
                ChannelId::new(channel_id),
                MessageId::new(message_id),
                Some(reason),
            )
            .await
            .map_err(|e| {
                platform_error(e, || PlatformErrorKind::MessageNotFound {
                    channel_id,
                    message_id,
                })
            })
    }

    #[instrument(skip(self))]
    async fn text_channels(&self, guild_id: u64) -> PlatformResult<Vec<LockableChannel>> {
        let guild = GuildId::new(guild_id);
        let not_found = || PlatformErrorKind::GuildNotFound(guild_id);

        let channels = guild
            .channels(&self.http)
            .await
            .map_err(|e| platform_error(e, not_found))?;
        let partial = guild
            .to_partial_guild(&self.http)
            .await
            .map_err(|e| platform_error(e, not_found))?;
        let bot = self
            .http
            .get_current_user()
            .await
            .map_err(|e| platform_error(e, not_found))?;
        let bot_member = guild
            .member(&self.http, bot.id)
            .await
            .map_err(|e| {
                platform_error(e, || PlatformErrorKind::MemberNotFound {
                    guild_id,
                    user_id: bot.id.get(),
                })
            })?;

        let everyone = RoleId::new(guild_id);
        let mut text_channels: Vec<LockableChannel> = channels
            .into_values()
            .filter(|channel| channel.kind == ChannelType::Text)
            .map(|channel| LockableChannel {
                channel_id: channel.id.get(),
                manageable: partial
                    .user_permissions_in(&channel, &bot_member)
                    .manage_roles(),
                everyone: overwrite_state_from(&channel.permission_overwrites, everyone),
                name: channel.name,
            })
            .collect();
        text_channels.sort_by_key(|channel| channel.channel_id);

        debug!(count = text_channels.len(), "Resolved text channels");
        Ok(text_channels)
    }

    #[instrument(skip(self, reason))]
    async fn set_everyone_overwrite(
        &self,
        guild_id: u64,
        channel_id: u64,
        state: OverwriteState,
        reason: &str,
    ) -> PlatformResult<()> {
        let channel = ChannelId::new(channel_id);
        let not_found = || PlatformErrorKind::ChannelNotFound(channel_id);

        let guild_channel = channel
            .to_channel(&self.http)
            .await
            .map_err(|e| platform_error(e, not_found))?
            .guild()
            .ok_or_else(|| PlatformError::new(not_found()))?;

        let everyone = RoleId::new(guild_id);
        let existing = guild_channel
            .permission_overwrites
            .iter()
            .find(|o| o.kind == PermissionOverwriteType::Role(everyone));
        let overwrite = apply_overwrite_state(existing, everyone, state);

        channel
            .create_permission(&self.http, overwrite)
            .await
            .map_err(|e| platform_error(e, not_found))?;
        debug!(reason, "Channel overwrite updated");
        Ok(())
    }
}

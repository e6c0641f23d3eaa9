//! Outbound moderation calls against the chat platform.

use async_trait::async_trait;
use contro_error::PlatformResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The three `@everyone` permission flags a lockdown touches.
///
/// Each flag mirrors a channel overwrite: `Some(true)` explicitly allowed,
/// `Some(false)` explicitly denied, `None` inherited from the role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverwriteState {
    /// Send messages
    pub send_messages: Option<bool>,
    /// Add reactions
    pub add_reactions: Option<bool>,
    /// Create public threads
    pub create_public_threads: Option<bool>,
}

impl OverwriteState {
    /// All three flags explicitly denied.
    pub fn locked() -> Self {
        Self {
            send_messages: Some(false),
            add_reactions: Some(false),
            create_public_threads: Some(false),
        }
    }
}

/// A text channel as seen by the lockdown executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockableChannel {
    /// Channel id
    pub channel_id: u64,
    /// Channel name, for logs
    pub name: String,
    /// Whether the bot may edit this channel's overwrites
    pub manageable: bool,
    /// Current `@everyone` flags
    pub everyone: OverwriteState,
}

/// Platform mutations the framework can request.
///
/// Implementations resolve guilds, members and channels themselves and report
/// unresolvable targets with the matching not-found
/// [`PlatformErrorKind`](contro_error::PlatformErrorKind).
#[async_trait]
pub trait ModerationPlatform: Send + Sync {
    /// Mute a member for `duration`.
    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        duration: Duration,
        reason: &str,
    ) -> PlatformResult<()>;

    /// Remove a member from the guild.
    async fn kick_member(&self, guild_id: u64, user_id: u64, reason: &str) -> PlatformResult<()>;

    /// Ban a member, purging `delete_message_days` days of their messages.
    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        delete_message_days: u8,
        reason: &str,
    ) -> PlatformResult<()>;

    /// Delete one message.
    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
        reason: &str,
    ) -> PlatformResult<()>;

    /// Every text channel in the guild with its current `@everyone` flags.
    async fn text_channels(&self, guild_id: u64) -> PlatformResult<Vec<LockableChannel>>;

    /// Write the `@everyone` flags of one channel, leaving other permission
    /// bits untouched.
    async fn set_everyone_overwrite(
        &self,
        guild_id: u64,
        channel_id: u64,
        state: OverwriteState,
        reason: &str,
    ) -> PlatformResult<()>;
}

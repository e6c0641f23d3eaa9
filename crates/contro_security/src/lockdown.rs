//! Guild-wide channel lockdown.

use crate::{ModerationPlatform, OverwriteState};
use chrono::{DateTime, Utc};
use contro_error::PlatformResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Prior `@everyone` flags of every channel a lockdown changed.
///
/// Attached to the triggering response as `metadata["lockdown_data"]`; the
/// caller persists it and restores from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockdownSnapshot {
    /// Guild that was locked
    pub guild_id: u64,
    /// Prior flags keyed by channel id
    pub channels: BTreeMap<u64, OverwriteState>,
    /// When the lockdown started
    pub timestamp: DateTime<Utc>,
    /// Why the lockdown started
    pub reason: String,
}

/// Denies sending, reacting and thread creation to `@everyone` in every
/// manageable text channel.
#[derive(Clone)]
pub struct LockdownExecutor {
    platform: Arc<dyn ModerationPlatform>,
}

impl LockdownExecutor {
    /// Create an executor over a platform.
    pub fn new(platform: Arc<dyn ModerationPlatform>) -> Self {
        Self { platform }
    }

    /// Lock every manageable text channel in the guild.
    ///
    /// Channels the bot cannot manage are skipped. A failure on one channel is
    /// logged and the remaining channels are still processed; only a failure
    /// to list the channels aborts.
    #[instrument(skip(self, reason))]
    pub async fn lock_guild(&self, guild_id: u64, reason: &str) -> PlatformResult<LockdownSnapshot> {
        let channels = self.platform.text_channels(guild_id).await?;
        info!(channel_count = channels.len(), "Starting lockdown");

        let mut snapshot = LockdownSnapshot {
            guild_id,
            channels: BTreeMap::new(),
            timestamp: Utc::now(),
            reason: reason.to_string(),
        };

        for channel in channels {
            if !channel.manageable {
                debug!(channel_id = channel.channel_id, "Skipping unmanageable channel");
                continue;
            }

            let prior = channel.everyone;
            match self
                .platform
                .set_everyone_overwrite(guild_id, channel.channel_id, OverwriteState::locked(), reason)
                .await
            {
                Ok(()) => {
                    snapshot.channels.insert(channel.channel_id, prior);
                }
                Err(e) => {
                    warn!(
                        channel_id = channel.channel_id,
                        channel = %channel.name,
                        error = %e,
                        "Failed to lock channel"
                    );
                }
            }
        }

        info!(locked = snapshot.channels.len(), "Lockdown applied");
        Ok(snapshot)
    }
}

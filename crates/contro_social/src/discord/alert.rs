//! Moderation log alerts posted as Discord embeds.

use async_trait::async_trait;
use contro_security::{
    AlertHandler, SecurityAction, SecurityError, SecurityErrorKind, SecurityEvent,
    SecurityResponse, SecurityResult,
};
use serenity::all::{ChannelId, CreateEmbed, CreateMessage, Http, Timestamp};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Posts one embed per alert to a moderation log channel.
pub struct DiscordAlertHandler {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordAlertHandler {
    /// Create a handler posting to `channel_id`.
    pub fn new(http: Arc<Http>, channel_id: u64) -> Self {
        Self {
            http,
            channel_id: ChannelId::new(channel_id),
        }
    }

    fn embed(event: &SecurityEvent, responses: &[SecurityResponse]) -> CreateEmbed {
        let user = event
            .user_id()
            .map(|id| format!("<@{}>", id))
            .unwrap_or_else(|| "-".to_string());
        let mut embed = CreateEmbed::new()
            .title(format!("Security alert: {}", event.event_type()))
            .description(alert_description(responses))
            .color(alert_color(responses))
            .field("User", user, true)
            .field("Severity", event.severity().to_string(), true)
            .field("Event", event.event_id(), false);
        if let Ok(timestamp) = Timestamp::from_unix_timestamp(event.timestamp().timestamp()) {
            embed = embed.timestamp(timestamp);
        }
        embed
    }
}

#[async_trait]
impl AlertHandler for DiscordAlertHandler {
    #[instrument(skip_all, fields(event_id = event.event_id(), channel_id = %self.channel_id))]
    async fn handle_alert(
        &self,
        event: &SecurityEvent,
        responses: &[SecurityResponse],
    ) -> SecurityResult<()> {
        let message = CreateMessage::new().embed(Self::embed(event, responses));
        self.channel_id
            .send_message(&self.http, message)
            .await
            .map_err(|e| SecurityError::new(SecurityErrorKind::Platform(e.to_string())))?;
        debug!("Alert posted");
        Ok(())
    }
}

fn action_rank(action: SecurityAction) -> u8 {
    match action {
        SecurityAction::Allow => 0,
        SecurityAction::Warn => 1,
        SecurityAction::Delete | SecurityAction::Quarantine => 2,
        SecurityAction::Timeout | SecurityAction::Kick => 3,
        SecurityAction::Ban | SecurityAction::Lockdown => 4,
    }
}

/// Embed color for the most severe action among `responses`.
pub fn alert_color(responses: &[SecurityResponse]) -> u32 {
    let worst = responses.iter().map(|r| action_rank(r.action)).max().unwrap_or(0);
    match worst {
        4 => 0xE74C3C,
        3 => 0xE67E22,
        2 => 0xF1C40F,
        1 => 0x3498DB,
        _ => 0x95A5A6,
    }
}

/// One line per response: action, confidence and reason.
///
/// ```
/// use contro_security::{SecurityAction, SecurityResponse};
/// use contro_social::alert_description;
///
/// let responses = [SecurityResponse::new(SecurityAction::Kick, "raid").with_confidence(0.7)];
/// assert_eq!(alert_description(&responses), "**KICK** (70%) raid");
/// ```
pub fn alert_description(responses: &[SecurityResponse]) -> String {
    responses
        .iter()
        .map(|r| {
            format!(
                "**{}** ({:.0}%) {}",
                r.action.to_string().to_uppercase(),
                r.confidence * 100.0,
                r.reason
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_follows_worst_action() {
        let warn = SecurityResponse::new(SecurityAction::Warn, "w");
        let ban = SecurityResponse::new(SecurityAction::Ban, "b");
        assert_eq!(alert_color(std::slice::from_ref(&warn)), 0x3498DB);
        assert_eq!(alert_color(&[warn, ban]), 0xE74C3C);
        assert_eq!(alert_color(&[]), 0x95A5A6);
    }

    #[test]
    fn test_description_lists_every_response() {
        let responses = [
            SecurityResponse::new(SecurityAction::Delete, "mention spam").with_confidence(0.8),
            SecurityResponse::new(SecurityAction::Timeout, "flood"),
        ];
        assert_eq!(
            alert_description(&responses),
            "**DELETE** (80%) mention spam\n**TIMEOUT** (100%) flood"
        );
    }
}

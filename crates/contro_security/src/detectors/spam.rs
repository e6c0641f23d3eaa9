//! Message flood and mention spam detection.

use super::require_positive;
use crate::{
    ModuleState, RateLimit, RateLimiter, SecurityAction, SecurityConfig, SecurityEvent,
    SecurityModule, SecurityResponse, SecurityResult,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Registered name of the spam detector.
pub const SPAM_DETECTOR: &str = "spam-detector";

/// Detects message floods, mass mentions and messages from blacklisted users.
///
/// Limits read from [`SecurityConfig::rate_limits`]:
/// - `messages_per_window` (default 5) messages per user per
/// - `window_secs` (default 5) seconds before a TIMEOUT is recommended
/// - `max_mentions` (default 5) mentions in one message before a DELETE, 0 disables
///
/// `custom_settings.timeout_minutes` (default 10) sets the timeout length.
pub struct SpamDetector {
    state: ModuleState,
    messages: RateLimiter<u64>,
}

impl SpamDetector {
    /// Create the detector from its configuration.
    pub fn new(config: SecurityConfig) -> Self {
        let messages = RateLimiter::new(Self::message_limit(&config));
        Self {
            state: ModuleState::new(SPAM_DETECTOR, config),
            messages,
        }
    }

    fn message_limit(config: &SecurityConfig) -> RateLimit {
        RateLimit::new(
            config.rate_limit("messages_per_window", 5) as usize,
            config.rate_limit("window_secs", 5),
        )
    }
}

#[async_trait]
impl SecurityModule for SpamDetector {
    fn state(&self) -> &ModuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModuleState {
        &mut self.state
    }

    async fn process_event(&mut self, event: &SecurityEvent) -> SecurityResult<SecurityResponse> {
        if event.event_type() != "message" {
            return Ok(SecurityResponse::allow());
        }
        let Some(user_id) = event.user_id() else {
            return Ok(SecurityResponse::allow());
        };

        if self.state.is_blacklisted(user_id) {
            return Ok(
                SecurityResponse::new(SecurityAction::Delete, "Message from blacklisted user")
                    .with_auto_resolve(true),
            );
        }

        let config = self.state.config();
        let max_mentions = config.rate_limit("max_mentions", 5);
        let mentions = event.datum_u64("mention_count").unwrap_or(0);
        if max_mentions > 0 && mentions >= max_mentions {
            debug!(user_id, mentions, "Mention spam detected");
            return Ok(SecurityResponse::new(
                SecurityAction::Delete,
                format!("Mention spam: {} mentions in one message", mentions),
            )
            .with_confidence(0.8)
            .with_metadata("mention_count", mentions));
        }

        if self.messages.is_rate_limited(&user_id) {
            let limit = self.messages.limit();
            let reason = format!(
                "Rate exceeded: more than {} messages in {}s",
                limit.max_attempts, limit.window_secs
            );
            debug!(user_id, "Message flood detected");

            if !config.auto_action {
                return Ok(SecurityResponse::new(SecurityAction::Warn, reason).with_confidence(0.9));
            }
            let minutes = config.custom_u64("timeout_minutes", 10);
            return Ok(SecurityResponse::new(SecurityAction::Timeout, reason)
                .with_confidence(0.9)
                .with_duration(Duration::from_secs(minutes * 60))
                .with_auto_resolve(true));
        }

        self.messages.add_attempt(user_id);
        Ok(SecurityResponse::allow())
    }

    fn configure(&mut self, settings: &Map<String, Value>) -> bool {
        let merged = self.state.merge_settings_with(settings, |config| {
            require_positive(config, &["messages_per_window", "window_secs"])
        });
        if let Err(e) = merged {
            warn!(error = %e, "Spam detector configuration rejected");
            return false;
        }

        let limit = Self::message_limit(self.state.config());
        if limit != self.messages.limit() {
            self.messages = RateLimiter::new(limit);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecurityEventBuilder;
    use serde_json::json;

    fn message(id: u32, user_id: u64, mentions: u64) -> SecurityEvent {
        SecurityEventBuilder::default()
            .event_id(format!("m{}", id))
            .event_type("message")
            .guild_id(1)
            .user_id(user_id)
            .channel_id(10)
            .datum("message_id", 1000 + id as u64)
            .datum("mention_count", mentions)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_recommends_timeout() {
        let mut detector = SpamDetector::new(SecurityConfig::default());

        for i in 0..5 {
            let response = detector.process_event(&message(i, 7, 0)).await.unwrap();
            assert_eq!(response.action, SecurityAction::Allow);
        }

        let response = detector.process_event(&message(5, 7, 0)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Timeout);
        assert_eq!(response.duration, Some(Duration::from_secs(600)));

        // Other users are tracked separately
        let response = detector.process_event(&message(6, 8, 0)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Allow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_expires_with_window() {
        let mut detector = SpamDetector::new(SecurityConfig::default());
        for i in 0..5 {
            detector.process_event(&message(i, 7, 0)).await.unwrap();
        }

        tokio::time::advance(Duration::from_secs(6)).await;
        let response = detector.process_event(&message(5, 7, 0)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Allow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_only_warns_without_auto_action() {
        let config = SecurityConfig {
            auto_action: false,
            ..SecurityConfig::default()
        };
        let mut detector = SpamDetector::new(config);
        for i in 0..5 {
            detector.process_event(&message(i, 7, 0)).await.unwrap();
        }

        let response = detector.process_event(&message(5, 7, 0)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Warn);
        assert_eq!(response.duration, None);
    }

    #[tokio::test]
    async fn test_mass_mentions_deleted() {
        let mut detector = SpamDetector::new(SecurityConfig::default());
        let response = detector.process_event(&message(0, 7, 12)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Delete);
        assert_eq!(response.metadata["mention_count"], json!(12));
    }

    #[tokio::test]
    async fn test_blacklisted_author_deleted() {
        let mut config = SecurityConfig::default();
        config.blacklist.insert(7);
        let mut detector = SpamDetector::new(config);

        let response = detector.process_event(&message(0, 7, 0)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Delete);
    }

    #[tokio::test]
    async fn test_ignores_other_event_types() {
        let mut detector = SpamDetector::new(SecurityConfig::default());
        let event = SecurityEventBuilder::default()
            .event_id("j1")
            .event_type("member_join")
            .guild_id(1)
            .user_id(7)
            .build()
            .unwrap();
        let response = detector.process_event(&event).await.unwrap();
        assert_eq!(response.action, SecurityAction::Allow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configure_rebuilds_limiter() {
        let mut detector = SpamDetector::new(SecurityConfig::default());
        let settings = json!({ "rate_limits": { "messages_per_window": 2, "window_secs": 5 } });
        assert!(detector.configure(settings.as_object().unwrap()));

        for i in 0..2 {
            detector.process_event(&message(i, 7, 0)).await.unwrap();
        }
        let response = detector.process_event(&message(2, 7, 0)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Timeout);
    }

    #[test]
    fn test_configure_rejects_zero_window() {
        let mut detector = SpamDetector::new(SecurityConfig::default());
        let settings = json!({ "rate_limits": { "window_secs": 0 } });
        assert!(!detector.configure(settings.as_object().unwrap()));
        assert_eq!(detector.state().config().rate_limit("window_secs", 5), 5);
    }
}

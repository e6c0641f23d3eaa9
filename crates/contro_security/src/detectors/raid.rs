//! Join raid detection.

use super::require_positive;
use crate::{
    ModuleState, RateLimit, RateLimiter, SecurityAction, SecurityConfig, SecurityEvent,
    SecurityModule, SecurityResponse, SecurityResult,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Registered name of the raid detector.
pub const RAID_DETECTOR: &str = "raid-detector";

/// Detects join floods per guild.
///
/// Limits read from [`SecurityConfig::rate_limits`]:
/// - `joins_per_window` (default 10) joins within `window_secs` (default 30)
///   trigger a LOCKDOWN
/// - `lockdown_cooldown_secs` (default 600): after a lockdown further joins are
///   kicked (or warned about without `auto_action`) instead of locking again
/// - `min_account_age_days` (default 0, disabled): younger accounts are
///   quarantined
///
/// Blacklisted accounts are banned on join with one day of messages purged.
pub struct RaidDetector {
    state: ModuleState,
    joins: RateLimiter<u64>,
    lockdowns: HashMap<u64, Instant>,
}

impl RaidDetector {
    /// Create the detector from its configuration.
    pub fn new(config: SecurityConfig) -> Self {
        let joins = RateLimiter::new(Self::join_limit(&config));
        Self {
            state: ModuleState::new(RAID_DETECTOR, config),
            joins,
            lockdowns: HashMap::new(),
        }
    }

    fn join_limit(config: &SecurityConfig) -> RateLimit {
        RateLimit::new(
            config.rate_limit("joins_per_window", 10) as usize,
            config.rate_limit("window_secs", 30),
        )
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(self.state.config().rate_limit("lockdown_cooldown_secs", 600))
    }

    fn in_cooldown(&mut self, guild_id: u64) -> bool {
        let cooldown = self.cooldown();
        match self.lockdowns.get(&guild_id) {
            Some(started) if started.elapsed() < cooldown => true,
            Some(_) => {
                self.lockdowns.remove(&guild_id);
                false
            }
            None => false,
        }
    }
}

#[async_trait]
impl SecurityModule for RaidDetector {
    fn state(&self) -> &ModuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModuleState {
        &mut self.state
    }

    async fn process_event(&mut self, event: &SecurityEvent) -> SecurityResult<SecurityResponse> {
        if event.event_type() != "member_join" {
            return Ok(SecurityResponse::allow());
        }
        let guild_id = event.guild_id();

        if let Some(user_id) = event.user_id() {
            if self.state.is_blacklisted(user_id) {
                return Ok(
                    SecurityResponse::new(SecurityAction::Ban, "Blacklisted account joined")
                        .with_metadata("delete_message_days", 1),
                );
            }
        }

        self.joins.add_attempt(guild_id);

        if self.in_cooldown(guild_id) {
            let reason = "Joined during an active raid lockdown";
            let action = if self.state.config().auto_action {
                SecurityAction::Kick
            } else {
                SecurityAction::Warn
            };
            return Ok(SecurityResponse::new(action, reason).with_confidence(0.7));
        }

        if self.joins.is_rate_limited(&guild_id) {
            let limit = self.joins.limit();
            let join_count = self.joins.attempt_count(&guild_id);
            info!(guild_id, join_count, "Join raid detected");
            self.lockdowns.insert(guild_id, Instant::now());
            return Ok(SecurityResponse::new(
                SecurityAction::Lockdown,
                format!("Join raid: {} joins within {}s", join_count, limit.window_secs),
            )
            .with_confidence(0.85)
            .with_metadata("join_count", join_count as u64));
        }

        let min_age = self.state.config().rate_limit("min_account_age_days", 0);
        if min_age > 0 {
            if let Some(age) = event.datum_u64("account_age_days") {
                if age < min_age {
                    return Ok(SecurityResponse::new(
                        SecurityAction::Quarantine,
                        format!("Account is {} days old, minimum is {}", age, min_age),
                    )
                    .with_confidence(0.6));
                }
            }
        }

        Ok(SecurityResponse::allow())
    }

    fn configure(&mut self, settings: &Map<String, Value>) -> bool {
        let merged = self.state.merge_settings_with(settings, |config| {
            require_positive(config, &["joins_per_window", "window_secs"])
        });
        if let Err(e) = merged {
            warn!(error = %e, "Raid detector configuration rejected");
            return false;
        }

        let limit = Self::join_limit(self.state.config());
        if limit != self.joins.limit() {
            self.joins = RateLimiter::new(limit);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecurityEventBuilder;
    use serde_json::json;

    fn join(id: u32, user_id: u64) -> SecurityEvent {
        SecurityEventBuilder::default()
            .event_id(format!("j{}", id))
            .event_type("member_join")
            .guild_id(1)
            .user_id(user_id)
            .build()
            .unwrap()
    }

    async fn flood(detector: &mut RaidDetector, count: u32) -> Vec<SecurityAction> {
        let mut actions = Vec::new();
        for i in 0..count {
            let response = detector.process_event(&join(i, 100 + i as u64)).await.unwrap();
            actions.push(response.action);
        }
        actions
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_flood_triggers_single_lockdown() {
        let mut detector = RaidDetector::new(SecurityConfig::default());
        let actions = flood(&mut detector, 12).await;

        assert!(actions[..9].iter().all(|a| *a == SecurityAction::Allow));
        assert_eq!(actions[9], SecurityAction::Lockdown);
        assert_eq!(&actions[10..], &[SecurityAction::Kick, SecurityAction::Kick]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expires() {
        let mut detector = RaidDetector::new(SecurityConfig::default());
        flood(&mut detector, 10).await;

        tokio::time::advance(Duration::from_secs(601)).await;
        let response = detector.process_event(&join(50, 500)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Allow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_warns_without_auto_action() {
        let config = SecurityConfig {
            auto_action: false,
            ..SecurityConfig::default()
        };
        let mut detector = RaidDetector::new(config);
        let actions = flood(&mut detector, 11).await;
        assert_eq!(actions[10], SecurityAction::Warn);
    }

    #[tokio::test]
    async fn test_blacklisted_joiner_banned() {
        let mut config = SecurityConfig::default();
        config.blacklist.insert(666);
        let mut detector = RaidDetector::new(config);

        let response = detector.process_event(&join(0, 666)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Ban);
        assert_eq!(response.metadata["delete_message_days"], json!(1));
    }

    #[tokio::test]
    async fn test_young_accounts_quarantined() {
        let mut config = SecurityConfig::default();
        config.rate_limits.insert("min_account_age_days".to_string(), 7);
        let mut detector = RaidDetector::new(config);

        let young = SecurityEventBuilder::default()
            .event_id("j1")
            .event_type("member_join")
            .guild_id(1)
            .user_id(5)
            .datum("account_age_days", 2)
            .build()
            .unwrap();
        let response = detector.process_event(&young).await.unwrap();
        assert_eq!(response.action, SecurityAction::Quarantine);

        let response = detector.process_event(&join(2, 6)).await.unwrap();
        assert_eq!(response.action, SecurityAction::Allow);
    }

    #[test]
    fn test_configure_rejects_zero_joins() {
        let mut detector = RaidDetector::new(SecurityConfig::default());
        let settings = json!({ "rate_limits": { "joins_per_window": 0 } });
        assert!(!detector.configure(settings.as_object().unwrap()));
    }
}

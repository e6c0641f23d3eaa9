//! Event and response value types.

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// How serious a detected occurrence is.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    #[default]
    #[display("low")]
    Low,
    /// Worth a look
    #[display("medium")]
    Medium,
    /// Needs action
    #[display("high")]
    High,
    /// Needs action now
    #[display("critical")]
    Critical,
}

/// Remediation recommended by a security module.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum SecurityAction {
    /// Nothing to do
    #[display("allow")]
    Allow,
    /// Warn the actor
    #[display("warn")]
    Warn,
    /// Temporarily mute the member
    #[display("timeout")]
    Timeout,
    /// Remove the member from the guild
    #[display("kick")]
    Kick,
    /// Ban the member
    #[display("ban")]
    Ban,
    /// Delete the offending message
    #[display("delete")]
    Delete,
    /// Lock every text channel in the guild
    #[display("lockdown")]
    Lockdown,
    /// Isolate the member pending review
    #[display("quarantine")]
    Quarantine,
}

impl SecurityAction {
    /// Anything other than [`SecurityAction::Allow`].
    pub fn is_significant(self) -> bool {
        self != SecurityAction::Allow
    }

    /// Actions the framework executes inline during fan-out.
    pub fn is_critical(self) -> bool {
        matches!(self, SecurityAction::Ban | SecurityAction::Lockdown)
    }

    /// Actions counted by a module's `actions_taken` statistic.
    pub fn is_member_action(self) -> bool {
        matches!(
            self,
            SecurityAction::Timeout | SecurityAction::Kick | SecurityAction::Ban
        )
    }
}

/// A detected occurrence routed through the security framework.
///
/// Events are immutable once built:
///
/// ```
/// use contro_security::{SecurityEventBuilder, Severity};
///
/// let event = SecurityEventBuilder::default()
///     .event_id("e1")
///     .event_type("message")
///     .guild_id(1)
///     .user_id(42)
///     .datum("content", "hello")
///     .build()
///     .unwrap();
///
/// assert_eq!(event.user_id(), Some(42));
/// assert_eq!(event.severity(), Severity::Low);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct SecurityEvent {
    /// Caller-supplied unique identifier
    #[builder(setter(into))]
    event_id: String,
    /// When the occurrence was observed
    #[builder(default = Utc::now())]
    timestamp: DateTime<Utc>,
    /// Guild the occurrence belongs to
    guild_id: u64,
    /// Acting user, if any
    #[builder(setter(strip_option), default)]
    user_id: Option<u64>,
    /// Channel the occurrence happened in, if any
    #[builder(setter(strip_option), default)]
    channel_id: Option<u64>,
    /// Free-form tag such as `message` or `member_join`
    #[builder(setter(into))]
    event_type: String,
    /// Detector-specific payload
    #[builder(default)]
    data: HashMap<String, Value>,
    /// Severity reported by the producer
    #[builder(default)]
    severity: Severity,
}

impl SecurityEventBuilder {
    /// Insert a single payload entry.
    pub fn datum(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.data
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

impl SecurityEvent {
    /// Event identifier.
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Observation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Guild identifier.
    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }

    /// Acting user.
    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    /// Channel identifier.
    pub fn channel_id(&self) -> Option<u64> {
        self.channel_id
    }

    /// Event type tag.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Full payload.
    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    /// Single payload entry.
    pub fn datum(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Payload entry read as an unsigned integer. Numeric strings are accepted
    /// because snowflake ids are often carried as strings.
    pub fn datum_u64(&self, key: &str) -> Option<u64> {
        match self.data.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Reported severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

/// A module's verdict on one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityResponse {
    /// Recommended remediation
    pub action: SecurityAction,
    /// Human-readable reason
    pub reason: String,
    /// Advisory confidence between 0.0 and 1.0
    pub confidence: f64,
    /// Action parameters such as `delete_message_days` or `lockdown_data`
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Advisory flag for follow-up tooling
    #[serde(default)]
    pub auto_resolve: bool,
    /// Length of a timeout or temporary ban
    #[serde(default)]
    pub duration: Option<Duration>,
}

impl SecurityResponse {
    /// Create a response with full confidence.
    pub fn new(action: SecurityAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
            confidence: 1.0,
            metadata: HashMap::new(),
            auto_resolve: false,
            duration: None,
        }
    }

    /// Nothing detected.
    pub fn allow() -> Self {
        Self::new(SecurityAction::Allow, "No threat detected")
    }

    /// Set the confidence, clamped to 0.0..=1.0.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the action duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Mark the response as auto-resolving.
    pub fn with_auto_resolve(mut self, auto_resolve: bool) -> Self {
        self.auto_resolve = auto_resolve;
        self
    }

    /// Whether the response should reach alert handlers.
    pub fn is_significant(&self) -> bool {
        self.action.is_significant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_identity_fields() {
        let missing = SecurityEventBuilder::default().event_type("message").build();
        assert!(missing.is_err());
    }

    #[test]
    fn test_datum_u64_accepts_strings_and_numbers() {
        let event = SecurityEventBuilder::default()
            .event_id("e1")
            .event_type("message")
            .guild_id(1)
            .datum("message_id", "123456789012345678")
            .datum("mention_count", 3)
            .datum("content", "hi")
            .build()
            .unwrap();

        assert_eq!(event.datum_u64("message_id"), Some(123_456_789_012_345_678));
        assert_eq!(event.datum_u64("mention_count"), Some(3));
        assert_eq!(event.datum_u64("content"), None);
        assert_eq!(event.datum_u64("absent"), None);
    }

    #[test]
    fn test_action_classes() {
        assert!(!SecurityAction::Allow.is_significant());
        assert!(SecurityAction::Warn.is_significant());
        assert!(SecurityAction::Ban.is_critical());
        assert!(SecurityAction::Lockdown.is_critical());
        assert!(!SecurityAction::Kick.is_critical());
        assert!(SecurityAction::Timeout.is_member_action());
        assert!(!SecurityAction::Delete.is_member_action());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let response = SecurityResponse::new(SecurityAction::Warn, "test").with_confidence(1.7);
        assert_eq!(response.confidence, 1.0);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::default(), Severity::Low);
    }
}

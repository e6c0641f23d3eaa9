//! Module and framework configuration.

use crate::Severity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Per-module configuration.
///
/// Every field has a serde default so partial TOML tables deserialize:
///
/// ```toml
/// [modules.spam-detector]
/// sensitivity = 0.7
/// whitelist = [123456789012345678]
///
/// [modules.spam-detector.rate_limits]
/// messages_per_window = 5
/// window_secs = 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Whether the module evaluates events at all
    pub enabled: bool,
    /// Detection sensitivity between 0.0 and 1.0
    pub sensitivity: f64,
    /// Whether the module may recommend enforcing actions
    pub auto_action: bool,
    /// Whether each evaluated event is logged
    pub log_events: bool,
    /// Minimum severity worth alerting on
    pub alert_threshold: Severity,
    /// Named numeric limits
    pub rate_limits: HashMap<String, u64>,
    /// Actors the module never evaluates
    pub whitelist: HashSet<u64>,
    /// Actors the module treats more strictly
    pub blacklist: HashSet<u64>,
    /// Module-specific settings
    pub custom_settings: HashMap<String, Value>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitivity: 0.5,
            auto_action: true,
            log_events: true,
            alert_threshold: Severity::Medium,
            rate_limits: HashMap::new(),
            whitelist: HashSet::new(),
            blacklist: HashSet::new(),
            custom_settings: HashMap::new(),
        }
    }
}

impl SecurityConfig {
    /// Read a named limit, falling back to `default` when unset.
    pub fn rate_limit(&self, name: &str, default: u64) -> u64 {
        self.rate_limits.get(name).copied().unwrap_or(default)
    }

    /// Read a custom setting as an unsigned integer.
    pub fn custom_u64(&self, name: &str, default: u64) -> u64 {
        self.custom_settings
            .get(name)
            .and_then(Value::as_u64)
            .unwrap_or(default)
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Maximum number of queued events before producers wait
    pub queue_capacity: usize,
    /// Per-module evaluation timeout in seconds, 0 disables it
    pub module_timeout_secs: u64,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            module_timeout_secs: 30,
        }
    }
}

impl FrameworkConfig {
    /// Evaluation timeout, if enabled.
    pub fn module_timeout(&self) -> Option<Duration> {
        (self.module_timeout_secs > 0).then(|| Duration::from_secs(self.module_timeout_secs))
    }
}

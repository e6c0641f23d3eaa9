//! Security module capability and the state every module carries.

use crate::{
    SecurityConfig, SecurityError, SecurityErrorKind, SecurityEvent, SecurityResponse,
    SecurityResult,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{debug, instrument, warn};

/// Maximum number of events retained in a module's history.
pub const MAX_HISTORY: usize = 1000;

/// Counters kept by every module. They only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModuleStats {
    /// Events evaluated
    pub events_processed: u64,
    /// Evaluations that returned anything but ALLOW
    pub threats_detected: u64,
    /// Evaluations that returned TIMEOUT, KICK or BAN
    pub actions_taken: u64,
    /// Detections later reported as wrong
    pub false_positives: u64,
}

/// Observability snapshot of one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStatus {
    /// Module name
    pub name: String,
    /// Whether the module is evaluating events
    pub enabled: bool,
    /// Configured sensitivity
    pub sensitivity: f64,
    /// Whether enforcing actions are recommended
    pub auto_action: bool,
    /// Number of events currently retained
    pub history_len: usize,
    /// Counters
    pub stats: ModuleStats,
}

/// Name, configuration, history and statistics shared by all modules.
///
/// Concrete detectors hold one of these and expose it through
/// [`SecurityModule::state`]; the framework consults it for gating and
/// bookkeeping so that detectors cannot alter those rules.
#[derive(Debug, Clone)]
pub struct ModuleState {
    name: String,
    config: SecurityConfig,
    enabled: bool,
    history: VecDeque<SecurityEvent>,
    stats: ModuleStats,
}

impl ModuleState {
    /// Create module state from a configuration.
    pub fn new(name: impl Into<String>, config: SecurityConfig) -> Self {
        let enabled = config.enabled;
        Self {
            name: name.into(),
            config,
            enabled,
            history: VecDeque::new(),
            stats: ModuleStats::default(),
        }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current configuration.
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Whether the module is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the module.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.config.enabled = enabled;
    }

    /// Retained events, oldest first.
    pub fn history(&self) -> &VecDeque<SecurityEvent> {
        &self.history
    }

    /// Current counters.
    pub fn stats(&self) -> ModuleStats {
        self.stats
    }

    /// Whether the actor is whitelisted.
    pub fn is_whitelisted(&self, actor_id: u64) -> bool {
        self.config.whitelist.contains(&actor_id)
    }

    /// Whether the actor is blacklisted.
    pub fn is_blacklisted(&self, actor_id: u64) -> bool {
        self.config.blacklist.contains(&actor_id)
    }

    /// Gate consulted before every evaluation. Blacklisted actors are not
    /// filtered here; detectors decide how to treat them.
    pub fn should_process_event(&self, event: &SecurityEvent) -> bool {
        if !self.enabled {
            return false;
        }
        match event.user_id() {
            Some(user_id) => !self.is_whitelisted(user_id),
            None => true,
        }
    }

    /// Record the outcome of one evaluation.
    pub fn update_stats(&mut self, response: &SecurityResponse) {
        self.stats.events_processed += 1;
        if response.action.is_significant() {
            self.stats.threats_detected += 1;
        }
        if response.action.is_member_action() {
            self.stats.actions_taken += 1;
        }
    }

    /// Count a detection that turned out to be wrong.
    pub fn record_false_positive(&mut self) {
        self.stats.false_positives += 1;
    }

    /// Append an event, dropping the oldest past [`MAX_HISTORY`].
    pub fn add_to_history(&mut self, event: SecurityEvent) {
        if self.config.log_events {
            debug!(
                module = %self.name,
                event_id = event.event_id(),
                event_type = event.event_type(),
                "Recording event"
            );
        }
        self.history.push_back(event);
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// Merge a JSON object of settings into the configuration.
    ///
    /// The merge goes through serde so every field keeps its declared type; a
    /// rejected merge leaves the previous configuration untouched.
    pub fn merge_settings(&mut self, settings: &Map<String, Value>) -> SecurityResult<()> {
        self.merge_settings_with(settings, |_| Ok(()))
    }

    /// Like [`merge_settings`](Self::merge_settings), with an extra check run
    /// against the merged configuration before it is applied.
    #[instrument(skip(self, settings, validate), fields(module = %self.name, keys = settings.len()))]
    pub fn merge_settings_with<F>(
        &mut self,
        settings: &Map<String, Value>,
        validate: F,
    ) -> SecurityResult<()>
    where
        F: FnOnce(&SecurityConfig) -> Result<(), String>,
    {
        let invalid = |reason: String| {
            SecurityError::new(SecurityErrorKind::InvalidSettings {
                module: self.name.clone(),
                reason,
            })
        };

        let mut merged = match serde_json::to_value(&self.config) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(invalid("configuration is not an object".to_string())),
            Err(e) => return Err(invalid(e.to_string())),
        };
        for (key, value) in settings {
            merged.insert(key.clone(), value.clone());
        }

        let config: SecurityConfig =
            serde_json::from_value(Value::Object(merged)).map_err(|e| invalid(e.to_string()))?;

        if !(0.0..=1.0).contains(&config.sensitivity) {
            warn!(sensitivity = config.sensitivity, "Rejected sensitivity");
            return Err(invalid(format!(
                "sensitivity {} outside 0.0..=1.0",
                config.sensitivity
            )));
        }
        validate(&config).map_err(invalid)?;

        self.enabled = config.enabled;
        self.config = config;
        debug!("Settings merged");
        Ok(())
    }

    /// Snapshot for status reporting.
    pub fn status(&self) -> ModuleStatus {
        ModuleStatus {
            name: self.name.clone(),
            enabled: self.enabled,
            sensitivity: self.config.sensitivity,
            auto_action: self.config.auto_action,
            history_len: self.history.len(),
            stats: self.stats,
        }
    }
}

/// Capability implemented by every detector.
///
/// Modules only recommend remediations; the framework decides what to
/// execute.
///
/// ```
/// use async_trait::async_trait;
/// use contro_security::{
///     ModuleState, SecurityConfig, SecurityEvent, SecurityModule, SecurityResponse,
///     SecurityResult,
/// };
///
/// struct AllowAll(ModuleState);
///
/// #[async_trait]
/// impl SecurityModule for AllowAll {
///     fn state(&self) -> &ModuleState {
///         &self.0
///     }
///
///     fn state_mut(&mut self) -> &mut ModuleState {
///         &mut self.0
///     }
///
///     async fn process_event(&mut self, _event: &SecurityEvent) -> SecurityResult<SecurityResponse> {
///         Ok(SecurityResponse::allow())
///     }
/// }
///
/// let module = AllowAll(ModuleState::new("allow-all", SecurityConfig::default()));
/// assert_eq!(module.name(), "allow-all");
/// ```
#[async_trait]
pub trait SecurityModule: Send + Sync {
    /// Shared module state.
    fn state(&self) -> &ModuleState;

    /// Mutable shared module state.
    fn state_mut(&mut self) -> &mut ModuleState;

    /// Evaluate one event and return exactly one verdict.
    async fn process_event(&mut self, event: &SecurityEvent) -> SecurityResult<SecurityResponse>;

    /// Module name.
    fn name(&self) -> &str {
        self.state().name()
    }

    /// Merge settings into the configuration. Returns whether they were
    /// accepted.
    fn configure(&mut self, settings: &Map<String, Value>) -> bool {
        match self.state_mut().merge_settings(settings) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Configuration rejected");
                false
            }
        }
    }

    /// Observability snapshot.
    fn status(&self) -> ModuleStatus {
        self.state().status()
    }
}

//! Queue-based dispatcher routing events through registered modules.

use crate::{
    AlertHandler, FrameworkConfig, LockdownExecutor, ModerationPlatform, ModuleStatus,
    SecurityAction, SecurityError, SecurityErrorKind, SecurityEvent, SecurityModule,
    SecurityResponse, SecurityResult,
};
use contro_error::PlatformResult;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

/// Timeout applied when a TIMEOUT response carries no duration.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Upper bound Discord accepts for ban message purges.
const MAX_DELETE_MESSAGE_DAYS: u64 = 7;

/// Result of executing one response against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The platform call succeeded
    Executed,
    /// Nothing was attempted
    Skipped(String),
    /// The platform call failed and was dropped
    Failed(String),
}

impl ActionOutcome {
    /// Whether the remediation took effect.
    pub fn is_executed(&self) -> bool {
        matches!(self, ActionOutcome::Executed)
    }
}

/// Framework-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalStats {
    /// Calls to `process_event`
    pub total_events: u64,
    /// Non-ALLOW responses across all events
    pub total_threats: u64,
    /// Remediations that took effect
    pub total_actions: u64,
    /// Remediations that failed
    pub failed_actions: u64,
    /// Enabled modules as of the last registration change
    pub modules_active: usize,
}

#[derive(Debug, Default)]
struct StatsCounters {
    total_events: AtomicU64,
    total_threats: AtomicU64,
    total_actions: AtomicU64,
    failed_actions: AtomicU64,
    modules_active: AtomicUsize,
}

impl StatsCounters {
    fn snapshot(&self) -> GlobalStats {
        GlobalStats {
            total_events: self.total_events.load(Ordering::Relaxed),
            total_threats: self.total_threats.load(Ordering::Relaxed),
            total_actions: self.total_actions.load(Ordering::Relaxed),
            failed_actions: self.failed_actions.load(Ordering::Relaxed),
            modules_active: self.modules_active.load(Ordering::Relaxed),
        }
    }
}

/// Status report for admin commands and health checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkStatus {
    /// Registered modules
    pub modules_registered: usize,
    /// Enabled modules
    pub modules_active: usize,
    /// Whether the consumer task is alive
    pub processing_active: bool,
    /// Events waiting in the queue
    pub queue_size: usize,
    /// Framework counters
    pub stats: GlobalStats,
    /// Per-module status keyed by name
    pub modules: BTreeMap<String, ModuleStatus>,
}

/// In-process security event dispatcher.
///
/// Producers call [`queue_event`](Self::queue_event); a single consumer task
/// started with [`start_processing`](Self::start_processing) dequeues events in
/// FIFO order and fans each one out to every registered module in
/// registration order. BAN and LOCKDOWN verdicts are executed inline during
/// the fan-out, every other verdict only reaches the alert handlers.
///
/// Construct one framework per bot instance and share it through an `Arc`.
pub struct SecurityFramework {
    config: FrameworkConfig,
    modules: Mutex<Vec<Box<dyn SecurityModule>>>,
    statuses: RwLock<BTreeMap<String, ModuleStatus>>,
    platform: Arc<dyn ModerationPlatform>,
    lockdown: LockdownExecutor,
    alert_handlers: RwLock<Vec<Arc<dyn AlertHandler>>>,
    stats: StatsCounters,
    sender: mpsc::Sender<SecurityEvent>,
    receiver: Arc<Mutex<mpsc::Receiver<SecurityEvent>>>,
    unfinished: AtomicUsize,
    drained: Notify,
    processor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SecurityFramework {
    /// Create a framework executing remediations through `platform`.
    pub fn new(config: FrameworkConfig, platform: Arc<dyn ModerationPlatform>) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            config,
            modules: Mutex::new(Vec::new()),
            statuses: RwLock::new(BTreeMap::new()),
            lockdown: LockdownExecutor::new(Arc::clone(&platform)),
            platform,
            alert_handlers: RwLock::new(Vec::new()),
            stats: StatsCounters::default(),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            unfinished: AtomicUsize::new(0),
            drained: Notify::new(),
            processor: parking_lot::Mutex::new(None),
        }
    }

    /// Framework configuration.
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Register a module. A module with the same name is replaced in place.
    #[instrument(skip(self, module), fields(module = module.name()))]
    pub async fn register_module<M>(&self, module: M)
    where
        M: SecurityModule + 'static,
    {
        let mut modules = self.modules.lock().await;
        let module: Box<dyn SecurityModule> = Box::new(module);
        self.publish_status(module.as_ref());
        match modules.iter().position(|m| m.name() == module.name()) {
            Some(index) => {
                modules[index] = module;
                info!("Replaced security module");
            }
            None => {
                modules.push(module);
                info!("Registered security module");
            }
        }
        self.recount_active(&modules);
    }

    /// Remove a module. Returns whether it was registered.
    #[instrument(skip(self))]
    pub async fn unregister_module(&self, name: &str) -> bool {
        let mut modules = self.modules.lock().await;
        let before = modules.len();
        modules.retain(|m| m.name() != name);
        let removed = modules.len() != before;
        self.statuses.write().remove(name);
        if removed {
            info!("Unregistered security module");
        } else {
            debug!("No module registered under that name");
        }
        self.recount_active(&modules);
        removed
    }

    /// Apply settings to a registered module. Returns `None` when no module has
    /// that name, otherwise whether the module accepted the settings.
    #[instrument(skip(self, settings))]
    pub async fn configure_module(&self, name: &str, settings: &Map<String, Value>) -> Option<bool> {
        let mut modules = self.modules.lock().await;
        let module = modules.iter_mut().find(|m| m.name() == name)?;
        let accepted = module.configure(settings);
        self.publish_status(module.as_ref());
        self.recount_active(&modules);
        Some(accepted)
    }

    /// Names of registered modules in registration order.
    pub async fn module_names(&self) -> Vec<String> {
        self.modules
            .lock()
            .await
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    fn publish_status(&self, module: &dyn SecurityModule) {
        self.statuses
            .write()
            .insert(module.name().to_string(), module.status());
    }

    fn recount_active(&self, modules: &[Box<dyn SecurityModule>]) {
        let active = modules.iter().filter(|m| m.state().enabled()).count();
        self.stats.modules_active.store(active, Ordering::Relaxed);
    }

    /// Register an alert handler.
    pub fn add_alert_handler<H>(&self, handler: H)
    where
        H: AlertHandler + 'static,
    {
        self.alert_handlers.write().push(Arc::new(handler));
    }

    /// Enqueue an event for the consumer task. Waits while the queue is full.
    pub async fn queue_event(&self, event: SecurityEvent) -> SecurityResult<()> {
        self.unfinished.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(event).await.is_err() {
            self.mark_done();
            return Err(SecurityError::new(SecurityErrorKind::QueueClosed));
        }
        Ok(())
    }

    /// Events waiting to be dequeued.
    pub fn queue_size(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Resolve once every queued event has been fully processed.
    pub async fn wait_until_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.unfinished.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Hand out the completion of one queued event. The guard travels with
    /// the dispatch task, so the count drops even when the consumer that
    /// spawned it has been cancelled.
    fn completion(self: &Arc<Self>) -> Completion {
        Completion {
            framework: Arc::clone(self),
        }
    }

    fn mark_done(&self) {
        if self.unfinished.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Start the consumer task. Does nothing if it is already running.
    pub fn start_processing(self: &Arc<Self>) {
        let mut processor = self.processor.lock();
        if processor.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Event processing already running");
            return;
        }
        let framework = Arc::clone(self);
        *processor = Some(tokio::spawn(framework.consume()));
        info!("Security event processing started");
    }

    /// Cancel the consumer task and wait for it to finish.
    pub async fn stop_processing(&self) {
        let handle = self.processor.lock().take();
        let Some(handle) = handle else {
            debug!("Event processing not running");
            return;
        };

        handle.abort();
        match handle.await {
            Ok(()) => info!("Security event processing stopped"),
            Err(e) if e.is_cancelled() => info!("Security event processing stopped"),
            Err(e) => error!(error = %e, "Event consumer ended abnormally"),
        }
    }

    /// Whether the consumer task is alive.
    pub fn is_processing(&self) -> bool {
        self.processor
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn consume(self: Arc<Self>) {
        let mut receiver = self.receiver.lock().await;
        while let Some(event) = receiver.recv().await {
            let done = self.completion();
            let event_id = event.event_id().to_string();

            // A panicking module must not take the consumer down with it.
            let dispatched = tokio::spawn(async move {
                done.framework.dispatch(event).await;
                drop(done);
            })
            .await;
            if let Err(e) = dispatched {
                error!(event_id, error = %e, "Event dispatch aborted");
            }
        }
        warn!("Event queue closed, consumer exiting");
    }

    async fn dispatch(&self, event: SecurityEvent) {
        let responses = self.process_event(&event).await;
        if responses.iter().any(SecurityResponse::is_significant) {
            self.send_alert(&event, &responses).await;
        }
    }

    /// Fan an event out to every eligible module and collect their verdicts.
    ///
    /// Module failures and timeouts are logged and produce no response. BAN and
    /// LOCKDOWN verdicts are executed before the next module runs. The returned
    /// list includes ALLOW verdicts.
    #[instrument(
        skip(self, event),
        fields(event_id = event.event_id(), event_type = event.event_type(), guild_id = event.guild_id())
    )]
    pub async fn process_event(&self, event: &SecurityEvent) -> Vec<SecurityResponse> {
        let mut responses = Vec::new();
        {
            let mut modules = self.modules.lock().await;
            for module in modules.iter_mut() {
                if !module.state().should_process_event(event) {
                    trace!(module = module.name(), "Module skipped event");
                    continue;
                }

                let name = module.name().to_string();
                match self.evaluate(module.as_mut(), &name, event).await {
                    Ok(mut response) => {
                        let state = module.state_mut();
                        state.update_stats(&response);
                        state.add_to_history(event.clone());
                        self.publish_status(module.as_ref());

                        if response.action.is_critical() {
                            self.execute_response(event, &mut response).await;
                        }
                        responses.push(response);
                    }
                    Err(e) => {
                        error!(module = %name, error = %e, "Security module failed to process event");
                    }
                }
            }
        }

        let threats = responses.iter().filter(|r| r.is_significant()).count() as u64;
        self.stats.total_events.fetch_add(1, Ordering::Relaxed);
        self.stats.total_threats.fetch_add(threats, Ordering::Relaxed);
        debug!(responses = responses.len(), threats, "Event processed");
        responses
    }

    async fn evaluate(
        &self,
        module: &mut dyn SecurityModule,
        name: &str,
        event: &SecurityEvent,
    ) -> SecurityResult<SecurityResponse> {
        match self.config.module_timeout() {
            Some(limit) => tokio::time::timeout(limit, module.process_event(event))
                .await
                .map_err(|_| {
                    SecurityError::new(SecurityErrorKind::ModuleTimeout {
                        module: name.to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    })
                })?,
            None => module.process_event(event).await,
        }
    }

    /// Execute a response against the platform.
    ///
    /// Failures are logged and dropped. LOCKDOWN attaches its snapshot to the
    /// response as `metadata["lockdown_data"]`. Only executed remediations
    /// count towards `total_actions`.
    #[instrument(skip(self, event, response), fields(event_id = event.event_id(), action = %response.action))]
    pub async fn execute_response(
        &self,
        event: &SecurityEvent,
        response: &mut SecurityResponse,
    ) -> ActionOutcome {
        let outcome = match self.apply_action(event, response).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Failed to execute security action");
                ActionOutcome::Failed(e.to_string())
            }
        };

        match &outcome {
            ActionOutcome::Executed => {
                self.stats.total_actions.fetch_add(1, Ordering::Relaxed);
                info!("Security action executed");
            }
            ActionOutcome::Failed(_) => {
                self.stats.failed_actions.fetch_add(1, Ordering::Relaxed);
            }
            ActionOutcome::Skipped(reason) => debug!(reason = %reason, "Security action skipped"),
        }
        outcome
    }

    async fn apply_action(
        &self,
        event: &SecurityEvent,
        response: &mut SecurityResponse,
    ) -> PlatformResult<ActionOutcome> {
        let guild_id = event.guild_id();
        let reason = response.reason.clone();
        let no_member = || ActionOutcome::Skipped("event has no target member".to_string());

        let outcome = match response.action {
            SecurityAction::Timeout => {
                let Some(user_id) = event.user_id() else {
                    return Ok(no_member());
                };
                let duration = response.duration.unwrap_or(DEFAULT_TIMEOUT);
                self.platform
                    .timeout_member(guild_id, user_id, duration, &reason)
                    .await?;
                ActionOutcome::Executed
            }
            SecurityAction::Kick => {
                let Some(user_id) = event.user_id() else {
                    return Ok(no_member());
                };
                self.platform.kick_member(guild_id, user_id, &reason).await?;
                ActionOutcome::Executed
            }
            SecurityAction::Ban => {
                let Some(user_id) = event.user_id() else {
                    return Ok(no_member());
                };
                let delete_message_days = response
                    .metadata
                    .get("delete_message_days")
                    .and_then(Value::as_u64)
                    .unwrap_or(0)
                    .min(MAX_DELETE_MESSAGE_DAYS) as u8;
                self.platform
                    .ban_member(guild_id, user_id, delete_message_days, &reason)
                    .await?;
                ActionOutcome::Executed
            }
            SecurityAction::Delete => {
                let (Some(channel_id), Some(message_id)) =
                    (event.channel_id(), event.datum_u64("message_id"))
                else {
                    return Ok(ActionOutcome::Skipped(
                        "event has no channel or message id".to_string(),
                    ));
                };
                match self
                    .platform
                    .delete_message(channel_id, message_id, &reason)
                    .await
                {
                    Ok(()) => ActionOutcome::Executed,
                    Err(e) if e.is_not_found() => {
                        debug!(channel_id, message_id, "Message already gone");
                        ActionOutcome::Executed
                    }
                    Err(e) => return Err(e),
                }
            }
            SecurityAction::Lockdown => {
                let snapshot = self.lockdown.lock_guild(guild_id, &reason).await?;
                match serde_json::to_value(&snapshot) {
                    Ok(data) => {
                        response.metadata.insert("lockdown_data".to_string(), data);
                    }
                    Err(e) => warn!(error = %e, "Failed to serialize lockdown snapshot"),
                }
                ActionOutcome::Executed
            }
            SecurityAction::Allow | SecurityAction::Warn | SecurityAction::Quarantine => {
                ActionOutcome::Skipped(format!("{} has no platform action", response.action))
            }
        };
        Ok(outcome)
    }

    /// Notify every alert handler of the significant responses for an event.
    /// A failing handler does not stop the others.
    pub async fn send_alert(&self, event: &SecurityEvent, responses: &[SecurityResponse]) {
        let significant: Vec<SecurityResponse> = responses
            .iter()
            .filter(|r| r.is_significant())
            .cloned()
            .collect();
        if significant.is_empty() {
            return;
        }

        let handlers: Vec<Arc<dyn AlertHandler>> = self.alert_handlers.read().clone();
        for (index, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler.handle_alert(event, &significant).await {
                error!(handler = index, error = %e, "Alert handler failed");
            }
        }
    }

    /// Current counters.
    pub fn stats(&self) -> GlobalStats {
        self.stats.snapshot()
    }

    /// Status report including per-module statistics.
    ///
    /// Module statuses are the snapshots taken after each module's last
    /// verdict or reconfiguration, so a report never waits on an event that
    /// is still being fanned out.
    pub fn status(&self) -> FrameworkStatus {
        let statuses = self.statuses.read().clone();
        let stats = self.stats.snapshot();

        FrameworkStatus {
            modules_registered: statuses.len(),
            modules_active: stats.modules_active,
            processing_active: self.is_processing(),
            queue_size: self.queue_size(),
            stats,
            modules: statuses,
        }
    }
}

/// Marks one queued event as finished when dropped.
struct Completion {
    framework: Arc<SecurityFramework>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.framework.mark_done();
    }
}

//! Security event processing for Discord moderation.
//!
//! Producers describe what happened on a guild as [`SecurityEvent`]s and push
//! them onto a [`SecurityFramework`]. A single consumer task fans every event
//! out to the registered [`SecurityModule`]s, which each answer with a
//! [`SecurityResponse`] recommending a remediation.
//!
//! # Architecture
//!
//! 1. **Queue** - bounded FIFO fed by gateway handlers
//! 2. **Modules** - detectors evaluated in registration order, gated by
//!    enablement and whitelist
//! 3. **Execution** - BAN and LOCKDOWN verdicts are carried out immediately
//!    through a [`ModerationPlatform`]
//! 4. **Alerts** - every non-ALLOW verdict is handed to the [`AlertHandler`]s
//!
//! Platform calls never surface to producers: failures are logged and
//! counted in [`GlobalStats`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod alert;
mod config;
mod detectors;
mod error;
mod event;
mod framework;
mod lockdown;
mod module;
mod platform;
mod rate_limit;

pub use alert::{Alert, AlertHandler, ChannelAlertHandler, FnAlertHandler, LogAlertHandler};
pub use config::{FrameworkConfig, SecurityConfig};
pub use detectors::{RAID_DETECTOR, RaidDetector, SPAM_DETECTOR, SpamDetector};
pub use error::{SecurityError, SecurityErrorKind, SecurityResult};
pub use event::{
    SecurityAction, SecurityEvent, SecurityEventBuilder, SecurityEventBuilderError,
    SecurityResponse, Severity,
};
pub use framework::{ActionOutcome, DEFAULT_TIMEOUT, FrameworkStatus, GlobalStats, SecurityFramework};
pub use lockdown::{LockdownExecutor, LockdownSnapshot};
pub use module::{MAX_HISTORY, ModuleState, ModuleStats, ModuleStatus, SecurityModule};
pub use platform::{LockableChannel, ModerationPlatform, OverwriteState};
pub use rate_limit::{RateLimit, RateLimiter};

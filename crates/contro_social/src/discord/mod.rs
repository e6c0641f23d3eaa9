//! Discord integration built on Serenity.
//!
//! # Architecture
//!
//! ## Inbound
//! - **handler**: Serenity `EventHandler` queueing security events
//! - **conversions**: gateway payloads to [`SecurityEvent`](contro_security::SecurityEvent)s
//!   and permission overwrites to lockdown flags
//!
//! ## Outbound
//! - **platform**: [`ModerationPlatform`](contro_security::ModerationPlatform) over the REST API
//! - **alert**: moderation log embeds
//!
//! ## Lifecycle
//! - **client**: Serenity client setup
//! - **error**: Discord-specific error types

mod alert;
mod client;
mod conversions;
mod error;
mod handler;
mod platform;

pub use alert::{DiscordAlertHandler, alert_color, alert_description};
pub use client::ControBot;
pub use conversions::{
    apply_overwrite_state, member_join_event, message_event, overwrite_state_from,
};
pub use error::{DiscordError, DiscordErrorKind, DiscordResult};
pub use handler::SecurityHandler;
pub use platform::SerenityPlatform;

//! Discord integration for the Contro security framework.
//!
//! This crate connects [`contro_security`] to Discord through Serenity:
//! - `SerenityPlatform` executes remediations (timeouts, kicks, bans, message
//!   deletes, channel lockdowns) against the Discord REST API
//! - `SecurityHandler` turns gateway events into security events and queues them
//! - `DiscordAlertHandler` posts alerts to a moderation log channel
//! - `ControBot` wires the above into a Serenity client

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod discord;

pub use discord::{
    ControBot, DiscordAlertHandler, DiscordError, DiscordErrorKind, DiscordResult,
    SecurityHandler, SerenityPlatform, alert_color, alert_description,
    apply_overwrite_state, member_join_event, message_event, overwrite_state_from,
};

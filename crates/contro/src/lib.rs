//! Contro - Discord moderation on a pluggable security event framework
//!
//! Contro watches guild activity through the Discord gateway, routes every
//! message and join through a set of security modules, and carries out the
//! remediations they recommend.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use contro::{ControConfig, run_bot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ControConfig::load()?;
//!     run_bot(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Contro is organized as a workspace with focused crates:
//!
//! - `contro_error` - Error types
//! - `contro_security` - Event model, module trait, dispatcher, lockdown and detectors
//! - `contro_social` - Discord integration over Serenity
//!
//! This crate (`contro`) re-exports everything for convenience and adds
//! configuration loading, telemetry and the `contro` binary.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod config;
mod telemetry;

pub use app::{register_detectors, run_bot};
pub use config::{ControConfig, DiscordConfig};
pub use telemetry::init_tracing;

pub use contro_error::{
    ConfigError, ControError, ControErrorKind, ControResult, PlatformError, PlatformErrorKind,
    PlatformResult,
};
pub use contro_security::*;
pub use contro_social::{
    ControBot, DiscordAlertHandler, DiscordError, DiscordErrorKind, DiscordResult,
    SecurityHandler, SerenityPlatform,
};

//! Error types for the Contro moderation bot.
//!
//! This crate provides the foundation error types shared by every Contro crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use contro_error::{ConfigError, ControResult};
//!
//! fn load() -> ControResult<String> {
//!     Err(ConfigError::new("Missing [framework] section"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod platform;

pub use config::ConfigError;
pub use error::{ControError, ControErrorKind, ControResult};
pub use platform::{PlatformError, PlatformErrorKind, PlatformResult};

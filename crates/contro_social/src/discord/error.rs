//! Discord-specific error types.
//!
//! This module provides error handling for the Discord integration, including
//! Serenity API errors, connection issues, and the mapping of REST failures
//! onto [`PlatformError`]s.

use contro_error::{PlatformError, PlatformErrorKind};
use derive_getters::Getters;

/// Discord error variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum DiscordErrorKind {
    /// Serenity API error (e.g., HTTP error, gateway error, rate limit).
    #[display("Serenity API error: {_0}")]
    SerenityError(String),

    /// Connection to Discord gateway failed.
    #[display("Connection failed: {_0}")]
    ConnectionFailed(String),

    /// Bot token is missing or empty.
    #[display("Invalid or missing bot token")]
    InvalidToken,

    /// Message failed to send.
    #[display("Message send failed: {_0}")]
    MessageSendFailed(String),

    /// A timestamp could not be represented on Discord.
    #[display("Invalid timestamp: {_0}")]
    InvalidTimestamp(String),
}

/// Discord error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Discord Error: {} at line {} in {}", kind, line, file)]
pub struct DiscordError {
    kind: DiscordErrorKind,
    line: u32,
    file: &'static str,
}

impl DiscordError {
    /// Create a new DiscordError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use contro_social::{DiscordError, DiscordErrorKind};
    ///
    /// let err = DiscordError::new(DiscordErrorKind::InvalidToken);
    /// assert_eq!(err.kind(), &DiscordErrorKind::InvalidToken);
    /// ```
    #[track_caller]
    pub fn new(kind: DiscordErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for Discord operations.
pub type DiscordResult<T> = Result<T, DiscordError>;

impl From<serenity::Error> for DiscordError {
    #[track_caller]
    fn from(err: serenity::Error) -> Self {
        DiscordError::new(DiscordErrorKind::SerenityError(err.to_string()))
    }
}

impl From<DiscordError> for PlatformError {
    #[track_caller]
    fn from(err: DiscordError) -> Self {
        PlatformError::new(PlatformErrorKind::Api(err.kind.to_string()))
    }
}

/// HTTP status of a failed REST call, if the failure came from Discord.
fn status_code(err: &serenity::Error) -> Option<u16> {
    match err {
        serenity::Error::Http(http) => http.status_code().map(|code| code.as_u16()),
        _ => None,
    }
}

/// Map a Serenity failure onto a platform error.
///
/// 404 becomes the caller's not-found kind, 403 becomes
/// [`PlatformErrorKind::MissingPermissions`], everything else is an API error.
#[track_caller]
pub(crate) fn platform_error(
    err: serenity::Error,
    not_found: impl FnOnce() -> PlatformErrorKind,
) -> PlatformError {
    let kind = match status_code(&err) {
        Some(404) => not_found(),
        Some(403) => PlatformErrorKind::MissingPermissions(err.to_string()),
        _ => PlatformErrorKind::Api(err.to_string()),
    };
    PlatformError::new(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_http_errors_are_api_errors() {
        let err = platform_error(serenity::Error::Other("boom"), || {
            PlatformErrorKind::GuildNotFound(1)
        });
        assert!(!err.is_not_found());
        assert!(matches!(err.kind(), PlatformErrorKind::Api(_)));
    }

    #[test]
    fn test_discord_error_converts_to_platform_error() {
        let err: PlatformError = DiscordError::new(DiscordErrorKind::InvalidToken).into();
        assert_eq!(
            err.kind(),
            &PlatformErrorKind::Api("Invalid or missing bot token".to_string())
        );
    }
}

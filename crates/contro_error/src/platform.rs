//! Errors raised by the chat platform while resolving entities or applying
//! moderation actions.

/// Platform failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PlatformErrorKind {
    /// Guild could not be resolved.
    #[display("Guild not found: {}", _0)]
    GuildNotFound(u64),

    /// Member is not part of the guild.
    #[display("Member {} not found in guild {}", user_id, guild_id)]
    MemberNotFound {
        /// Guild that was searched
        guild_id: u64,
        /// Member that was missing
        user_id: u64,
    },

    /// Channel could not be resolved.
    #[display("Channel not found: {}", _0)]
    ChannelNotFound(u64),

    /// Message no longer exists.
    #[display("Message {} not found in channel {}", message_id, channel_id)]
    MessageNotFound {
        /// Channel that held the message
        channel_id: u64,
        /// Missing message
        message_id: u64,
    },

    /// The bot lacks the permission required for the call.
    #[display("Missing permissions: {}", _0)]
    MissingPermissions(String),

    /// Any other API failure.
    #[display("Platform API error: {}", _0)]
    Api(String),
}

/// Platform error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Platform Error: {} at line {} in {}", kind, line, file)]
pub struct PlatformError {
    /// The specific error kind
    pub kind: PlatformErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl PlatformError {
    /// Create a new platform error with location tracking.
    #[track_caller]
    pub fn new(kind: PlatformErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &PlatformErrorKind {
        &self.kind
    }

    /// Whether the target entity no longer exists.
    ///
    /// ```
    /// use contro_error::{PlatformError, PlatformErrorKind};
    ///
    /// let gone = PlatformError::new(PlatformErrorKind::MessageNotFound {
    ///     channel_id: 1,
    ///     message_id: 2,
    /// });
    /// assert!(gone.is_not_found());
    /// ```
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            PlatformErrorKind::GuildNotFound(_)
                | PlatformErrorKind::MemberNotFound { .. }
                | PlatformErrorKind::ChannelNotFound(_)
                | PlatformErrorKind::MessageNotFound { .. }
        )
    }
}

/// Result type for platform calls.
pub type PlatformResult<T> = Result<T, PlatformError>;

//! Security error types.

use contro_error::PlatformError;

/// Specific security error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum SecurityErrorKind {
    /// A module failed while evaluating an event
    #[display("Module '{}' failed: {}", module, reason)]
    ModuleFailed {
        /// Module that failed
        module: String,
        /// Reason for failure
        reason: String,
    },

    /// A module did not answer within the configured timeout
    #[display("Module '{}' timed out after {}ms", module, timeout_ms)]
    ModuleTimeout {
        /// Module that timed out
        module: String,
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// Settings supplied to `configure` were rejected
    #[display("Invalid settings for '{}': {}", module, reason)]
    InvalidSettings {
        /// Module being configured
        module: String,
        /// Reason for rejection
        reason: String,
    },

    /// Configuration error
    #[display("Configuration error: {}", _0)]
    Configuration(String),

    /// The event queue no longer accepts events
    #[display("Event queue closed")]
    QueueClosed,

    /// Platform call failed
    #[display("{}", _0)]
    Platform(String),
}

/// Security error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Security Error: {} at line {} in {}", kind, line, file)]
pub struct SecurityError {
    /// The specific error kind
    pub kind: SecurityErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl SecurityError {
    /// Create a new security error with location tracking.
    #[track_caller]
    pub fn new(kind: SecurityErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SecurityErrorKind {
        &self.kind
    }
}

impl From<PlatformError> for SecurityError {
    #[track_caller]
    fn from(err: PlatformError) -> Self {
        SecurityError::new(SecurityErrorKind::Platform(err.to_string()))
    }
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

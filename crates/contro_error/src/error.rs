//! Top-level error wrapper types.

use crate::{ConfigError, PlatformError};

/// Union of the foundation error types.
///
/// # Examples
///
/// ```
/// use contro_error::{ControError, ConfigError};
///
/// let err: ControError = ConfigError::new("bad token").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ControErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Platform error
    #[from(PlatformError)]
    Platform(PlatformError),
}

/// Contro error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Contro Error: {}", _0)]
pub struct ControError(Box<ControErrorKind>);

impl ControError {
    /// Create a new error from a kind.
    pub fn new(kind: ControErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ControErrorKind {
        &self.0
    }
}

impl<T> From<T> for ControError
where
    T: Into<ControErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Contro operations.
pub type ControResult<T> = std::result::Result<T, ControError>;

//! Configuration error types.

/// Configuration error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use contro_error::ConfigError;
    ///
    /// let err = ConfigError::new("Failed to parse configuration: expected a table");
    /// assert!(err.message.starts_with("Failed to parse"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// A `[modules.<name>]` table names no known security module.
    ///
    /// ```
    /// use contro_error::ConfigError;
    ///
    /// let err = ConfigError::unknown_module("link-scanner");
    /// assert_eq!(err.message, "Unknown security module 'link-scanner'");
    /// ```
    #[track_caller]
    pub fn unknown_module(name: &str) -> Self {
        Self::new(format!("Unknown security module '{}'", name))
    }

    /// A setting holds a value the framework cannot run with.
    ///
    /// ```
    /// use contro_error::ConfigError;
    ///
    /// let err = ConfigError::invalid_setting("framework.queue_capacity", "must be positive");
    /// assert_eq!(err.message, "framework.queue_capacity must be positive");
    /// ```
    #[track_caller]
    pub fn invalid_setting(key: &str, problem: impl std::fmt::Display) -> Self {
        Self::new(format!("{} {}", key, problem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_record_caller_location() {
        let err = ConfigError::unknown_module("spam");
        assert!(err.file.ends_with("config.rs"));
        assert_eq!(err.line, line!() - 2);
    }

    #[test]
    fn test_invalid_setting_display() {
        let err = ConfigError::invalid_setting("modules.spam.sensitivity", "must be at most 1");
        assert!(
            err.to_string()
                .starts_with("Configuration Error: modules.spam.sensitivity must be at most 1 at line")
        );
    }
}

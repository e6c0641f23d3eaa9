//! Layered configuration for the bot.
//!
//! The configuration system supports:
//! - Bundled defaults (include_str! from contro.toml)
//! - User overrides (~/.config/contro/contro.toml, then ./contro.toml)
//! - Environment overrides (`CONTRO__FRAMEWORK__QUEUE_CAPACITY=500`)

use config::{Config, Environment, File, FileFormat};
use contro_error::{ConfigError, ControResult};
use contro_security::{FrameworkConfig, SecurityConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../contro.toml");

/// Discord connection settings.
///
/// ```toml
/// [discord]
/// token_env = "DISCORD_TOKEN"
/// alert_channel_id = 123456789012345678
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Environment variable holding the bot token
    pub token_env: String,
    /// Channel receiving alert embeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_channel_id: Option<u64>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token_env: "DISCORD_TOKEN".to_string(),
            alert_channel_id: None,
        }
    }
}

impl DiscordConfig {
    /// Read the bot token from the configured environment variable.
    #[track_caller]
    pub fn token(&self) -> ControResult<String> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ConfigError::new(format!(
                "Environment variable {} is not set",
                self.token_env
            ))
            .into()),
        }
    }
}

/// Complete bot configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControConfig {
    /// Discord connection settings
    pub discord: DiscordConfig,
    /// Dispatcher settings
    pub framework: FrameworkConfig,
    /// Per-module settings keyed by module name
    pub modules: BTreeMap<String, SecurityConfig>,
}

impl ControConfig {
    /// Load configuration from a single file.
    ///
    /// Sections missing from the file take their built-in defaults, not the
    /// bundled `contro.toml`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> ControResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// ```no_run
    /// use contro::ControConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ControConfig::load()?;
    /// println!("queue capacity: {}", config.framework.queue_capacity);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> ControResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/contro/contro.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("contro").required(false))
            .add_source(
                Environment::with_prefix("CONTRO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// The bundled defaults alone, ignoring user files and the environment.
    pub fn bundled() -> ControResult<Self> {
        let config: Self = toml::from_str(DEFAULT_CONFIG)
            .map_err(|e| ConfigError::new(format!("Invalid bundled configuration: {}", e)))?;
        Ok(config)
    }

    /// Reject values the framework cannot run with.
    pub fn validate(&self) -> ControResult<()> {
        if self.framework.queue_capacity == 0 {
            return Err(
                ConfigError::invalid_setting("framework.queue_capacity", "must be positive").into(),
            );
        }
        for (name, module) in &self.modules {
            if !(0.0..=1.0).contains(&module.sensitivity) {
                return Err(ConfigError::invalid_setting(
                    &format!("modules.{}.sensitivity", name),
                    format!("must be between 0 and 1, got {}", module.sensitivity),
                )
                .into());
            }
        }
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> ControResult<String> {
        let rendered = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to render configuration: {}", e)))?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults_parse() {
        let config = ControConfig::bundled().unwrap();
        assert_eq!(config.framework, FrameworkConfig::default());
        assert_eq!(config.discord.token_env, "DISCORD_TOKEN");
        assert!(config.modules.contains_key("spam-detector"));
        assert!(config.modules.contains_key("raid-detector"));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = ControConfig::default();
        config.framework.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let discord = DiscordConfig {
            token_env: "CONTRO_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            alert_channel_id: None,
        };
        let err = discord.token().unwrap_err();
        assert!(err.to_string().contains("CONTRO_TEST_TOKEN_THAT_IS_NEVER_SET"));
    }
}

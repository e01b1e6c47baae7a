//! Configuration Module
//!
//! Provides TOML-based configuration for mqcore with support for:
//! - Logging
//! - Topics and sessions provider selection
//! - Persistence of retained messages and sessions
//! - Environment variable overrides (MQCORE__* prefix)

use std::path::Path;

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;

use crate::protocol::QosPolicy;
use crate::registry::{FJALL, MEM};

pub use persistence::PersistenceConfig;

mod persistence;

/// Substitute environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}` syntax.
fn substitute_env_vars(content: &str) -> String {
    let Ok(re) = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}") else {
        return content.to_string();
    };
    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}


/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// Config crate error
    Config(config::ConfigError),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Config(e) => write!(f, "Config error: {}", e),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Config(e)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,
    /// Topics provider selection
    pub topics: TopicsConfig,
    /// Sessions provider selection
    pub sessions: SessionsConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_provider() -> String {
    MEM.to_string()
}

/// Topics provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    /// Registered provider name ("mem" or "fjall")
    #[serde(default = "default_provider")]
    pub provider: String,
    /// QoS handed to matched subscribers: "publisher" or "downgrade"
    pub qos_policy: QosPolicy,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            qos_policy: QosPolicy::default(),
        }
    }
}

/// Sessions provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Registered provider name ("mem" or "fjall")
    #[serde(default = "default_provider")]
    pub provider: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// Supports two forms of environment variable usage:
    /// 1. In-file substitution: `${VAR}` or `${VAR:-default}` syntax in the TOML file
    /// 2. Override via env vars: `MQCORE__` prefix with double underscores for nesting:
    ///    - `MQCORE__TOPICS__PROVIDER=fjall` overrides `topics.provider`
    ///    - `MQCORE__PERSISTENCE__ENABLED=true` overrides `persistence.enabled`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            // Start with defaults
            .set_default("log.level", "info")?
            .set_default("topics.provider", MEM)?
            .set_default("topics.qos_policy", "publisher")?
            .set_default("sessions.provider", MEM)?
            .set_default("persistence.enabled", false)?
            .set_default("persistence.path", "./data")?
            .set_default("persistence.flush_interval", "100ms")?
            .set_default("persistence.max_batch_size", 100)?;

        // Load from file with env var substitution
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let substituted = substitute_env_vars(&content);
                builder = builder.add_source(File::from_str(&substituted, FileFormat::Toml));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File doesn't exist, use defaults
            }
            Err(e) => return Err(ConfigError::Io(e)),
        }

        // Double underscore separates nested keys, single underscore preserved in field names
        let cfg = builder
            .add_source(
                Environment::with_prefix("MQCORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides only (no file).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new(""))
    }

    /// Parse configuration from a string (for testing, no env var support)
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, provider) in [
            ("topics", &self.topics.provider),
            ("sessions", &self.sessions.provider),
        ] {
            if provider.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{}.provider must not be empty",
                    section
                )));
            }
            if provider == FJALL && !self.persistence.enabled {
                return Err(ConfigError::Validation(format!(
                    "{}.provider = \"{}\" requires persistence.enabled = true",
                    section, FJALL
                )));
            }
        }

        if self.persistence.flush_interval.is_zero() {
            return Err(ConfigError::Validation(
                "persistence.flush_interval must be greater than 0".to_string(),
            ));
        }

        if self.persistence.max_batch_size == 0 {
            return Err(ConfigError::Validation(
                "persistence.max_batch_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

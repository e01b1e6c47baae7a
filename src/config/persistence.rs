//! Persistence configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

fn default_flush_interval() -> Duration {
    Duration::from_millis(100)
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Enable persistence; required by the "fjall" providers
    pub enabled: bool,

    /// Data directory path
    pub path: PathBuf,

    /// Flush interval (e.g., "100ms", "1s")
    #[serde(default = "default_flush_interval", with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Maximum batch size before forced flush
    pub max_batch_size: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("./data"),
            flush_interval: default_flush_interval(),
            max_batch_size: 100,
        }
    }
}

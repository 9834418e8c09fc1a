//! Watch target configuration
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! buffer_size = 4096
//! batch_capacity = 256
//! thread_name = "dirwatch"
//! ```

use crate::error::{Error, Result};
use dirwatch_core::translate::DEFAULT_BATCH_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest notification buffer accepted
///
/// Large enough for one inotify record carrying a `NAME_MAX` name.
pub const MIN_BUFFER_SIZE: usize = 512;

/// Per-target settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Bytes read per blocking notification call (default: 4096)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Maximum events materialized per notification batch (default: 256)
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,

    /// Worker thread name prefix (default: "dirwatch")
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl WatchConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: WatchConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(Error::InvalidConfig(format!(
                "buffer_size must be at least {} bytes, got {}",
                MIN_BUFFER_SIZE, self.buffer_size
            )));
        }
        if self.batch_capacity == 0 {
            return Err(Error::InvalidConfig(
                "batch_capacity must be at least 1".to_string(),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(Error::InvalidConfig("thread_name must not be empty".to_string()));
        }
        if self.thread_name.contains('\0') {
            return Err(Error::InvalidConfig(
                "thread_name must not contain NUL bytes".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            batch_capacity: default_batch_capacity(),
            thread_name: default_thread_name(),
        }
    }
}

fn default_buffer_size() -> usize {
    4096
}

fn default_batch_capacity() -> usize {
    DEFAULT_BATCH_CAPACITY
}

fn default_thread_name() -> String {
    "dirwatch".to_string()
}

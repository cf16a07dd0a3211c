//! Store configuration
//!
//! Settings are plain TOML. The store root itself holds no configuration:
//! the shard count is rediscovered from disk on every open, so `shards` only
//! matters when a store is created.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of shard directories for a new store.
pub const DEFAULT_SHARDS: u32 = 16;

/// When index mutations reach durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityMode {
    /// Every mutation flushes the touched tags before returning.
    #[default]
    Always,
    /// Mutations stay in memory until `persist()`, `close()`, or drop.
    /// A crash loses tag associations made since the last flush.
    Deferred,
}

/// What `create` does with a filename the store already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecreatePolicy {
    /// Drop the old file's index entries and delete its slot.
    #[default]
    Replace,
    /// Fail with `AlreadyExists`.
    Reject,
}

/// Store configuration.
///
/// # Example
///
/// ```toml
/// shards = 16
/// durability = "always"   # or "deferred"
/// on_recreate = "replace" # or "reject"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of shard directories created by `TagStore::create_at`.
    #[serde(default = "default_shards")]
    pub shards: u32,
    /// Index durability policy.
    #[serde(default)]
    pub durability: DurabilityMode,
    /// Re-creation policy for an existing filename.
    #[serde(default)]
    pub on_recreate: RecreatePolicy,
}

fn default_shards() -> u32 {
    DEFAULT_SHARDS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            durability: DurabilityMode::default(),
            on_recreate: RecreatePolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Set the shard count
    pub fn with_shards(mut self, shards: u32) -> Self {
        self.shards = shards;
        self
    }

    /// Set the durability mode
    pub fn with_durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    /// Set the re-creation policy
    pub fn with_recreate_policy(mut self, policy: RecreatePolicy) -> Self {
        self.on_recreate = policy;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shards == 0 {
            return Err(ConfigError::InvalidShards(self.shards));
        }
        Ok(())
    }

    /// Parse config from a TOML string and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Shard count out of range
    #[error("Invalid shard count {0}: must be at least 1")]
    InvalidShards(u32),

    /// TOML could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    /// Config file could not be read
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file could not be written
    #[error("Failed to write config file '{}': {source}", path.display())]
    Write {
        /// File that was written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl From<ConfigError> for tagstore_core::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Read { source, .. } | ConfigError::Write { source, .. } => {
                tagstore_core::Error::Io(source)
            }
            other => tagstore_core::Error::invalid_argument(other.to_string()),
        }
    }
}

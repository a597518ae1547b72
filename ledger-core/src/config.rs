//! Configuration for the points ledger

use crate::allocation::AllocationPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// HTTP listen address
    pub listen_addr: String,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Allocation configuration
    pub allocation: AllocationConfig,

    /// Actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/points"),
            service_name: "points-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            storage: StorageConfig::default(),
            allocation: AllocationConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Which store backs the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable RocksDB store under `data_dir`
    Rocksdb,
    /// Volatile in-process store
    Memory,
}

impl StorageBackend {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rocksdb" => Some(StorageBackend::Rocksdb),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection
    pub backend: StorageBackend,

    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Rocksdb,
            write_buffer_size_mb: 64,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Allocation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// How the spend walk treats entries with non-positive points
    pub policy: AllocationPolicy,
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables on top of defaults
    pub fn from_env() -> crate::Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `POINTS_*` environment overrides
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(data_dir) = std::env::var("POINTS_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(addr) = std::env::var("POINTS_LISTEN_ADDR") {
            self.listen_addr = addr;
        }

        if let Ok(backend) = std::env::var("POINTS_STORAGE_BACKEND") {
            self.storage.backend = StorageBackend::parse(&backend).ok_or_else(|| {
                crate::Error::Config(format!("Unknown storage backend: {}", backend))
            })?;
        }

        if let Ok(policy) = std::env::var("POINTS_ALLOCATION_POLICY") {
            self.allocation.policy = AllocationPolicy::parse(&policy).ok_or_else(|| {
                crate::Error::Config(format!("Unknown allocation policy: {}", policy))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> crate::Result<()> {
        if self.listen_addr.is_empty() {
            return Err(crate::Error::Config("listen_addr cannot be empty".to_string()));
        }

        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "actor.mailbox_capacity must be at least 1".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Rocksdb
            && self.data_dir.as_os_str().is_empty()
        {
            return Err(crate::Error::Config(
                "data_dir is required for the rocksdb backend".to_string(),
            ));
        }

        Ok(())
    }
}

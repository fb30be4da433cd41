//! Runtime configuration for the catalog client and the reconciler

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How the catalog may be used
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Catalog is neither read nor written
    Off,
    /// Lookups only; uploads are dropped
    Read,
    /// Lookups and uploads (default)
    #[default]
    ReadWrite,
    /// Uploads only; every lookup misses
    Write,
}

impl From<String> for CacheMode {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "off" => CacheMode::Off,
            "read" => CacheMode::Read,
            "read-write" => CacheMode::ReadWrite,
            "write" => CacheMode::Write,
            _ => {
                tracing::warn!(
                    value = %value,
                    "Unknown catalog mode, falling back to read-write"
                );
                CacheMode::ReadWrite
            }
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode_str = match self {
            CacheMode::Off => "off",
            CacheMode::Read => "read",
            CacheMode::ReadWrite => "read-write",
            CacheMode::Write => "write",
        };
        write!(f, "{mode_str}")
    }
}

impl CacheMode {
    /// Check if the catalog can be read from
    pub fn is_readable(&self) -> bool {
        matches!(self, CacheMode::Read | CacheMode::ReadWrite)
    }

    /// Check if the catalog can be written to
    pub fn is_writable(&self) -> bool {
        matches!(self, CacheMode::Write | CacheMode::ReadWrite)
    }
}

/// Catalog client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Master switch; when false the mode is treated as `Off`
    pub enabled: bool,
    pub mode: CacheMode,
    /// Background tasks processing submitted batches
    pub worker_count: usize,
    /// Batches that may wait for a worker before submission fails
    pub queue_capacity: usize,
    /// How long a finished batch stays tracked if its submitter never comes back
    pub ready_retention_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: CacheMode::ReadWrite,
            worker_count: 4,
            queue_capacity: 256,
            ready_retention_ms: 60_000,
        }
    }
}

impl CatalogConfig {
    /// Mode after applying the `enabled` switch
    pub fn effective_mode(&self) -> CacheMode {
        if self.enabled {
            self.mode
        } else {
            CacheMode::Off
        }
    }

    pub fn ready_retention(&self) -> Duration {
        Duration::from_millis(self.ready_retention_ms)
    }
}

/// Reconciliation loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Delay between passes when no wake-up arrives
    pub interval_ms: u64,
    /// Consecutive retryable failures tolerated before giving up
    pub max_attempts: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_attempts: 5,
        }
    }
}

impl ReconcileConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Data store settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the filesystem store; `None` selects an in-memory store
    pub root: Option<PathBuf>,
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    ConfigFile(PathBuf),
    EnvironmentVariable(String),
}

/// Complete arraymemo configuration
#[derive(Debug, Clone)]
pub struct ArrayMemoConfig {
    pub catalog: CatalogConfig,
    pub reconcile: ReconcileConfig,
    pub store: StoreConfig,
    /// Most specific layer that contributed to this configuration
    pub source: ConfigSource,
}

impl Default for ArrayMemoConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            reconcile: ReconcileConfig::default(),
            store: StoreConfig::default(),
            source: ConfigSource::Default,
        }
    }
}

//! Configuration loading with precedence: defaults, then the config file, then
//! environment variables.

use crate::config::{ArrayMemoConfig, CacheMode, ConfigSource};
use arraymemo_core::{Error, Result};
use std::path::{Path, PathBuf};

pub const CATALOG_MODE_VAR: &str = "ARRAYMEMO_CATALOG";
pub const CATALOG_ENABLED_VAR: &str = "ARRAYMEMO_CATALOG_ENABLED";
pub const WORKERS_VAR: &str = "ARRAYMEMO_WORKERS";
pub const RECONCILE_INTERVAL_VAR: &str = "ARRAYMEMO_RECONCILE_INTERVAL_MS";
pub const MAX_ATTEMPTS_VAR: &str = "ARRAYMEMO_MAX_ATTEMPTS";
pub const STORE_ROOT_VAR: &str = "ARRAYMEMO_STORE_ROOT";

/// Configuration loader that handles precedence
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the default config file location and the environment
    pub fn load() -> Result<ArrayMemoConfig> {
        let path = Self::get_config_file_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from `path` (if it exists) and the environment
    pub fn load_from(path: &Path) -> Result<ArrayMemoConfig> {
        let mut config = ArrayMemoConfig::default();

        if path.exists() {
            Self::apply_config_file(&mut config, path)?;
            config.source = ConfigSource::ConfigFile(path.to_path_buf());
        }

        if Self::apply_env(&mut config)? {
            config.source = ConfigSource::EnvironmentVariable("ARRAYMEMO_*".to_string());
        }

        tracing::debug!(source = ?config.source, "Loaded configuration");
        Ok(config)
    }

    fn apply_config_file(config: &mut ArrayMemoConfig, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read config file", e))?;

        let file_config: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid config file '{}': {e}", path.display()))
        })?;

        if let Some(catalog) = file_config.get("catalog").and_then(|v| v.as_object()) {
            if let Some(enabled) = catalog.get("enabled").and_then(|v| v.as_bool()) {
                config.catalog.enabled = enabled;
            }
            if let Some(mode) = catalog.get("mode").and_then(|v| v.as_str()) {
                config.catalog.mode = CacheMode::from(mode.to_string());
            }
            if let Some(workers) = catalog.get("worker_count").and_then(|v| v.as_u64()) {
                config.catalog.worker_count = workers as usize;
            }
            if let Some(capacity) = catalog.get("queue_capacity").and_then(|v| v.as_u64()) {
                config.catalog.queue_capacity = capacity as usize;
            }
            if let Some(retention) = catalog.get("ready_retention_ms").and_then(|v| v.as_u64()) {
                config.catalog.ready_retention_ms = retention;
            }
        }

        if let Some(reconcile) = file_config.get("reconcile").and_then(|v| v.as_object()) {
            if let Some(interval) = reconcile.get("interval_ms").and_then(|v| v.as_u64()) {
                config.reconcile.interval_ms = interval;
            }
            if let Some(attempts) = reconcile.get("max_attempts").and_then(|v| v.as_u64()) {
                config.reconcile.max_attempts = u32::try_from(attempts).map_err(|_| {
                    Error::configuration(format!("max_attempts {attempts} is out of range"))
                })?;
            }
        }

        if let Some(root) = file_config
            .get("store")
            .and_then(|v| v.get("root"))
            .and_then(|v| v.as_str())
        {
            config.store.root = Some(PathBuf::from(root));
        }

        Self::validate(config)
    }

    /// Returns whether any environment variable was applied
    fn apply_env(config: &mut ArrayMemoConfig) -> Result<bool> {
        let mut has_env_config = false;

        if let Ok(mode) = std::env::var(CATALOG_MODE_VAR) {
            config.catalog.mode = CacheMode::from(mode);
            has_env_config = true;
        }

        // Takes precedence over the mode
        if let Ok(enabled) = std::env::var(CATALOG_ENABLED_VAR) {
            config.catalog.enabled = enabled.to_lowercase() == "true";
            has_env_config = true;
        }

        if let Ok(workers) = std::env::var(WORKERS_VAR) {
            config.catalog.worker_count = parse_var(WORKERS_VAR, &workers)?;
            has_env_config = true;
        }

        if let Ok(interval) = std::env::var(RECONCILE_INTERVAL_VAR) {
            config.reconcile.interval_ms = parse_var(RECONCILE_INTERVAL_VAR, &interval)?;
            has_env_config = true;
        }

        if let Ok(attempts) = std::env::var(MAX_ATTEMPTS_VAR) {
            config.reconcile.max_attempts = parse_var(MAX_ATTEMPTS_VAR, &attempts)?;
            has_env_config = true;
        }

        if let Ok(root) = std::env::var(STORE_ROOT_VAR) {
            config.store.root = Some(PathBuf::from(root));
            has_env_config = true;
        }

        Self::validate(config)?;
        Ok(has_env_config)
    }

    fn validate(config: &ArrayMemoConfig) -> Result<()> {
        if config.catalog.worker_count == 0 {
            return Err(Error::configuration("catalog worker_count must be at least 1"));
        }
        if config.catalog.queue_capacity == 0 {
            return Err(Error::configuration("catalog queue_capacity must be at least 1"));
        }
        if config.reconcile.max_attempts == 0 {
            return Err(Error::configuration("reconcile max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// Get the configuration file path
    pub fn get_config_file_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config_home)
        } else {
            dirs::config_dir().ok_or_else(|| {
                Error::configuration(
                    "Could not determine config directory; set XDG_CONFIG_HOME or HOME",
                )
            })?
        };

        Ok(config_dir.join("arraymemo").join("config.json"))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::configuration(format!("invalid value '{value}' for {name}")))
}

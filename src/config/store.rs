//! Application configuration loaded from `config.toml`.
//!
//! Every field has a default, so a missing file or a partial `[store]` table
//! is fine. `DATABASE_URL` in the environment overrides the configured URL,
//! and `LOYOLA_CONFIG` points at an alternative config file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Which storage backend the binary opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `SQLite` through `SeaORM`
    #[default]
    Database,
    /// Process-local map, lost on exit
    Memory,
}

/// Whole config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Record store settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// The `[store]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage backend
    pub backend: Backend,
    /// Database URL for the database backend; falls back to `DATABASE_URL`
    pub database_url: Option<String>,
    /// Prefix of every storage key (`<prefix>_clientes`, ...)
    pub key_prefix: String,
    /// Maximum number of activity log entries kept
    pub activity_limit: usize,
    /// Seed demo records into an empty store
    pub seed_demo_data: bool,
    /// Seed file replacing the built-in demo data
    pub seed_path: Option<PathBuf>,
    /// Seconds between uptime metric refreshes; 0 disables the monitor
    pub uptime_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            database_url: None,
            key_prefix: "loyola".to_string(),
            activity_limit: 100,
            seed_demo_data: true,
            seed_path: None,
            uptime_interval_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Interval of the uptime monitor, `None` when disabled.
    #[must_use]
    pub const fn uptime_interval(&self) -> Option<Duration> {
        if self.uptime_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.uptime_interval_secs))
        }
    }

    /// Effective database URL: configured value, then `DATABASE_URL`, then the default.
    #[must_use]
    pub fn resolved_database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(super::database::get_database_url)
    }

    fn validate(&self) -> Result<()> {
        if self.key_prefix.trim().is_empty() {
            return Err(Error::Config {
                message: "store.key_prefix cannot be empty".to_string(),
            });
        }
        if self.activity_limit == 0 {
            return Err(Error::Config {
                message: "store.activity_limit must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads and validates the configuration file at `path`.
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid or a field has the wrong type
/// - A value is out of range (empty key prefix, zero activity limit)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Parses and validates configuration TOML.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config TOML: {e}"),
    })?;
    config.store.validate()?;
    Ok(config)
}

/// Loads the configuration the binary runs with.
///
/// Reads `LOYOLA_CONFIG` (default `config.toml`); a missing file yields the
/// defaults. Call after `.env` has been loaded so overrides are visible.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("LOYOLA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        info!("No config file at {}, using defaults.", path);
        AppConfig::default()
    };
    info!(
        "Store configured: backend={:?}, prefix={}, activity_limit={}",
        config.store.backend, config.store.key_prefix, config.store.activity_limit
    );
    Ok(config)
}

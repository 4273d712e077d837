//! Catalog configuration via `catalog.toml`
//!
//! A default `catalog.toml` is written on first start; edit the file and
//! restart to change settings. Every field is optional and falls back to its
//! default.

use catalog_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "catalog.toml";

/// Backend connection check settings
///
/// The availability check pings the backend up to `max_attempts` times,
/// waiting `base_delay_ms * 2^n` (capped at `max_delay_ms`) after the n-th
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Number of failed pings before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failure in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    5_000
}

fn default_max_delay_ms() -> u64 {
    20_000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ConnectionConfig {
    /// Delay after the given number of failures so far (0-based)
    pub fn delay_after(&self, failures: u32) -> Duration {
        // Cap the shift to prevent overflow (1 << 63 is the max for u64)
        let shift = failures.min(63);
        let multiplier = 1u64 << shift;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

/// Catalog configuration loaded from `catalog.toml`.
///
/// # Example
///
/// ```toml
/// document_index = "steckbrief"
/// changeset_index = "changeset"
/// page_size = 100
/// snapshot_keep_alive_ms = 60000
///
/// [connection]
/// max_attempts = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Index holding current document states
    #[serde(default = "default_document_index")]
    pub document_index: String,
    /// Index holding changesets
    #[serde(default = "default_changeset_index")]
    pub changeset_index: String,
    /// Records per page when draining result sets
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Snapshot time-to-live, refreshed by every page request
    #[serde(default = "default_snapshot_keep_alive_ms")]
    pub snapshot_keep_alive_ms: u64,
    /// Connection check settings
    #[serde(default)]
    pub connection: ConnectionConfig,
}

fn default_document_index() -> String {
    "steckbrief".to_string()
}

fn default_changeset_index() -> String {
    "changeset".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_snapshot_keep_alive_ms() -> u64 {
    60_000
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            document_index: default_document_index(),
            changeset_index: default_changeset_index(),
            page_size: default_page_size(),
            snapshot_keep_alive_ms: default_snapshot_keep_alive_ms(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl CatalogConfig {
    /// Snapshot time-to-live
    pub fn snapshot_keep_alive(&self) -> Duration {
        Duration::from_millis(self.snapshot_keep_alive_ms)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for blank or identical index names and for a
    /// zero page size, keep-alive or attempt count.
    pub fn validate(&self) -> Result<()> {
        if self.document_index.trim().is_empty() || self.changeset_index.trim().is_empty() {
            return Err(Error::Config("index names must not be empty".to_string()));
        }
        if self.document_index == self.changeset_index {
            return Err(Error::Config(format!(
                "document and changeset index must differ (both '{}')",
                self.document_index
            )));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if self.snapshot_keep_alive_ms == 0 {
            return Err(Error::Config(
                "snapshot_keep_alive_ms must be at least 1".to_string(),
            ));
        }
        if self.connection.max_attempts == 0 {
            return Err(Error::Config(
                "connection.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Catalog configuration
#
# Index holding the current state of every document
document_index = "steckbrief"

# Index holding the changeset history
changeset_index = "changeset"

# Records fetched per page when listing changesets or documents
page_size = 100

# Snapshot time-to-live in milliseconds, refreshed by every page request
snapshot_keep_alive_ms = 60000

# Backend availability check at startup.
# Waits base_delay_ms * 2^n after the n-th failed ping, capped at max_delay_ms.
[connection]
max_attempts = 3
base_delay_ms = 5000
max_delay_ms = 20000
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: CatalogConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Write the default file if needed, then load it.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        Self::write_default_if_missing(path)?;
        Self::from_file(path)
    }
}

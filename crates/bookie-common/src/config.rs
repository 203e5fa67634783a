//! Configuration types for the bookie metadata core
//!
//! Configuration is read from a TOML file and may be overridden through
//! `BOOKIE__`-prefixed environment variables, e.g.
//! `BOOKIE__INDEX__DATA_DIR=/data/ledgers`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BOOKIE";

/// Root configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ledger metadata index configuration
    pub index: LedgerIndexConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, layered with environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Toml)
                    .required(true),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from environment overrides only.
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Ledger metadata index configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerIndexConfig {
    /// Directory holding the index database
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`
    pub db_file: String,
}

impl Default for LedgerIndexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/bookie/ledgers"),
            db_file: "ledgers.redb".to_string(),
        }
    }
}

impl LedgerIndexConfig {
    /// Create config rooted at the given data directory
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Full path of the index database file
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON-formatted log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

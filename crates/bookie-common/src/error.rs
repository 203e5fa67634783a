//! Error types shared by the bookie bootstrap helpers
//!
//! Component-specific failures (index, topology) live in their own
//! crates; this type only covers configuration and process setup.

use thiserror::Error;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("logging setup error: {0}")]
    Logging(String),
}

impl Error {
    /// Create a logging setup error
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }
}

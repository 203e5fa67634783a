//! Bookie Common - Shared configuration and bootstrap helpers
//!
//! This crate provides the configuration model, logging bootstrap and
//! common error type used by the metadata index and topology crates.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, LedgerIndexConfig, LoggingConfig};
pub use error::{Error, Result};
pub use logging::init_logging;

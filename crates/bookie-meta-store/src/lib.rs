//! Bookie Metadata Store - Ledger metadata index
//!
//! This crate maps ledger ids to their metadata records (fenced flag,
//! master key, explicit LAC, limbo flag) on top of an ordered key-value
//! store.

pub mod error;
pub mod index;
pub mod kv;
pub mod store;
pub mod tables;
pub mod types;

// Re-exports
pub use error::{IndexError, IndexResult, KvError, KvResult};
pub use index::LedgerMetadataIndex;
pub use kv::{BatchOp, KeyValueStore, MemoryKeyValueStore, WriteBatch};
pub use store::RedbKeyValueStore;
pub use types::LedgerRecord;

//! Error types for the key-value layer and the ledger metadata index

use thiserror::Error;

/// Error type for key-value store operations
#[derive(Debug, Error)]
pub enum KvError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for KvError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

pub type KvResult<T> = Result<T, KvError>;

/// Error type for ledger metadata index operations
#[derive(Debug, Error)]
pub enum IndexError {
    /// Ledger id is not positive or no record exists for it
    #[error("ledger {ledger_id} not found")]
    NotFound { ledger_id: i64 },

    /// Stored master key differs from the one supplied
    #[error("ledger {ledger_id}: {reason}")]
    Conflict { ledger_id: i64, reason: String },

    /// Stored bytes could not be decoded
    #[error("ledger {ledger_id}: corrupt metadata record: {source}")]
    Corruption {
        ledger_id: i64,
        #[source]
        source: prost::DecodeError,
    },

    /// Underlying store failure
    #[error("ledger metadata storage error: {0}")]
    Storage(#[from] KvError),
}

impl IndexError {
    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a conflict error
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Ledger id the error refers to, if any
    #[must_use]
    pub const fn ledger_id(&self) -> Option<i64> {
        match self {
            Self::NotFound { ledger_id }
            | Self::Conflict { ledger_id, .. }
            | Self::Corruption { ledger_id, .. } => Some(*ledger_id),
            Self::Storage(_) => None,
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;

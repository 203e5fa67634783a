//! Redb table definitions for persistent metadata storage.

use redb::TableDefinition;

// Key: ledger id as 8-byte big-endian i64, Value: prost-encoded LedgerRecord
pub const LEDGERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("ledgers");

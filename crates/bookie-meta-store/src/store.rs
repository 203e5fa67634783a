//! Persistent key-value store backed by redb.
//!
//! Every write is its own write transaction and is durable once `commit`
//! returns. Reads open a fresh read transaction and see the latest
//! committed state.

use crate::error::KvResult;
use crate::kv::{BatchOp, KeyValueStore, WriteBatch};
use crate::tables;
use redb::{Database, ReadableTable, ReadableTableMetadata};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Durable [`KeyValueStore`] on a single redb table.
pub struct RedbKeyValueStore {
    db: Database,
    path: PathBuf,
}

impl RedbKeyValueStore {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create the table eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::LEDGERS)?;
        }
        write_txn.commit()?;

        info!("Opened ledger metadata store at {:?}", path);
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Location of the database file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored entries
    pub fn len(&self) -> KvResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::LEDGERS)?;
        Ok(table.len()?)
    }

    /// Check if empty
    pub fn is_empty(&self) -> KvResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl std::fmt::Debug for RedbKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbKeyValueStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl KeyValueStore for RedbKeyValueStore {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::LEDGERS)?;
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::LEDGERS)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> KvResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::LEDGERS)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn scan(&self, visitor: &mut dyn FnMut(&[u8], &[u8]) -> KvResult<()>) -> KvResult<()> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::LEDGERS)?;
        for entry in table.iter()? {
            let entry = entry?;
            visitor(entry.0.value(), entry.1.value())?;
        }
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> KvResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.len();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::LEDGERS)?;
            for op in batch.ops() {
                match op {
                    BatchOp::Put { key, value } => {
                        table.insert(key.as_slice(), value.as_slice())?;
                    }
                    BatchOp::Delete { key } => {
                        table.remove(key.as_slice())?;
                    }
                }
            }
        }
        write_txn.commit()?;
        debug!("write_batch: {} ops", count);
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> KvResult<bool> {
        let write_txn = self.db.begin_write()?;
        let swapped = {
            let mut table = write_txn.open_table(tables::LEDGERS)?;
            // Read and compare, then drop the guard before mutating
            let current = table.get(key)?.map(|val| val.value().to_vec());
            if current.as_deref() == expected {
                match new {
                    Some(value) => {
                        table.insert(key, value)?;
                    }
                    None => {
                        table.remove(key)?;
                    }
                }
                true
            } else {
                false
            }
        };
        if swapped {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(swapped)
    }
}

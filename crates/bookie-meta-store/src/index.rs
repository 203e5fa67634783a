//! Ledger metadata index
//!
//! Maps ledger ids to [`LedgerRecord`]s stored in a [`KeyValueStore`].
//! Keys are the ledger id as an 8-byte big-endian signed integer; values
//! are prost-encoded records.
//!
//! The store is the source of truth for record contents. At construction
//! the index scans every key once to build an in-memory set of known
//! ledger ids, which serves existence checks and range enumeration only.
//! Every store write or delete runs with the cache's write lock held, so
//! the cache never disagrees with the store about which keys exist.
//!
//! # Concurrency
//!
//! The index adds no locking of its own around store access. The field
//! mutators [`set_fenced`](LedgerMetadataIndex::set_fenced) and
//! [`set_limbo`](LedgerMetadataIndex::set_limbo) are a read followed by a
//! write and are **not** atomic against a concurrent
//! [`delete`](LedgerMetadataIndex::delete) of the same ledger: a delete
//! landing between the two steps is overwritten and the ledger comes back
//! with its pre-delete contents plus the new flag. Callers that need
//! stronger guarantees either serialize per ledger id themselves or use the
//! `*_atomic` variants, which check-and-set against the bytes they read.

use crate::error::{IndexError, IndexResult};
use crate::kv::{KeyValueStore, WriteBatch};
use crate::store::RedbKeyValueStore;
use crate::types::{LedgerRecord, ledger_id_from_key, ledger_key};
use bookie_common::LedgerIndexConfig;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Check-and-set attempts before an atomic mutator gives up
const MAX_CAS_ATTEMPTS: usize = 16;

/// Ledger id → metadata index over a key-value store
pub struct LedgerMetadataIndex {
    store: Arc<dyn KeyValueStore>,
    /// Ledger ids known to exist
    ledgers: RwLock<BTreeSet<i64>>,
}

impl LedgerMetadataIndex {
    /// Build an index over `store`, loading the set of existing ledger ids.
    pub fn new(store: Arc<dyn KeyValueStore>) -> IndexResult<Self> {
        let mut ledgers = BTreeSet::new();
        let mut skipped = 0usize;
        store.scan(&mut |key, _| {
            match ledger_id_from_key(key) {
                Some(ledger_id) if ledger_id > 0 => {
                    ledgers.insert(ledger_id);
                }
                Some(ledger_id) => {
                    warn!("Skipping record under non-positive ledger id {}", ledger_id);
                    skipped += 1;
                }
                None => {
                    warn!("Skipping malformed ledger key of {} bytes", key.len());
                    skipped += 1;
                }
            }
            Ok(())
        })?;

        info!(
            "Loaded ledger metadata index ({} ledgers, {} invalid keys skipped)",
            ledgers.len(),
            skipped
        );
        Ok(Self {
            store,
            ledgers: RwLock::new(ledgers),
        })
    }

    /// Open the redb-backed index described by `config`.
    pub fn open(config: &LedgerIndexConfig) -> IndexResult<Self> {
        let store = RedbKeyValueStore::open(config.db_path())?;
        Self::new(Arc::new(store))
    }

    /// Get a copy of the metadata of `ledger_id`.
    ///
    /// Fails with [`IndexError::NotFound`] for non-positive ids and missing
    /// ledgers, and with [`IndexError::Corruption`] if the stored bytes do
    /// not decode.
    pub fn get(&self, ledger_id: i64) -> IndexResult<LedgerRecord> {
        self.read(ledger_id).map(|(record, _)| record)
    }

    /// Store `record` for `ledger_id`, creating the ledger if needed.
    ///
    /// The stored copy always has `exists` set. Non-positive ids are
    /// rejected with [`IndexError::NotFound`], as they are by `get`.
    pub fn set(&self, ledger_id: i64, record: LedgerRecord) -> IndexResult<()> {
        if ledger_id <= 0 {
            return Err(IndexError::NotFound { ledger_id });
        }
        let record = LedgerRecord {
            exists: true,
            ..record
        };
        self.write(ledger_id, &record)?;
        debug!("set ledger {}", ledger_id);
        Ok(())
    }

    /// Mark `ledger_id` fenced.
    ///
    /// Returns false without writing if the ledger was already fenced.
    ///
    /// Not atomic against a concurrent [`delete`](Self::delete): if the
    /// ledger is deleted between the read and the write, the write
    /// recreates it from the snapshot read here, with `fenced` set. Use
    /// [`set_fenced_atomic`](Self::set_fenced_atomic) to fail instead.
    pub fn set_fenced(&self, ledger_id: i64) -> IndexResult<bool> {
        let record = self.get(ledger_id)?;
        if record.fenced {
            return Ok(false);
        }
        self.write(ledger_id, &record.with_fenced(true))?;
        debug!("ledger {} fenced", ledger_id);
        Ok(true)
    }

    /// Mark `ledger_id` in limbo.
    ///
    /// Same contract, including the race with [`delete`](Self::delete), as
    /// [`set_fenced`](Self::set_fenced).
    pub fn set_limbo(&self, ledger_id: i64) -> IndexResult<bool> {
        let record = self.get(ledger_id)?;
        if record.limbo {
            return Ok(false);
        }
        self.write(ledger_id, &record.with_limbo(true))?;
        debug!("ledger {} in limbo", ledger_id);
        Ok(true)
    }

    /// Clear the limbo flag once recovery of `ledger_id` has finished.
    ///
    /// Returns false without writing if the ledger was not in limbo.
    pub fn clear_limbo(&self, ledger_id: i64) -> IndexResult<bool> {
        let record = self.get(ledger_id)?;
        if !record.limbo {
            return Ok(false);
        }
        self.write(ledger_id, &record.with_limbo(false))?;
        debug!("ledger {} out of limbo", ledger_id);
        Ok(true)
    }

    /// Fence `ledger_id` only if the record is unchanged since it was read.
    ///
    /// Unlike [`set_fenced`](Self::set_fenced) this never resurrects a
    /// concurrently deleted ledger: it fails with [`IndexError::NotFound`].
    pub fn set_fenced_atomic(&self, ledger_id: i64) -> IndexResult<bool> {
        self.update_atomic(ledger_id, |record| {
            (!record.fenced).then(|| record.clone().with_fenced(true))
        })
    }

    /// Check-and-set counterpart of [`set_limbo`](Self::set_limbo).
    pub fn set_limbo_atomic(&self, ledger_id: i64) -> IndexResult<bool> {
        self.update_atomic(ledger_id, |record| {
            (!record.limbo).then(|| record.clone().with_limbo(true))
        })
    }

    /// Set the master key of `ledger_id`.
    ///
    /// An empty stored key is replaced. A non-empty stored key must equal
    /// `master_key`, otherwise [`IndexError::Conflict`] is returned and the
    /// stored key is left as is.
    pub fn set_master_key(&self, ledger_id: i64, master_key: &[u8]) -> IndexResult<()> {
        let mut record = self.get(ledger_id)?;
        if record.master_key.is_empty() {
            record.master_key = master_key.to_vec();
            self.write(ledger_id, &record)?;
            debug!("ledger {} master key set", ledger_id);
            return Ok(());
        }
        if record.master_key != master_key {
            warn!("ledger {}: master key mismatch", ledger_id);
            return Err(IndexError::Conflict {
                ledger_id,
                reason: "master key does not match the stored key".to_string(),
            });
        }
        Ok(())
    }

    /// Overwrite the explicit LAC of `ledger_id`.
    pub fn set_explicit_lac(&self, ledger_id: i64, lac: &[u8]) -> IndexResult<()> {
        let mut record = self.get(ledger_id)?;
        record.explicit_lac = Some(lac.to_vec());
        self.write(ledger_id, &record)?;
        debug!("ledger {} explicit LAC updated", ledger_id);
        Ok(())
    }

    /// Remove `ledger_id`. Removing a missing ledger succeeds.
    pub fn delete(&self, ledger_id: i64) -> IndexResult<()> {
        let mut ledgers = self.ledgers.write();
        self.store.delete(&ledger_key(ledger_id))?;
        ledgers.remove(&ledger_id);
        drop(ledgers);
        debug!("deleted ledger {}", ledger_id);
        Ok(())
    }

    /// Remove several ledgers in one store batch. Missing ids are ignored.
    pub fn delete_batch(&self, ledger_ids: &[i64]) -> IndexResult<()> {
        if ledger_ids.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::new();
        for ledger_id in ledger_ids {
            batch.delete(ledger_key(*ledger_id).to_vec());
        }

        let mut ledgers = self.ledgers.write();
        self.store.write_batch(batch)?;
        for ledger_id in ledger_ids {
            ledgers.remove(ledger_id);
        }
        drop(ledgers);
        debug!("deleted {} ledgers", ledger_ids.len());
        Ok(())
    }

    /// Check whether `ledger_id` is known to exist.
    #[must_use]
    pub fn exists(&self, ledger_id: i64) -> bool {
        self.ledgers.read().contains(&ledger_id)
    }

    /// Known ledger ids in `[first, last)`, ascending.
    #[must_use]
    pub fn active_ledgers_in_range(&self, first: i64, last: i64) -> Vec<i64> {
        if first >= last {
            return Vec::new();
        }
        self.ledgers.read().range(first..last).copied().collect()
    }

    /// Number of known ledgers
    #[must_use]
    pub fn len(&self) -> usize {
        self.ledgers.read().len()
    }

    /// Check if no ledgers are known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ledgers.read().is_empty()
    }

    /// Make all previous writes durable.
    pub fn flush(&self) -> IndexResult<()> {
        self.store.sync()?;
        Ok(())
    }

    // ---- Internal helpers ----

    /// Fetch and decode a record together with its raw bytes.
    fn read(&self, ledger_id: i64) -> IndexResult<(LedgerRecord, Vec<u8>)> {
        if ledger_id <= 0 {
            return Err(IndexError::NotFound { ledger_id });
        }
        let bytes = self
            .store
            .get(&ledger_key(ledger_id))?
            .ok_or(IndexError::NotFound { ledger_id })?;
        let record = LedgerRecord::from_bytes(&bytes)
            .map_err(|source| IndexError::Corruption { ledger_id, source })?;
        Ok((record, bytes))
    }

    fn write(&self, ledger_id: i64, record: &LedgerRecord) -> IndexResult<()> {
        let mut ledgers = self.ledgers.write();
        self.store.put(&ledger_key(ledger_id), &record.to_bytes())?;
        ledgers.insert(ledger_id);
        Ok(())
    }

    /// Drop `ledger_id` from the cache if the store no longer has it.
    fn evict_if_absent(&self, ledger_id: i64) -> IndexResult<()> {
        let mut ledgers = self.ledgers.write();
        if self.store.get(&ledger_key(ledger_id))?.is_none() {
            ledgers.remove(&ledger_id);
        }
        Ok(())
    }

    /// Apply `update` with check-and-set. `update` returns `None` when the
    /// record needs no change.
    fn update_atomic<F>(&self, ledger_id: i64, update: F) -> IndexResult<bool>
    where
        F: Fn(&LedgerRecord) -> Option<LedgerRecord>,
    {
        let key = ledger_key(ledger_id);
        for _ in 0..MAX_CAS_ATTEMPTS {
            let (record, current) = match self.read(ledger_id) {
                Ok(found) => found,
                Err(e @ IndexError::NotFound { .. }) => {
                    if ledger_id > 0 {
                        self.evict_if_absent(ledger_id)?;
                    }
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            let Some(updated) = update(&record) else {
                return Ok(false);
            };
            let updated_bytes = updated.to_bytes();
            let mut ledgers = self.ledgers.write();
            if self.store.compare_and_swap(
                &key,
                Some(current.as_slice()),
                Some(updated_bytes.as_slice()),
            )? {
                ledgers.insert(ledger_id);
                return Ok(true);
            }
            drop(ledgers);
            debug!("ledger {} changed during update, retrying", ledger_id);
        }
        Err(IndexError::Conflict {
            ledger_id,
            reason: format!("record kept changing across {MAX_CAS_ATTEMPTS} update attempts"),
        })
    }
}

impl std::fmt::Debug for LedgerMetadataIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerMetadataIndex")
            .field("ledgers", &self.len())
            .finish_non_exhaustive()
    }
}

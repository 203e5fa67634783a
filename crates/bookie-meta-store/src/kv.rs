//! Ordered key-value store contract
//!
//! The ledger index only needs point reads and writes, a full ordered
//! scan at startup, atomic batches and a single-key check-and-set. Any
//! engine providing those can back the index; [`RedbKeyValueStore`] is the
//! durable one, [`MemoryKeyValueStore`] keeps everything in memory.
//!
//! [`RedbKeyValueStore`]: crate::store::RedbKeyValueStore

use crate::error::KvResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A single operation inside a [`WriteBatch`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Group of writes applied atomically
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Queue a delete
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    /// Number of queued operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the batch is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued operations in insertion order
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consume the batch
    #[must_use]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Ordered byte-key/byte-value store
///
/// Implementations must be safe for concurrent use; each call is atomic
/// with respect to the keys it touches, but no ordering is promised between
/// separate calls.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;

    /// Insert or overwrite `key`
    fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()>;

    /// Remove `key`; removing an absent key succeeds
    fn delete(&self, key: &[u8]) -> KvResult<()>;

    /// Visit every entry in ascending key order
    fn scan(&self, visitor: &mut dyn FnMut(&[u8], &[u8]) -> KvResult<()>) -> KvResult<()>;

    /// Apply all operations of `batch` atomically, in order
    fn write_batch(&self, batch: WriteBatch) -> KvResult<()>;

    /// Replace the value of `key` with `new` only if it currently equals
    /// `expected`. `None` stands for "absent" on both sides.
    ///
    /// Returns true if the swap happened.
    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> KvResult<bool>;

    /// Make previous writes durable
    fn sync(&self) -> KvResult<()> {
        Ok(())
    }
}

/// In-memory store backed by a sorted map
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> KvResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn scan(&self, visitor: &mut dyn FnMut(&[u8], &[u8]) -> KvResult<()>) -> KvResult<()> {
        // Snapshot first so the visitor may call back into the store
        let snapshot: Vec<(Vec<u8>, Vec<u8>)> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in &snapshot {
            visitor(key, value)?;
        }
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> KvResult<()> {
        let mut entries = self.entries.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> KvResult<bool> {
        let mut entries = self.entries.write();
        if entries.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        match new {
            Some(value) => {
                entries.insert(key.to_vec(), value.to_vec());
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_put_get_delete() {
        let store = MemoryKeyValueStore::new();
        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));

        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);

        // Deleting again is fine
        store.delete(b"a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_scan_is_ordered() {
        let store = MemoryKeyValueStore::new();
        store.put(b"c", b"3").unwrap();
        store.put(b"a", b"1").unwrap();
        store.put(b"b", b"2").unwrap();

        let mut keys = Vec::new();
        store
            .scan(&mut |k, _| {
                keys.push(k.to_vec());
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_memory_write_batch() {
        let store = MemoryKeyValueStore::new();
        store.put(b"old", b"x").unwrap();

        let mut batch = WriteBatch::new();
        batch.put(b"k1".to_vec(), b"v1".to_vec());
        batch.put(b"k2".to_vec(), b"v2".to_vec());
        batch.delete(b"old".to_vec());
        assert_eq!(batch.len(), 3);

        store.write_batch(batch).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(b"old").unwrap(), None);
        assert_eq!(store.get(b"k2").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_memory_compare_and_swap() {
        let store = MemoryKeyValueStore::new();

        // Insert only if absent
        assert!(store.compare_and_swap(b"k", None, Some(b"v1".as_slice())).unwrap());
        assert!(!store.compare_and_swap(b"k", None, Some(b"v2".as_slice())).unwrap());

        // Stale expectation loses
        assert!(!store.compare_and_swap(b"k", Some(b"zz".as_slice()), Some(b"v2".as_slice())).unwrap());
        assert!(store.compare_and_swap(b"k", Some(b"v1".as_slice()), Some(b"v2".as_slice())).unwrap());
        assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()));

        // Conditional delete
        assert!(store.compare_and_swap(b"k", Some(b"v2".as_slice()), None).unwrap());
        assert_eq!(store.get(b"k").unwrap(), None);
    }
}

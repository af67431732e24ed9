//! In-memory [`KvStore`] backed by a `BTreeMap`.
//!
//! Writers hold the write lock for the whole transaction and stage their
//! puts in a scratch map, so a failed transaction leaves nothing behind.

use std::cell::RefCell;
use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{KvStore, ReadTxn, WriteTxn};
use crate::error::Result;

type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ephemeral store. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys, including the tip pointer.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Write outside any transaction. Meant for fixtures and fault injection.
    pub fn insert_raw(&self, key: &[u8], value: &[u8]) {
        self.entries.write().insert(key.to_vec(), value.to_vec());
    }

    /// Remove a key outside any transaction.
    pub fn remove_raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.write().remove(key)
    }

    /// Read outside any transaction.
    pub fn get_raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }
}

struct MemoryRead<'a> {
    entries: &'a Entries,
}

impl ReadTxn for MemoryRead<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }
}

struct MemoryWrite<'a> {
    base: &'a Entries,
    staged: RefCell<Entries>,
}

impl ReadTxn for MemoryWrite<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.staged.borrow().get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(self.base.get(key).cloned())
    }
}

impl WriteTxn for MemoryWrite<'_> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.staged.borrow_mut().insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

impl KvStore for MemoryStore {
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn ReadTxn) -> Result<T>,
    {
        let entries = self.entries.read();
        f(&MemoryRead { entries: &entries })
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn WriteTxn) -> Result<T>,
    {
        let mut entries = self.entries.write();
        let (result, staged) = {
            let txn = MemoryWrite {
                base: &entries,
                staged: RefCell::new(BTreeMap::new()),
            };
            let result = f(&txn);
            (result, txn.staged.into_inner())
        };
        let value = result?;
        entries.extend(staged);
        Ok(value)
    }
}

//! # SledStore — Durable Storage
//!
//! The persistent [`KvStore`] backend, built on sled's embedded key-value
//! store. Blocks and the tip pointer live in a single sled tree
//! ([`BLOCKS_TREE`]) so that "write block + move tip" is one transaction
//! over one keyspace.
//!
//! ## Atomicity
//!
//! `update` runs inside `Tree::transaction`, which is serializable: either
//! every `put` of the closure lands or none does. When another writer
//! commits first, sled reports a conflict and re-runs the closure. We hand
//! those conflicts back to sled untouched instead of turning them into
//! aborts, otherwise a harmless retry would surface as a storage error.
//!
//! Every successful `update` is followed by a flush, so a returned `Ok`
//! means the data is on disk.
//!
//! The flush runs after the transaction has committed. If it fails, `update`
//! returns `Storage` although the writes are already visible in the tree.

use std::cell::RefCell;
use std::path::Path;

use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree,
    UnabortableTransactionError,
};
use sled::{Db, Tree};
use tracing::debug;

use super::{KvStore, ReadTxn, WriteTxn};
use crate::config::BLOCKS_TREE;
use crate::error::{LedgerError, Result};

/// Persistent store backed by a sled database.
///
/// Cheap to clone: clones share the same underlying database, and sled is
/// safe to use from many threads at once.
#[derive(Debug, Clone)]
pub struct SledStore {
    /// Blocks keyed by hash, plus the tip pointer. Keeps the database open.
    tree: Tree,
}

impl SledStore {
    /// Open or create a database at the given filesystem path.
    ///
    /// If the directory doesn't exist, sled creates it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a database that is deleted when the last handle is dropped.
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    /// Wrap an already opened sled database.
    pub fn from_db(db: Db) -> Result<Self> {
        let tree = db.open_tree(BLOCKS_TREE)?;
        Ok(Self { tree })
    }

    /// Direct access to the blocks tree, bypassing transactions.
    ///
    /// Intended for inspection and repair tooling.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Number of keys in the blocks tree, including the tip pointer.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the blocks tree is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

struct SledRead<'a> {
    tree: &'a Tree,
}

impl ReadTxn for SledRead<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|value| value.to_vec()))
    }
}

/// Write handle for one attempt of a sled transaction.
///
/// sled reports conflicts through the same error channel as I/O failures.
/// The sled error is parked in `pending` so `update` can tell sled to
/// retry instead of aborting.
struct SledWrite<'a> {
    tx: &'a TransactionalTree,
    pending: RefCell<Option<UnabortableTransactionError>>,
}

impl SledWrite<'_> {
    fn park(&self, err: UnabortableTransactionError) -> LedgerError {
        let message = match &err {
            UnabortableTransactionError::Conflict => "transaction conflict".to_string(),
            UnabortableTransactionError::Storage(e) => e.to_string(),
        };
        *self.pending.borrow_mut() = Some(err);
        LedgerError::Storage(message)
    }
}

impl ReadTxn for SledWrite<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.tx.get(key) {
            Ok(value) => Ok(value.map(|v| v.to_vec())),
            Err(err) => Err(self.park(err)),
        }
    }
}

impl WriteTxn for SledWrite<'_> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        match self.tx.insert(key, value) {
            Ok(_) => Ok(()),
            Err(err) => Err(self.park(err)),
        }
    }
}

impl KvStore for SledStore {
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn ReadTxn) -> Result<T>,
    {
        f(&SledRead { tree: &self.tree })
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn WriteTxn) -> Result<T>,
    {
        let outcome = self.tree.transaction(|tx| {
            let txn = SledWrite {
                tx,
                pending: RefCell::new(None),
            };
            match f(&txn) {
                Ok(value) => Ok(value),
                Err(err) => match txn.pending.into_inner() {
                    Some(sled_err) => {
                        debug!(error = %err, "sled transaction attempt failed");
                        Err(ConflictableTransactionError::from(sled_err))
                    }
                    None => Err(ConflictableTransactionError::Abort(err)),
                },
            }
        });

        let value = outcome.map_err(|e| match e {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => LedgerError::from(err),
        })?;
        self.tree.flush()?;
        Ok(value)
    }
}

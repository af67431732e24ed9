//! # Storage Module
//!
//! The ledger never talks to a database directly. It sees a key-value store
//! through [`KvStore`], which offers exactly two things: a read-only view and
//! an atomic read-modify-write transaction over byte-string keys.
//!
//! ## Key Layout
//!
//! | Key                 | Value                      |
//! |---------------------|----------------------------|
//! | `b"l"`              | hash of the tip block      |
//! | block hash (32B)    | `codec::encode(Block)`     |
//!
//! ## Implementations
//!
//! ```text
//! db.rs     — SledStore: durable, one sled tree, serializable transactions
//! memory.rs — MemoryStore: BTreeMap behind a lock, for tests and tooling
//! ```
//!
//! ## Transaction Closures
//!
//! `update` takes an `Fn`, not an `FnOnce`. Stores with optimistic
//! concurrency (sled) re-run the closure when a conflicting writer commits
//! first, so the closure must be side-effect free apart from its `put`s.

pub mod db;
pub mod memory;

pub use db::SledStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Read access inside a transaction.
pub trait ReadTxn {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Read-write access inside a transaction. Writes become visible only when
/// the enclosing [`KvStore::update`] returns `Ok`.
pub trait WriteTxn: ReadTxn {
    /// Stage `value` under `key`.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
}

/// An embedded key-value store with transactional access.
pub trait KvStore: Send + Sync {
    /// Run `f` against a consistent read-only view.
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn ReadTxn) -> Result<T>;

    /// Run `f` with read-write access. All of its writes land atomically if
    /// it returns `Ok`; none of them land if `f` itself returns `Err`.
    ///
    /// A `Storage` error raised after commit (a failed flush) leaves the
    /// writes in place. Callers that must know re-read what they wrote.
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn WriteTxn) -> Result<T>;
}

//! Error types for the ledger engine.
//!
//! Every fallible operation in the crate returns a [`LedgerError`]. Nothing
//! in the engine logs-and-swallows a failure: a ledger whose tip silently
//! diverges from the store is worse than one that refuses to move.

use thiserror::Error;

/// Errors that can occur while sealing, persisting, or walking the chain.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The key-value store failed (I/O, disk full, lock contention).
    #[error("storage error: {0}")]
    Storage(String),

    /// Stored bytes could not be decoded into a block.
    #[error("malformed block: {0}")]
    MalformedBlock(String),

    /// A hash was dereferenced that has no entry in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// The hash stored in a block differs from a recomputation of its fields.
    #[error("hash mismatch: stored={stored}, computed={computed}")]
    HashMismatch {
        /// Hex of the hash recorded in the block.
        stored: String,
        /// Hex of the hash recomputed from the block's fields.
        computed: String,
    },

    /// The block hash does not satisfy the difficulty target.
    #[error("invalid proof of work for block {hash} at difficulty {difficulty}")]
    InvalidProofOfWork {
        /// Hex of the offending block hash.
        hash: String,
        /// Difficulty the block was checked against.
        difficulty: u32,
    },

    /// Following hash links led somewhere it must not: a block stored under
    /// a key that carries a different hash, or a block already walked past.
    #[error("broken link at key {key}: found {found}")]
    BrokenLink {
        /// Hex of the key that was dereferenced.
        key: String,
        /// What the walk found there.
        found: String,
    },

    /// The tip moved between sealing a block and committing it.
    #[error("tip moved during append: expected {expected}, found {found}")]
    TipMoved {
        /// Hex of the tip the block was sealed against.
        expected: String,
        /// Hex of the tip found at commit time.
        found: String,
    },

    /// The proof-of-work search was cancelled by the caller.
    #[error("proof-of-work search cancelled")]
    Cancelled,

    /// Every nonce was tried without meeting the target.
    #[error("nonce space exhausted at difficulty {0}")]
    NonceExhausted(u32),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A value could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;

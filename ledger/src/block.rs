//! # Block Structure
//!
//! A block is one immutable ledger entry. It carries an ordered list of
//! transactions, the hash of the block before it, and the proof that work
//! was spent sealing it.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  timestamp: i64          (Unix seconds)      │
//! │  transactions: Vec<Transaction>              │
//! │  prev_hash: Vec<u8>      (empty for genesis) │
//! │  hash: Vec<u8>           (SHA-256, 32 bytes) │
//! │  nonce: u64              (work solution)     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The field order above is also the on-disk order (see [`codec`]).
//!
//! ## Sealing
//!
//! Blocks are only ever built through [`Block::seal_genesis`] or
//! [`Block::seal`], which run the proof-of-work and fill in `nonce` and
//! `hash`. The hash is computed once and never rewritten; [`Block::verify`]
//! recomputes it to detect tampering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{LedgerError, Result};
use crate::pow::{meets_target, CancelToken, ProofOfWork};
use crate::transaction::Transaction;

/// A sealed ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Creation time in seconds since the Unix epoch.
    pub timestamp: i64,
    /// Ordered payload. Order is part of the hash.
    pub transactions: Vec<Transaction>,
    /// Hash of the predecessor. Empty only for genesis.
    pub prev_hash: Vec<u8>,
    /// Digest of the other four fields under the work preimage.
    pub hash: Vec<u8>,
    /// Proof-of-work solution.
    pub nonce: u64,
}

impl Block {
    /// Seal the first block of a chain.
    ///
    /// # Errors
    ///
    /// `Cancelled` if `cancel` fires during the search; `InvalidConfig` for an
    /// out-of-range difficulty.
    pub fn seal_genesis(
        transactions: Vec<Transaction>,
        difficulty: u32,
        cancel: &CancelToken,
    ) -> Result<Self> {
        Self::seal_at(now(), transactions, Vec::new(), difficulty, cancel)
    }

    /// Seal a block on top of `prev_hash`.
    ///
    /// `prev_hash` must be the hash of an existing block; passing an empty
    /// hash would mint a second genesis and is a caller bug.
    pub fn seal(
        transactions: Vec<Transaction>,
        prev_hash: Vec<u8>,
        difficulty: u32,
        cancel: &CancelToken,
    ) -> Result<Self> {
        debug_assert!(
            !prev_hash.is_empty(),
            "Block::seal called without a predecessor; use seal_genesis"
        );
        Self::seal_at(now(), transactions, prev_hash, difficulty, cancel)
    }

    /// Seal with an explicit timestamp. Used directly by tests that need
    /// reproducible hashes.
    pub(crate) fn seal_at(
        timestamp: i64,
        transactions: Vec<Transaction>,
        prev_hash: Vec<u8>,
        difficulty: u32,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let (nonce, hash) =
            ProofOfWork::new(timestamp, &transactions, &prev_hash, difficulty)?.run(cancel)?;

        Ok(Block {
            timestamp,
            transactions,
            prev_hash,
            hash: hash.to_vec(),
            nonce,
        })
    }

    /// The puzzle this block's fields define at `difficulty`.
    pub fn proof_of_work(&self, difficulty: u32) -> Result<ProofOfWork<'_>> {
        ProofOfWork::new(self.timestamp, &self.transactions, &self.prev_hash, difficulty)
    }

    /// Check that the stored hash matches the fields and meets the target.
    ///
    /// # Errors
    ///
    /// `HashMismatch` if any field was altered after sealing,
    /// `InvalidProofOfWork` if the hash is consistent but too large.
    pub fn verify(&self, difficulty: u32) -> Result<()> {
        let pow = self.proof_of_work(difficulty)?;
        let computed = pow.digest(self.nonce);

        if self.hash.as_slice() != computed.as_slice() {
            return Err(LedgerError::HashMismatch {
                stored: self.hash_hex(),
                computed: hex::encode(computed),
            });
        }

        if !meets_target(&self.hash, &pow.target()) {
            return Err(LedgerError::InvalidProofOfWork {
                hash: self.hash_hex(),
                difficulty,
            });
        }

        Ok(())
    }

    /// Storage encoding of this block.
    pub fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    /// Rebuild a block from its storage encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }

    /// Whether this block starts a chain.
    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    /// Block hash as a hex string.
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }

    /// Predecessor hash as a hex string (empty for genesis).
    pub fn prev_hash_hex(&self) -> String {
        hex::encode(&self.prev_hash)
    }

    /// Number of transactions in the block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hash:      {}", self.hash_hex())?;
        writeln!(f, "Nonce:     {}", self.nonce)?;
        if self.is_genesis() {
            writeln!(f, "Prev hash: (genesis)")?;
        } else {
            writeln!(f, "Prev hash: {}", self.prev_hash_hex())?;
        }
        let time = chrono::DateTime::from_timestamp(self.timestamp, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| self.timestamp.to_string());
        writeln!(f, "Timestamp: {}", time)?;
        for (index, tx) in self.transactions.iter().enumerate() {
            writeln!(f, "  tx {}: {}", index, tx.describe())?;
        }
        Ok(())
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

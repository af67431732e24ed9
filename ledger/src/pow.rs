//! # Proof-of-Work
//!
//! A block is admitted only once its digest, read as a 256-bit big-endian
//! integer, falls below `2^(256 - difficulty)`. Finding such a digest means
//! trying nonces one by one; checking one costs a single hash.
//!
//! ## Preimage
//!
//! ```text
//! SHA-256( prev_hash || encode(transactions) || be64(timestamp)
//!          || be64(difficulty) || be64(nonce) )
//! ```
//!
//! `encode` is the same bincode encoding the storage codec uses, so the
//! payload bytes fed to the hash are exactly the bytes that hit the disk.
//!
//! ## Cancellation
//!
//! The search has no natural upper bound short of the nonce space. A
//! [`CancelToken`] is polled every [`CANCEL_CHECK_INTERVAL`] attempts so a
//! shutdown request stops the search instead of waiting it out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::codec;
use crate::config::{CANCEL_CHECK_INTERVAL, HASH_LENGTH, MAX_DIFFICULTY};
use crate::crypto::hash::sha256_multi;
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Shared flag that asks a running proof-of-work search to stop.
///
/// Clones share the same flag. Once cancelled a token stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal every holder of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Target arithmetic
// ---------------------------------------------------------------------------

/// The target `2^(256 - difficulty)` as a big-endian 32-byte integer.
///
/// `difficulty` must be in `1..=MAX_DIFFICULTY`; callers validate it through
/// [`ChainConfig::validate`](crate::config::ChainConfig::validate) or
/// [`ProofOfWork::new`].
pub fn target_for(difficulty: u32) -> [u8; HASH_LENGTH] {
    let mut target = [0u8; HASH_LENGTH];
    let exponent = 256 - difficulty as usize;
    target[HASH_LENGTH - 1 - exponent / 8] = 1 << (exponent % 8);
    target
}

/// Whether `hash` is numerically below `target`.
///
/// Both are big-endian, so lexicographic order is numeric order.
pub fn meets_target(hash: &[u8], target: &[u8; HASH_LENGTH]) -> bool {
    hash.len() == HASH_LENGTH && hash < &target[..]
}

// ---------------------------------------------------------------------------
// ProofOfWork
// ---------------------------------------------------------------------------

/// The work puzzle for one set of candidate block fields.
///
/// Holds the pre-encoded payload so each attempt only re-hashes; nothing
/// else is allocated inside the search loop.
#[derive(Debug, Clone)]
pub struct ProofOfWork<'a> {
    prev_hash: &'a [u8],
    payload: Vec<u8>,
    timestamp: i64,
    difficulty: u32,
    target: [u8; HASH_LENGTH],
}

impl<'a> ProofOfWork<'a> {
    /// Prepare the puzzle for the given fields.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the difficulty is out of range, `Serialization` if
    /// the payload cannot be encoded.
    pub fn new(
        timestamp: i64,
        transactions: &[Transaction],
        prev_hash: &'a [u8],
        difficulty: u32,
    ) -> Result<Self> {
        if difficulty == 0 || difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::InvalidConfig(format!(
                "difficulty must be in 1..={}, got {}",
                MAX_DIFFICULTY, difficulty
            )));
        }
        Ok(Self {
            prev_hash,
            payload: codec::encode_transactions(transactions)?,
            timestamp,
            difficulty,
            target: target_for(difficulty),
        })
    }

    /// The target a digest must stay below.
    pub fn target(&self) -> [u8; HASH_LENGTH] {
        self.target
    }

    /// Digest of the candidate fields with `nonce`.
    pub fn digest(&self, nonce: u64) -> [u8; HASH_LENGTH] {
        sha256_multi(&[
            self.prev_hash,
            &self.payload,
            &self.timestamp.to_be_bytes(),
            &u64::from(self.difficulty).to_be_bytes(),
            &nonce.to_be_bytes(),
        ])
    }

    /// Whether `nonce` solves the puzzle.
    pub fn validate(&self, nonce: u64) -> bool {
        meets_target(&self.digest(nonce), &self.target)
    }

    /// Search for the smallest nonce that solves the puzzle.
    ///
    /// Blocks the calling thread until a solution is found or `cancel` is
    /// triggered.
    ///
    /// # Errors
    ///
    /// `Cancelled` if the token fires mid-search, `NonceExhausted` if no
    /// `u64` nonce works.
    pub fn run(&self, cancel: &CancelToken) -> Result<(u64, [u8; HASH_LENGTH])> {
        let mut nonce: u64 = 0;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                debug!(attempts = nonce, "proof-of-work cancelled");
                return Err(LedgerError::Cancelled);
            }

            let hash = self.digest(nonce);
            if meets_target(&hash, &self.target) {
                debug!(
                    nonce,
                    difficulty = self.difficulty,
                    hash = %hex::encode(hash),
                    "proof-of-work solved"
                );
                return Ok((nonce, hash));
            }

            nonce = nonce
                .checked_add(1)
                .ok_or(LedgerError::NonceExhausted(self.difficulty))?;
        }
    }
}

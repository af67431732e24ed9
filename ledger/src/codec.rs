//! # Block Codec
//!
//! Deterministic, lossless byte encoding of blocks for storage. Bincode with
//! fixed-width little-endian integers: compact, fast, and the same block
//! always produces the same bytes.
//!
//! Decoding is strict. Truncated input, garbage, and trailing bytes after a
//! complete block are all reported as [`LedgerError::MalformedBlock`] rather
//! than half-decoded. The size limit keeps a corrupted length prefix from
//! turning into a huge allocation.

use bincode::Options;

use crate::block::Block;
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;

/// Upper bound on the encoded size of a single block.
pub const MAX_ENCODED_BLOCK_SIZE: u64 = 32 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_ENCODED_BLOCK_SIZE)
        .reject_trailing_bytes()
}

/// Encode a block into its storage representation.
pub fn encode(block: &Block) -> Result<Vec<u8>> {
    options()
        .serialize(block)
        .map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Decode a block previously produced by [`encode`].
///
/// # Errors
///
/// `MalformedBlock` if the bytes do not describe exactly one block.
pub fn decode(bytes: &[u8]) -> Result<Block> {
    options()
        .deserialize(bytes)
        .map_err(|e| LedgerError::MalformedBlock(e.to_string()))
}

/// Encode a transaction list the same way [`encode`] lays it out inside a
/// block. The proof-of-work preimage uses these bytes.
pub fn encode_transactions(transactions: &[Transaction]) -> Result<Vec<u8>> {
    options()
        .serialize(transactions)
        .map_err(|e| LedgerError::Serialization(e.to_string()))
}

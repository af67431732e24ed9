//! # Hashing Utilities
//!
//! Thin wrapper around the `sha2` crate. Block hashes, transaction IDs and
//! the proof-of-work preimage all go through it, so the digest
//! of a given byte string is identical across processes and restarts.

use sha2::{Digest, Sha256};

/// Hash several byte slices as if they were concatenated.
///
/// Feeds each part into the hasher in order, so the digest equals that of
/// `[a, b].concat()` without the temporary buffer.
///
/// # Example
///
/// ```
/// use powledger::crypto::sha256_multi;
///
/// assert_eq!(sha256_multi(&[b"pow", b"ledger"]), sha256_multi(&[b"powledger"]));
/// ```
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

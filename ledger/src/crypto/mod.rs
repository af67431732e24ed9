//! # Cryptographic Primitives
//!
//! The ledger needs exactly one primitive: a collision-resistant hash for
//! block digests and transaction IDs. SHA-256 is used throughout so that the
//! proof-of-work target reads the same way it does in every other
//! Bitcoin-style chain.

pub mod hash;

pub use hash::sha256_multi;

//! # powledger — Core Library
//!
//! An append-only ledger of proof-of-work-sealed blocks, persisted in an
//! embedded key-value store.
//!
//! Each block commits to an ordered list of opaque transaction records, the
//! hash of its predecessor, a timestamp, and a nonce. The nonce is found by
//! brute force so that the SHA-256 of the block's fields falls below a
//! difficulty target. Blocks are stored by hash next to a single tip pointer;
//! walking `prev_hash` from the tip reaches every block back to genesis.
//!
//! ## Architecture
//!
//! ```text
//!   transaction ──► codec ──► pow ──► block ──► chain ──► storage
//!   (payload)      (bytes)   (seal)  (record)  (tip +     (KvStore:
//!                                              iterator)   sled / memory)
//! ```
//!
//! - **transaction** — Opaque payload records and the coinbase record.
//! - **crypto** — SHA-256 helpers.
//! - **pow** — Target arithmetic, nonce search, cancellation.
//! - **block** — The sealed block record and its verification.
//! - **codec** — Deterministic binary encoding of blocks.
//! - **storage** — Transactional key-value abstraction and its backends.
//! - **chain** — Open-or-create, append, lookup, iteration, audit.
//! - **config** — Constants and [`ChainConfig`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use powledger::{Chain, ChainConfig, MemoryStore, Transaction};
//!
//! let store = Arc::new(MemoryStore::new());
//! let config = ChainConfig::with_difficulty(8);
//! let chain = Chain::open_or_create(
//!     store,
//!     vec![Transaction::coinbase("alice", None)],
//!     config,
//! )?;
//!
//! let block = chain.append(vec![Transaction::new("Send 1 BTC to Ivan")])?;
//! assert_eq!(chain.tip(), block.hash);
//! assert_eq!(chain.height()?, 2);
//! # Ok::<(), powledger::LedgerError>(())
//! ```

pub mod block;
pub mod chain;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod pow;
pub mod storage;
pub mod transaction;

pub use block::Block;
pub use chain::{Chain, ChainIterator, ChainReport};
pub use config::ChainConfig;
pub use error::{LedgerError, Result};
pub use pow::{CancelToken, ProofOfWork};
pub use storage::{KvStore, MemoryStore, SledStore};
pub use transaction::{Transaction, TransactionKind};

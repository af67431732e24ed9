//! # Chain Management
//!
//! [`Chain`] owns the tip pointer of one ledger and mediates every read and
//! write against the store that holds it. [`ChainIterator`] walks the
//! persisted blocks from the tip back to genesis.
//!
//! ## Append Pipeline
//!
//! ```text
//! 1. READ    — fetch the tip from the store (never trust the cache)
//! 2. SEAL    — run proof-of-work on top of that tip
//! 3. COMMIT  — one transaction: re-check the tip, put block, move tip
//! 4. CACHE   — only after the commit, update the in-memory tip
//! ```
//!
//! Sealing happens outside the store transaction: a store may re-run the
//! transaction closure, and a proof-of-work search is far too expensive to
//! repeat on every conflict. The re-check in step 3 catches writers from
//! other processes that extended the store while we were sealing; the block
//! is then re-sealed against the new tip.
//!
//! ## Thread Safety
//!
//! `Chain` is `Send + Sync`. Appends through the same `Chain` are
//! serialized by an internal mutex covering steps 1–4, so two threads can
//! never seal two blocks on the same predecessor.

use std::collections::HashSet;
use std::iter::FusedIterator;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::config::{ChainConfig, HASH_LENGTH, TIP_KEY};
use crate::error::{LedgerError, Result};
use crate::pow::CancelToken;
use crate::storage::{KvStore, ReadTxn};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// A hash-linked, proof-of-work-sealed ledger persisted in a [`KvStore`].
#[derive(Debug)]
pub struct Chain<S: KvStore> {
    store: Arc<S>,
    config: ChainConfig,
    tip: RwLock<Vec<u8>>,
    append_lock: Mutex<()>,
}

impl<S: KvStore> Chain<S> {
    /// Load the ledger in `store`, creating it with a genesis block over
    /// `genesis` if the store has none.
    ///
    /// Calling this twice against the same store never creates two genesis
    /// blocks: the second call finds the tip and returns the existing chain.
    pub fn open_or_create(
        store: Arc<S>,
        genesis: Vec<Transaction>,
        config: ChainConfig,
    ) -> Result<Self> {
        Self::open_or_create_with_cancel(store, genesis, config, &CancelToken::new())
    }

    /// [`open_or_create`](Self::open_or_create) with a cancellable genesis
    /// search.
    pub fn open_or_create_with_cancel(
        store: Arc<S>,
        genesis: Vec<Transaction>,
        config: ChainConfig,
        cancel: &CancelToken,
    ) -> Result<Self> {
        config.validate()?;

        if let Some(tip) = store.view(|txn| read_tip(txn))? {
            debug!(tip = %hex::encode(&tip), "opened existing chain");
            return Ok(Self::with_tip(store, config, tip));
        }

        let block = Block::seal_genesis(genesis, config.difficulty, cancel)?;
        let encoded = block.encode()?;

        // Another writer may have created a genesis while we were sealing.
        // The check and both writes form one atomic step.
        let (tip, created) = store.update(|txn| {
            if let Some(existing) = read_tip(txn)? {
                return Ok((existing, false));
            }
            txn.put(&block.hash, &encoded)?;
            txn.put(TIP_KEY, &block.hash)?;
            Ok((block.hash.clone(), true))
        })?;

        if created {
            info!(
                genesis = %block.hash_hex(),
                nonce = block.nonce,
                "no existing chain found, created genesis block"
            );
        } else {
            debug!(tip = %hex::encode(&tip), "genesis race lost, adopting existing chain");
        }

        Ok(Self::with_tip(store, config, tip))
    }

    /// Load an existing ledger.
    ///
    /// # Errors
    ///
    /// `NotFound` if the store holds no chain.
    pub fn open(store: Arc<S>, config: ChainConfig) -> Result<Self> {
        config.validate()?;
        let tip = store
            .view(|txn| read_tip(txn))?
            .ok_or_else(|| LedgerError::NotFound("no chain in store".to_string()))?;
        Ok(Self::with_tip(store, config, tip))
    }

    fn with_tip(store: Arc<S>, config: ChainConfig, tip: Vec<u8>) -> Self {
        Self {
            store,
            config,
            tip: RwLock::new(tip),
            append_lock: Mutex::new(()),
        }
    }

    /// Seal `transactions` into a new block on top of the current tip and
    /// persist it. Blocks until the proof-of-work is found.
    pub fn append(&self, transactions: Vec<Transaction>) -> Result<Block> {
        self.append_with_cancel(transactions, &CancelToken::new())
    }

    /// [`append`](Self::append) with a caller-controlled cancellation token.
    ///
    /// On any error the in-memory tip is left as it was, so a retry starts
    /// from a consistent state.
    pub fn append_with_cancel(
        &self,
        transactions: Vec<Transaction>,
        cancel: &CancelToken,
    ) -> Result<Block> {
        let _guard = self.append_lock.lock();
        let mut retries = 0;

        loop {
            let prev = self
                .store
                .view(|txn| read_tip(txn))?
                .ok_or_else(missing_tip)?;

            let block = Block::seal(
                transactions.clone(),
                prev,
                self.config.difficulty,
                cancel,
            )?;

            match self.commit(&block) {
                Ok(()) => {
                    *self.tip.write() = block.hash.clone();
                    info!(
                        hash = %block.hash_hex(),
                        prev = %block.prev_hash_hex(),
                        nonce = block.nonce,
                        txs = block.tx_count(),
                        "block appended"
                    );
                    return Ok(block);
                }
                Err(LedgerError::TipMoved { expected, found })
                    if retries < self.config.max_append_retries =>
                {
                    retries += 1;
                    warn!(%expected, %found, retries, "tip moved while sealing, re-sealing");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Persist `block` and move the tip to it, provided the tip is still
    /// the block's predecessor.
    ///
    /// A `Storage` error is checked against the store: if the tip already
    /// names `block`, the write landed and only a post-commit step failed.
    fn commit(&self, block: &Block) -> Result<()> {
        match self.write_block(block) {
            Err(LedgerError::Storage(reason)) => {
                match self.store.view(|txn| read_tip(txn)) {
                    Ok(Some(tip)) if tip == block.hash => {
                        warn!(
                            hash = %block.hash_hex(),
                            %reason,
                            "store reported an error after the block was committed"
                        );
                        Ok(())
                    }
                    _ => Err(LedgerError::Storage(reason)),
                }
            }
            other => other,
        }
    }

    fn write_block(&self, block: &Block) -> Result<()> {
        let encoded = block.encode()?;
        self.store.update(|txn| {
            let current = read_tip(txn)?.unwrap_or_default();
            if current != block.prev_hash {
                return Err(LedgerError::TipMoved {
                    expected: block.prev_hash_hex(),
                    found: hex::encode(&current),
                });
            }
            txn.put(&block.hash, &encoded)?;
            txn.put(TIP_KEY, &block.hash)
        })
    }

    /// Hash of the most recently appended (or loaded) block.
    ///
    /// This is the cached value; it does not consult the store. Use
    /// [`refresh`](Self::refresh) to pick up writes made by other handles.
    pub fn tip(&self) -> Vec<u8> {
        self.tip.read().clone()
    }

    /// Tip as a hex string.
    pub fn tip_hex(&self) -> String {
        hex::encode(&*self.tip.read())
    }

    /// Re-read the tip from the store into the cache and return it.
    pub fn refresh(&self) -> Result<Vec<u8>> {
        let tip = self
            .store
            .view(|txn| read_tip(txn))?
            .ok_or_else(missing_tip)?;
        *self.tip.write() = tip.clone();
        Ok(tip)
    }

    /// Look up a single block by hash.
    pub fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        if hash == TIP_KEY {
            return Ok(None);
        }
        match self.store.view(|txn| txn.get(hash))? {
            Some(bytes) => Ok(Some(Block::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Iterator over the chain from the current tip to genesis.
    pub fn iter(&self) -> ChainIterator<S> {
        ChainIterator::new(Arc::clone(&self.store), self.tip())
    }

    /// Number of blocks reachable from the tip, genesis included.
    ///
    /// Walks the whole chain.
    pub fn height(&self) -> Result<u64> {
        let mut count = 0;
        for block in self.iter() {
            block?;
            count += 1;
        }
        Ok(count)
    }

    /// Audit the whole chain: every block's hash and proof-of-work, and every
    /// link from tip to genesis.
    pub fn verify(&self) -> Result<ChainReport> {
        let tip = self.tip();
        let mut blocks = 0;
        let mut genesis = Vec::new();

        for block in self.iter() {
            let block = block?;
            block.verify(self.config.difficulty)?;
            blocks += 1;
            if block.is_genesis() {
                genesis = block.hash;
            }
        }

        debug!(blocks, "chain verified");
        Ok(ChainReport {
            blocks,
            tip: hex::encode(tip),
            genesis: hex::encode(genesis),
        })
    }

    /// Configuration this chain was opened with.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Read the tip pointer inside a transaction.
fn read_tip<T: ReadTxn + ?Sized>(txn: &T) -> Result<Option<Vec<u8>>> {
    match txn.get(TIP_KEY)? {
        Some(tip) if tip.len() != HASH_LENGTH => Err(LedgerError::MalformedBlock(format!(
            "tip pointer is {} bytes, expected {}",
            tip.len(),
            HASH_LENGTH
        ))),
        other => Ok(other),
    }
}

fn missing_tip() -> LedgerError {
    LedgerError::NotFound("tip pointer missing from store".to_string())
}

/// Outcome of a successful [`Chain::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// Blocks checked, genesis included.
    pub blocks: u64,
    /// Hex of the tip the audit started from.
    pub tip: String,
    /// Hex of the genesis block it ended at.
    pub genesis: String,
}

// ---------------------------------------------------------------------------
// ChainIterator
// ---------------------------------------------------------------------------

/// Cursor walking a chain from a snapshot of its tip back to genesis.
///
/// Each step is one store read. After the genesis block has been yielded, or
/// after any error, the iterator is exhausted for good. A walk that comes
/// back to a hash it already yielded is reported as `BrokenLink`.
#[derive(Debug)]
pub struct ChainIterator<S: KvStore> {
    store: Arc<S>,
    current: Vec<u8>,
    visited: HashSet<Vec<u8>>,
    done: bool,
}

impl<S: KvStore> ChainIterator<S> {
    /// Start a walk at `tip`.
    pub fn new(store: Arc<S>, tip: Vec<u8>) -> Self {
        let done = tip.is_empty();
        Self {
            store,
            current: tip,
            visited: HashSet::new(),
            done,
        }
    }

    /// Hash the next call will fetch. Empty once genesis has been returned.
    pub fn current_hash(&self) -> &[u8] {
        &self.current
    }

    /// Fetch the next block toward genesis.
    ///
    /// Returns `Ok(None)` when the walk is over.
    ///
    /// # Errors
    ///
    /// `NotFound` when the cursor names a hash the store does not hold,
    /// `MalformedBlock` when the stored bytes do not decode, `BrokenLink`
    /// when the block found carries a different hash than its key or the
    /// cursor returns to a block already yielded.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.done {
            return Ok(None);
        }
        if !self.visited.insert(self.current.clone()) {
            self.done = true;
            return Err(LedgerError::BrokenLink {
                key: hex::encode(&self.current),
                found: "a block already visited in this walk".to_string(),
            });
        }
        match self.fetch() {
            Ok(block) => {
                self.current = block.prev_hash.clone();
                self.done = self.current.is_empty();
                Ok(Some(block))
            }
            Err(err) => {
                self.done = true;
                Err(err)
            }
        }
    }

    fn fetch(&self) -> Result<Block> {
        let key = &self.current;
        let bytes = self
            .store
            .view(|txn| txn.get(key))?
            .ok_or_else(|| LedgerError::NotFound(format!("block {}", hex::encode(key))))?;

        let block = Block::decode(&bytes)?;
        if &block.hash != key {
            return Err(LedgerError::BrokenLink {
                key: hex::encode(key),
                found: format!("block {}", block.hash_hex()),
            });
        }
        Ok(block)
    }
}

impl<S: KvStore> Iterator for ChainIterator<S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

impl<S: KvStore> FusedIterator for ChainIterator<S> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! End-to-end integration tests for powledger.
//!
//! These tests drive the public API against the durable sled backend: create
//! a chain, append to it, close the store, reopen it, and walk the result.
//! They also tamper with the raw tree to check that corruption surfaces as an
//! error instead of a silently shortened chain.
//!
//! Each test stands alone with its own temporary directory.

use std::sync::Arc;
use std::thread;

use powledger::config::TIP_KEY;
use powledger::{
    Block, CancelToken, Chain, ChainConfig, LedgerError, SledStore, Transaction,
};

const DIFFICULTY: u32 = 8;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn config() -> ChainConfig {
    ChainConfig::with_difficulty(DIFFICULTY)
}

fn genesis_payload() -> Vec<Transaction> {
    vec![Transaction::coinbase(
        "alice",
        Some(powledger::config::GENESIS_COINBASE_MEMO),
    )]
}

fn open(path: &std::path::Path) -> Chain<SledStore> {
    let store = Arc::new(SledStore::open(path).expect("open sled"));
    Chain::open_or_create(store, genesis_payload(), config()).expect("open chain")
}

fn walk(chain: &Chain<SledStore>) -> Vec<Block> {
    chain
        .iter()
        .collect::<powledger::Result<Vec<_>>>()
        .expect("walk chain")
}

fn data_of(block: &Block) -> Vec<u8> {
    block.transactions[0].data.clone()
}

// ---------------------------------------------------------------------------
// 1. Append And Walk
// ---------------------------------------------------------------------------

#[test]
fn append_two_blocks_and_walk_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chain = open(dir.path());
    let genesis_hash = chain.tip();

    let a = chain
        .append(vec![Transaction::new("Send 1 BTC to Ivan")])
        .unwrap();
    let b = chain
        .append(vec![Transaction::new("Send 2 more BTC to Ivan")])
        .unwrap();

    let blocks = walk(&chain);
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0], b);
    assert_eq!(blocks[1], a);
    assert_eq!(blocks[2].hash, genesis_hash);
    assert!(blocks[2].is_genesis());
    assert!(blocks[2].transactions[0].is_coinbase());

    for block in &blocks {
        assert!(block.verify(DIFFICULTY).is_ok());
        assert_eq!(block.hash.len(), 32);
    }
    assert_eq!(b.prev_hash, a.hash);
    assert_eq!(a.prev_hash, genesis_hash);
}

#[test]
fn empty_payload_is_a_valid_block() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chain = open(dir.path());

    let block = chain.append(Vec::new()).unwrap();
    assert_eq!(block.tx_count(), 0);
    assert_eq!(chain.verify().unwrap().blocks, 2);
}

// ---------------------------------------------------------------------------
// 2. Persistence Across Restarts
// ---------------------------------------------------------------------------

#[test]
fn chain_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");

    let (tip, genesis_hash) = {
        let chain = open(dir.path());
        let genesis_hash = chain.tip();
        chain.append(vec![Transaction::new("first")]).unwrap();
        let last = chain.append(vec![Transaction::new("second")]).unwrap();
        (last.hash, genesis_hash)
    };

    // Same directory, fresh process state: no second genesis.
    let chain = open(dir.path());
    assert_eq!(chain.tip(), tip);

    let blocks = walk(&chain);
    assert_eq!(blocks.len(), 3);
    assert_eq!(data_of(&blocks[0]), b"second".to_vec());
    assert_eq!(data_of(&blocks[1]), b"first".to_vec());
    assert_eq!(blocks[2].hash, genesis_hash);

    let third = chain.append(vec![Transaction::new("third")]).unwrap();
    assert_eq!(third.prev_hash, tip);
}

#[test]
fn open_without_create_on_fresh_store_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SledStore::open(dir.path()).unwrap());
    assert!(matches!(
        Chain::open(store, config()),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn store_holds_blocks_plus_tip_pointer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chain = open(dir.path());
    chain.append(vec![Transaction::new("x")]).unwrap();
    chain.append(vec![Transaction::new("y")]).unwrap();

    let store = chain.store();
    assert_eq!(store.len(), 4);
    let tip = store.tree().get(TIP_KEY).unwrap().unwrap();
    assert_eq!(&tip[..], chain.tip().as_slice());
}

// ---------------------------------------------------------------------------
// 3. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn two_handles_on_one_store_stay_linear() {
    let store = Arc::new(SledStore::open_temporary().unwrap());
    let first = Arc::new(
        Chain::open_or_create(Arc::clone(&store), genesis_payload(), config()).unwrap(),
    );
    let second = Arc::new(Chain::open(Arc::clone(&store), config()).unwrap());

    let handles: Vec<_> = [first.clone(), second.clone()]
        .into_iter()
        .enumerate()
        .map(|(n, chain)| {
            thread::spawn(move || {
                for i in 0..5 {
                    chain
                        .append(vec![Transaction::new(format!("handle{n}-{i}"))])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("appender should not panic");
    }

    first.refresh().unwrap();
    let blocks: Vec<Block> = first.iter().collect::<powledger::Result<_>>().unwrap();
    assert_eq!(blocks.len(), 11);
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].prev_hash, pair[1].hash);
    }
    assert_eq!(first.verify().unwrap().blocks, 11);
}

#[test]
fn cancelled_append_leaves_store_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chain = open(dir.path());
    let before = chain.tip();
    let keys = chain.store().len();

    let token = CancelToken::new();
    token.cancel();
    let err = chain
        .append_with_cancel(vec![Transaction::new("never")], &token)
        .unwrap_err();

    assert!(matches!(err, LedgerError::Cancelled));
    assert_eq!(chain.tip(), before);
    assert_eq!(chain.store().len(), keys);
}

// ---------------------------------------------------------------------------
// 4. Corruption
// ---------------------------------------------------------------------------

#[test]
fn truncated_block_stops_the_walk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chain = open(dir.path());
    let a = chain.append(vec![Transaction::new("a")]).unwrap();
    chain.append(vec![Transaction::new("b")]).unwrap();

    let tree = chain.store().tree();
    let bytes = tree.get(&a.hash).unwrap().unwrap();
    tree.insert(&a.hash, &bytes[..bytes.len() - 3]).unwrap();

    let mut iter = chain.iter();
    assert!(iter.next().unwrap().is_ok());
    assert!(matches!(
        iter.next(),
        Some(Err(LedgerError::MalformedBlock(_)))
    ));
    assert!(iter.next().is_none());
}

#[test]
fn missing_predecessor_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chain = open(dir.path());
    let genesis_hash = chain.tip();
    chain.append(vec![Transaction::new("a")]).unwrap();

    chain.store().tree().remove(&genesis_hash).unwrap();

    let results: Vec<_> = chain.iter().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(LedgerError::NotFound(_))));
}

#[test]
fn verify_catches_rewritten_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chain = open(dir.path());
    let mut a = chain.append(vec![Transaction::new("pay bob 5")]).unwrap();
    chain.append(vec![Transaction::new("pay carol 1")]).unwrap();
    assert!(chain.verify().is_ok());

    a.transactions = vec![Transaction::new("pay mallory 5")];
    chain
        .store()
        .tree()
        .insert(&a.hash, a.encode().unwrap())
        .unwrap();

    assert!(matches!(
        chain.verify(),
        Err(LedgerError::HashMismatch { .. })
    ));
}

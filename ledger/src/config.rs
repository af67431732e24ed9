//! # Ledger Configuration & Constants
//!
//! Every magic number the ledger engine depends on lives here. The on-disk
//! key layout and the hash preimage both depend on these values, so changing
//! any of them after a store has been populated makes the existing blocks
//! unreadable or unverifiable.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

// ---------------------------------------------------------------------------
// Proof-of-Work
// ---------------------------------------------------------------------------

/// Default number of leading zero bits a block hash must have.
///
/// 16 bits means ~65k attempts on average, which seals in well under a
/// second on commodity hardware.
pub const DEFAULT_DIFFICULTY: u32 = 16;

/// Largest accepted difficulty. The target is `2^(256 - difficulty)`, so 256
/// would make the target 1 and only the all-zero digest would qualify.
pub const MAX_DIFFICULTY: u32 = 255;

/// How many nonces the search tries between two looks at the cancel token.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Output length of the block hash function (SHA-256).
pub const HASH_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Storage Layout
// ---------------------------------------------------------------------------

/// Reserved key holding the hash of the current tip block. Every other key in
/// the blocks keyspace is a block hash.
pub const TIP_KEY: &[u8] = b"l";

/// Name of the sled tree that holds blocks and the tip pointer.
pub const BLOCKS_TREE: &str = "blocks";

// ---------------------------------------------------------------------------
// Chain Behaviour
// ---------------------------------------------------------------------------

/// How many times `append` re-seals after losing a race for the tip.
pub const DEFAULT_MAX_APPEND_RETRIES: u32 = 8;

/// Memo placed in the coinbase record of a freshly created genesis block.
pub const GENESIS_COINBASE_MEMO: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";

// ---------------------------------------------------------------------------
// ChainConfig
// ---------------------------------------------------------------------------

/// Runtime knobs for a [`Chain`](crate::chain::Chain).
///
/// Difficulty is fixed for the lifetime of a store: blocks sealed under one
/// difficulty will fail verification under another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    /// Required leading zero bits of every block hash.
    pub difficulty: u32,
    /// Re-seal attempts when another writer moves the tip mid-append.
    pub max_append_retries: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_append_retries: DEFAULT_MAX_APPEND_RETRIES,
        }
    }
}

impl ChainConfig {
    /// Config with the given difficulty and default everything else.
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Reject values the proof-of-work cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::InvalidConfig(format!(
                "difficulty must be in 1..={}, got {}",
                MAX_DIFFICULTY, self.difficulty
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ChainConfig::default();
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(config.max_append_retries, DEFAULT_MAX_APPEND_RETRIES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_difficulty_rejected() {
        let err = ChainConfig::with_difficulty(0).validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn difficulty_above_max_rejected() {
        assert!(ChainConfig::with_difficulty(MAX_DIFFICULTY).validate().is_ok());
        assert!(ChainConfig::with_difficulty(MAX_DIFFICULTY + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn tip_key_cannot_collide_with_a_block_hash() {
        // Block keys are always HASH_LENGTH bytes long.
        assert_ne!(TIP_KEY.len(), HASH_LENGTH);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ChainConfig = serde_json::from_str(r#"{"difficulty": 4}"#).unwrap();
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.max_append_retries, DEFAULT_MAX_APPEND_RETRIES);
    }

    #[test]
    fn misspelled_key_rejected() {
        assert!(serde_json::from_str::<ChainConfig>(r#"{"dificulty": 4}"#).is_err());
    }
}

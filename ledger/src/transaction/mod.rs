//! # Transaction Records
//!
//! The payload a block carries. The ledger engine does not interpret
//! transactions: it hashes them, stores them, and hands them back in the
//! order they were given. Ownership, signatures and spendability belong to
//! whatever sits on top of the ledger.
//!
//! A record is an opaque byte string plus a kind tag. Its ID is the SHA-256
//! of `kind || data`, so two records with the same bytes but different kinds
//! never share an ID.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha256_multi;

/// What a record represents. Only used for display and ID separation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Reward record with no inputs; seeds the genesis block.
    Coinbase,
    /// Arbitrary application data.
    Data,
}

impl TransactionKind {
    fn tag(self) -> &'static [u8] {
        match self {
            TransactionKind::Coinbase => b"coinbase",
            TransactionKind::Data => b"data",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Coinbase => write!(f, "coinbase"),
            TransactionKind::Data => write!(f, "data"),
        }
    }
}

/// One opaque record inside a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256 of `kind || data`.
    pub id: [u8; 32],
    /// Record kind.
    pub kind: TransactionKind,
    /// Opaque application bytes.
    pub data: Vec<u8>,
}

impl Transaction {
    /// Wrap application bytes into a data record.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self::with_kind(TransactionKind::Data, data.into())
    }

    /// Build a coinbase record rewarding `recipient`.
    ///
    /// When `memo` is `None` the record text defaults to
    /// `Reward to '<recipient>'`.
    pub fn coinbase(recipient: &str, memo: Option<&str>) -> Self {
        let text = match memo {
            Some(memo) => format!("Reward to '{recipient}': {memo}"),
            None => format!("Reward to '{recipient}'"),
        };
        Self::with_kind(TransactionKind::Coinbase, text.into_bytes())
    }

    fn with_kind(kind: TransactionKind, data: Vec<u8>) -> Self {
        let id = sha256_multi(&[kind.tag(), &data]);
        Self { id, kind, data }
    }

    /// Transaction ID as a hex string.
    pub fn id_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Whether this is a coinbase record.
    pub fn is_coinbase(&self) -> bool {
        self.kind == TransactionKind::Coinbase
    }

    /// Human-readable one-liner, for display only.
    ///
    /// UTF-8 payloads are shown as text; anything else as hex.
    pub fn describe(&self) -> String {
        let body = match std::str::from_utf8(&self.data) {
            Ok(text) => format!("{text:?}"),
            Err(_) => format!("0x{}", hex::encode(&self.data)),
        };
        format!("{} {} {}", self.kind, self.id_hex(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        assert_eq!(Transaction::new("a").id, Transaction::new("a").id);
        assert_ne!(Transaction::new("a").id, Transaction::new("b").id);
    }

    #[test]
    fn kind_separates_ids() {
        let data = Transaction::new("Reward to 'alice'");
        let coinbase = Transaction::coinbase("alice", None);
        assert_eq!(data.data, coinbase.data);
        assert_ne!(data.id, coinbase.id);
        assert!(coinbase.is_coinbase());
        assert!(!data.is_coinbase());
    }

    #[test]
    fn coinbase_memo_is_included() {
        let tx = Transaction::coinbase("bob", Some("hello"));
        assert_eq!(tx.data, b"Reward to 'bob': hello".to_vec());
    }

    #[test]
    fn describe_text_and_binary() {
        let text = Transaction::new("send 5");
        assert!(text.describe().starts_with("data "));
        assert!(text.describe().ends_with("\"send 5\""));

        let binary = Transaction::new(vec![0xff, 0x00]);
        assert!(binary.describe().ends_with("0xff00"));
    }
}

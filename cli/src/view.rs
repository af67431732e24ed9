//! JSON shapes for `print-chain --json`.
//!
//! Hashes are hex, timestamps RFC 3339, and record data is text when it is
//! valid UTF-8 and hex otherwise.

use serde::Serialize;

use powledger::{Block, Transaction};

#[derive(Debug, Serialize)]
pub struct ChainView {
    pub tip: String,
    pub height: usize,
    pub blocks: Vec<BlockView>,
}

#[derive(Debug, Serialize)]
pub struct BlockView {
    pub hash: String,
    pub prev_hash: Option<String>,
    pub nonce: u64,
    pub timestamp: i64,
    pub time: Option<String>,
    pub transactions: Vec<TransactionView>,
}

#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
}

impl From<&Block> for BlockView {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.hash_hex(),
            prev_hash: (!block.is_genesis()).then(|| block.prev_hash_hex()),
            nonce: block.nonce,
            timestamp: block.timestamp,
            time: chrono::DateTime::from_timestamp(block.timestamp, 0).map(|t| t.to_rfc3339()),
            transactions: block.transactions.iter().map(TransactionView::from).collect(),
        }
    }
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        let (text, hex) = match std::str::from_utf8(&tx.data) {
            Ok(text) => (Some(text.to_string()), None),
            Err(_) => (None, Some(hex::encode(&tx.data))),
        };
        Self {
            id: tx.id_hex(),
            kind: tx.kind.to_string(),
            text,
            hex,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powledger::CancelToken;

    #[test]
    fn genesis_has_no_prev_hash() {
        let block = Block::seal_genesis(
            vec![Transaction::coinbase("alice", None)],
            4,
            &CancelToken::new(),
        )
        .unwrap();
        let view = BlockView::from(&block);
        assert!(view.prev_hash.is_none());
        assert_eq!(view.transactions[0].kind, "coinbase");
        assert_eq!(view.transactions[0].text.as_deref(), Some("Reward to 'alice'"));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["prev_hash"].is_null());
        assert_eq!(json["hash"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn binary_data_rendered_as_hex() {
        let view = TransactionView::from(&Transaction::new(vec![0xff, 0x00]));
        assert_eq!(view.hex.as_deref(), Some("ff00"));
        assert!(view.text.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("text").is_none());
    }
}

//! In-memory mirror of the audit chain for fast reads.
//!
//! Blocks are re-derivable from the durable log; the mirror is never the
//! source of truth.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::hashing::{canonical_encode, sha256_hex};

const GENESIS_DATA: &str = "Genesis Block - Clinical Assessment Ledger";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
    pub previous_hash: String,
    pub hash: String,
}

impl Block {
    fn new(index: u64, data: serde_json::Value, previous_hash: String) -> Self {
        let mut block = Self {
            index,
            timestamp: Utc::now(),
            data,
            previous_hash,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    pub fn calculate_hash(&self) -> String {
        let index = self.index.to_string();
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let data = self.data.to_string();
        sha256_hex(&canonical_encode(&[
            &index,
            &timestamp,
            &data,
            &self.previous_hash,
        ]))
    }
}

#[derive(Debug)]
pub struct LedgerMirror {
    blocks: RwLock<Vec<Block>>,
}

impl Default for LedgerMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerMirror {
    pub fn new() -> Self {
        let genesis = Block::new(0, serde_json::Value::from(GENESIS_DATA), "0".to_string());
        Self {
            blocks: RwLock::new(vec![genesis]),
        }
    }

    pub fn add_block(&self, data: serde_json::Value) -> Block {
        let mut blocks = self.blocks.write();
        let (index, previous_hash) = blocks
            .last()
            .map(|last| (last.index + 1, last.hash.clone()))
            .unwrap_or_else(|| (0, "0".to_string()));
        let block = Block::new(index, data, previous_hash);
        blocks.push(block.clone());
        block
    }

    /// Every block links to its predecessor and hashes to its stored hash
    pub fn is_valid(&self) -> bool {
        let blocks = self.blocks.read();
        blocks.iter().enumerate().all(|(i, block)| {
            block.hash == block.calculate_hash()
                && (i == 0 || block.previous_hash == blocks[i - 1].hash)
        })
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&self, index: usize, data: serde_json::Value) {
        if let Some(block) = self.blocks.write().get_mut(index) {
            block.data = data;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_starts_with_genesis() {
        let mirror = LedgerMirror::new();
        assert_eq!(mirror.len(), 1);
        let genesis = &mirror.blocks()[0];
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert!(mirror.is_valid());
    }

    #[test]
    fn test_blocks_link() {
        let mirror = LedgerMirror::new();
        let first = mirror.add_block(json!({"event_type": "AI_PREDICTION"}));
        let second = mirror.add_block(json!({"event_type": "DOCTOR_FEEDBACK"}));
        assert_eq!(second.index, 2);
        assert_eq!(second.previous_hash, first.hash);
        assert!(mirror.is_valid());
    }

    #[test]
    fn test_edited_block_invalidates_mirror() {
        let mirror = LedgerMirror::new();
        mirror.add_block(json!({"n": 1}));
        mirror.add_block(json!({"n": 2}));
        mirror.corrupt(1, json!({"n": 99}));
        assert!(!mirror.is_valid());
    }
}

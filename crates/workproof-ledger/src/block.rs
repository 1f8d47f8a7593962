use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use workproof_types::{Result, WorkproofError};

/// One sealed unit of the reward ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix seconds.
    pub timestamp: i64,
    pub nonce: u64,
    /// Empty for the genesis block.
    pub previous_hash: String,
    pub miner: String,
    pub value: f64,
    pub hash: String,
    /// False when the nonce search was exhausted and the block was accepted anyway.
    pub sealed: bool,
}

impl Block {
    /// Unsealed candidate with nonce 0 and no hash yet.
    pub fn candidate(
        index: u64,
        timestamp: i64,
        previous_hash: impl Into<String>,
        miner: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            index,
            timestamp,
            nonce: 0,
            previous_hash: previous_hash.into(),
            miner: miner.into(),
            value,
            hash: String::new(),
            sealed: false,
        }
    }

    /// Canonical serialization: fields concatenated without separators, value with six decimals.
    pub fn hash_preimage(&self) -> String {
        format!(
            "{}{}{}{}{}{:.6}",
            self.index, self.timestamp, self.nonce, self.previous_hash, self.miner, self.value
        )
    }

    pub fn compute_hash(&self) -> String {
        format!("{:x}", Sha256::digest(self.hash_preimage().as_bytes()))
    }
}

/// True when `hash` starts with at least `difficulty` '0' characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Check a whole chain: gapless indices, genesis link, recomputed hashes,
/// predecessor links, and difficulty on every block that claims to be sealed.
pub fn verify_chain(blocks: &[Block], difficulty: usize) -> Result<()> {
    for (i, block) in blocks.iter().enumerate() {
        if block.index != i as u64 {
            return Err(WorkproofError::ChainIntegrity(format!(
                "block at position {i} has index {}",
                block.index
            )));
        }

        let expected_previous = if i == 0 { "" } else { blocks[i - 1].hash.as_str() };
        if block.previous_hash != expected_previous {
            return Err(WorkproofError::ChainIntegrity(format!(
                "block {i} does not link to its predecessor"
            )));
        }

        if block.compute_hash() != block.hash {
            return Err(WorkproofError::ChainIntegrity(format!(
                "block {i} hash does not match its contents"
            )));
        }

        if block.sealed && !meets_difficulty(&block.hash, difficulty) {
            return Err(WorkproofError::ChainIntegrity(format!(
                "block {i} is marked sealed but misses difficulty {difficulty}"
            )));
        }
    }
    Ok(())
}

use serde::{Deserialize, Serialize};

use workproof_types::{Result, WorkproofError};

use crate::block::{Block, meets_difficulty};

/// What to do when the nonce search hits its attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Append the last computed hash with `sealed = false`. Favors liveness.
    #[default]
    AcceptUnsealed,
    /// Append nothing and return `SealExhausted`.
    Reject,
}

/// Parameters of the bounded proof-of-work search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealPolicy {
    /// Required leading '0' hex characters.
    pub difficulty: usize,
    pub max_attempts: u64,
    pub on_exhaustion: ExhaustionPolicy,
}

impl Default for SealPolicy {
    fn default() -> Self {
        Self {
            difficulty: 4,
            max_attempts: 100_000,
            on_exhaustion: ExhaustionPolicy::AcceptUnsealed,
        }
    }
}

/// Outcome of one sealing run.
#[derive(Debug, Clone)]
pub struct SealReport {
    pub block: Block,
    pub attempts: u64,
}

impl SealReport {
    pub fn exhausted(&self) -> bool {
        !self.block.sealed
    }
}

/// Search nonces 0, 1, 2, ... until the hash meets the policy difficulty
/// or the attempt cap is reached.
pub fn seal(mut block: Block, policy: &SealPolicy) -> Result<SealReport> {
    let cap = policy.max_attempts.max(1);

    for nonce in 0..cap {
        block.nonce = nonce;
        block.hash = block.compute_hash();
        if meets_difficulty(&block.hash, policy.difficulty) {
            block.sealed = true;
            return Ok(SealReport {
                block,
                attempts: nonce + 1,
            });
        }
    }

    match policy.on_exhaustion {
        ExhaustionPolicy::AcceptUnsealed => {
            block.sealed = false;
            Ok(SealReport {
                block,
                attempts: cap,
            })
        }
        ExhaustionPolicy::Reject => Err(WorkproofError::SealExhausted {
            index: block.index,
            attempts: cap,
        }),
    }
}

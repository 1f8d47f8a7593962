use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Combined proof over a window of recent records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub count: usize,
    /// Most recent first.
    pub proof_hashes: Vec<String>,
    /// SHA-256 hex over the concatenated proof hashes, no separator.
    pub combined_hash: String,
}

impl Attestation {
    pub fn from_hashes(proof_hashes: Vec<String>) -> Self {
        let mut hasher = Sha256::new();
        for hash in &proof_hashes {
            hasher.update(hash.as_bytes());
        }
        Self {
            count: proof_hashes.len(),
            combined_hash: format!("{:x}", hasher.finalize()),
            proof_hashes,
        }
    }
}

//! Block hashing and proof-of-work

use crate::ledger::BlockData;
use sha2::{Digest, Sha256};
use tracing::debug;

pub const DEFAULT_PREFIX: &str = "00";

/// `hex(sha256(prev_hash + nonce + JSON(block_data)))`
pub fn hash_block(prev_hash: &str, block_data: &BlockData, nonce: u64) -> String {
    let data_str = serde_json::to_string(block_data).unwrap_or_default();
    let input = format!("{}{}{}", prev_hash, nonce, data_str);
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

/// Linear nonce search for a hash that starts with `prefix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfWork {
    prefix: String,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        ProofOfWork {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl ProofOfWork {
    /// Callers are expected to pass a short string of lowercase hex digits;
    /// anything else can never match and the search would not return.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        ProofOfWork {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn meets_target(&self, hash: &str) -> bool {
        hash.starts_with(&self.prefix)
    }

    /// Smallest nonce whose block hash meets the target. Unbounded.
    pub fn search(&self, prev_hash: &str, block_data: &BlockData) -> u64 {
        let mut nonce = 0u64;
        let mut hash = hash_block(prev_hash, block_data, nonce);
        while !self.meets_target(&hash) {
            nonce += 1;
            hash = hash_block(prev_hash, block_data, nonce);
        }
        debug!(
            block_index = block_data.index,
            nonce,
            hash = %hash,
            "Proof of work found"
        );
        nonce
    }
}

//! In-process toy ledger: sales batched into proof-of-work blocks.
//!
//! - `chain.rs` - the `Blockchain` itself
//! - `pow.rs` - block hashing and the nonce search
//! - `summary.rs` - per-seller and overall aggregates
//! - `validator.rs` - sale field validation
//! - `store.rs` - SQLite persistence for blocks and sellers

pub mod chain;
pub mod pow;
pub mod store;
pub mod summary;
pub mod validator;

pub use chain::Blockchain;
pub use pow::{hash_block, ProofOfWork};
pub use store::LedgerStore;
pub use summary::{SalesSummary, SellerStats};
pub use validator::SaleValidator;

use serde::{Deserialize, Serialize};

/// A single cocoa sale.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub sale_id: u64,
    pub seller_id: String,
    pub buyer_name: String,
    pub quantity_kg: u64,
    /// Price per kilogram.
    pub price: u64,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl Sale {
    /// `price * quantity_kg`, widened so it cannot overflow.
    pub fn revenue(&self) -> u128 {
        self.price as u128 * self.quantity_kg as u128
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: i64,
    pub sales: Vec<Sale>,
    pub nonce: u64,
    pub hash: String,
    pub previous_block_hash: String,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// The payload that was hashed when this block was mined.
    pub fn data(&self) -> BlockData {
        BlockData {
            index: self.index,
            sales: self.sales.clone(),
        }
    }
}

/// What goes into the proof-of-work hash besides the previous hash and nonce.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    pub index: u64,
    pub sales: Vec<Sale>,
}

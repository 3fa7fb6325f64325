//! Sales contract abstraction
//!
//! The REST service never touches ledger state directly. Everything goes
//! through `SalesContract`, the same surface an externally deployed sales
//! contract exposes: seller registration, sale recording and read-only
//! aggregates.
//!
//! - `seller_id.rs` - wallet address to seller id derivation
//! - `ledger_contract.rs` - implementation backed by the in-process ledger

pub mod ledger_contract;
pub mod seller_id;

pub use ledger_contract::{ContractOptions, LedgerContract};
pub use seller_id::generate_seller_id;

use crate::error::LedgerResult;
use crate::ledger::{Block, Sale};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Aggregates the contract keeps per registered seller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SellerRecord {
    pub seller_id: String,
    pub wallet_address: String,
    pub total_sales: u64,
    pub total_quantity: u64,
    pub total_revenue: u128,
}

impl SellerRecord {
    pub fn new(seller_id: impl Into<String>, wallet_address: impl Into<String>) -> Self {
        SellerRecord {
            seller_id: seller_id.into(),
            wallet_address: wallet_address.into(),
            total_sales: 0,
            total_quantity: 0,
            total_revenue: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub seller_id: String,
    pub wallet_address: String,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleReceipt {
    pub transaction_hash: String,
    pub sale_id: u64,
    pub block_index: u64,
}

#[async_trait]
pub trait SalesContract: Send + Sync {
    /// Registers `wallet` and returns the seller id derived from it.
    async fn register_seller(&self, wallet: &str) -> LedgerResult<Registration>;

    async fn is_seller_registered(&self, seller_id: &str) -> LedgerResult<bool>;

    /// Records a sale for a registered seller. Multiple sales per seller are allowed.
    async fn record_sale(
        &self,
        seller_id: &str,
        buyer_name: &str,
        quantity_kg: u64,
        price: u64,
    ) -> LedgerResult<SaleReceipt>;

    async fn sales_count(&self) -> LedgerResult<u64>;

    /// Sale by its position in recording order.
    async fn sale(&self, index: u64) -> LedgerResult<Sale>;

    async fn all_sales(&self) -> LedgerResult<Vec<Sale>> {
        let count = self.sales_count().await?;
        let mut sales = Vec::with_capacity(count as usize);
        for i in 0..count {
            sales.push(self.sale(i).await?);
        }
        Ok(sales)
    }

    async fn sellers_count(&self) -> LedgerResult<u64>;

    async fn total_cocoa_sold(&self) -> LedgerResult<u64>;

    async fn seller_details(&self, seller_id: &str) -> LedgerResult<SellerRecord>;

    async fn seller_sales(&self, seller_id: &str) -> LedgerResult<Vec<Sale>>;

    /// Number of blocks, genesis included.
    async fn chain_height(&self) -> LedgerResult<u64>;

    /// Newest first.
    async fn latest_blocks(&self, limit: usize) -> LedgerResult<Vec<Block>>;

    async fn verify_chain(&self) -> LedgerResult<()>;

    fn address(&self) -> &str;

    /// Wallet registered when a caller does not name one.
    fn operator_wallet(&self) -> &str;
}

use crate::contract::seller_id::generate_seller_id;
use crate::contract::{Registration, SaleReceipt, SalesContract, SellerRecord};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::chain::DEFAULT_NODE_URL;
use crate::ledger::{Block, BlockData, Blockchain, LedgerStore, ProofOfWork, Sale};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";
pub const DEFAULT_OPERATOR_WALLET: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

#[derive(Debug, Clone)]
pub struct ContractOptions {
    pub address: String,
    pub operator_wallet: String,
    pub node_url: String,
    pub proof_of_work: ProofOfWork,
}

impl Default for ContractOptions {
    fn default() -> Self {
        ContractOptions {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            operator_wallet: DEFAULT_OPERATOR_WALLET.to_string(),
            node_url: DEFAULT_NODE_URL.to_string(),
            proof_of_work: ProofOfWork::default(),
        }
    }
}

struct ContractState {
    chain: Blockchain,
    sellers: HashMap<String, SellerRecord>,
    total_cocoa_sold: u64,
}

impl ContractState {
    fn sealed_sales(&self) -> impl Iterator<Item = &Sale> {
        self.chain.blocks().iter().flat_map(|b| b.sales.iter())
    }

    /// Seller and global totals after applying `sale`, without committing them.
    fn totals_after(&self, sale: &Sale) -> LedgerResult<(SellerRecord, u64)> {
        let mut seller = self
            .sellers
            .get(&sale.seller_id)
            .cloned()
            .ok_or_else(|| LedgerError::SellerNotRegistered(sale.seller_id.clone()))?;

        seller.total_sales += 1;
        seller.total_quantity = seller
            .total_quantity
            .checked_add(sale.quantity_kg)
            .ok_or(LedgerError::Overflow("seller quantity"))?;
        seller.total_revenue = seller
            .total_revenue
            .checked_add(sale.revenue())
            .ok_or(LedgerError::Overflow("seller revenue"))?;
        let total = self
            .total_cocoa_sold
            .checked_add(sale.quantity_kg)
            .ok_or(LedgerError::Overflow("total cocoa sold"))?;
        Ok((seller, total))
    }
}

/// `SalesContract` backed by the proof-of-work ledger. Every recorded sale is
/// sealed into its own block before the call returns.
pub struct LedgerContract {
    state: Arc<RwLock<ContractState>>,
    // Serializes writers so only one block is mined against a given tip.
    sequencer: tokio::sync::Mutex<()>,
    store: Option<LedgerStore>,
    address: String,
    operator_wallet: String,
}

impl LedgerContract {
    /// In-memory contract; state is lost when the process exits.
    pub fn new(options: ContractOptions) -> Self {
        let chain = Blockchain::new(Some(options.node_url.clone()))
            .with_proof_of_work(options.proof_of_work.clone());
        Self::from_parts(options, chain, HashMap::new(), 0, None)
    }

    /// Contract that persists to `store`, resuming whatever it already holds.
    pub fn open(options: ContractOptions, store: LedgerStore) -> LedgerResult<Self> {
        let blocks = store.load_blocks()?;
        let chain = Blockchain::from_blocks(
            blocks,
            Some(options.node_url.clone()),
            options.proof_of_work.clone(),
        )?;
        if store.block_count()? == 0 {
            store.save_block(chain.last_block())?;
        }

        let mut sellers: HashMap<String, SellerRecord> = store
            .load_sellers()?
            .into_iter()
            .map(|s| (s.seller_id.clone(), s))
            .collect();

        let mut total_cocoa_sold = 0u64;
        for sale in chain.blocks().iter().flat_map(|b| b.sales.iter()) {
            match sellers.get_mut(&sale.seller_id) {
                Some(seller) => {
                    seller.total_sales += 1;
                    seller.total_quantity = seller.total_quantity.saturating_add(sale.quantity_kg);
                    seller.total_revenue = seller.total_revenue.saturating_add(sale.revenue());
                }
                None => warn!(
                    seller_id = %sale.seller_id,
                    sale_id = sale.sale_id,
                    "Stored sale references an unregistered seller"
                ),
            }
            total_cocoa_sold = total_cocoa_sold.saturating_add(sale.quantity_kg);
        }

        info!(
            blocks = chain.len(),
            sellers = sellers.len(),
            "Contract state restored from store"
        );
        Ok(Self::from_parts(
            options,
            chain,
            sellers,
            total_cocoa_sold,
            Some(store),
        ))
    }

    fn from_parts(
        options: ContractOptions,
        chain: Blockchain,
        sellers: HashMap<String, SellerRecord>,
        total_cocoa_sold: u64,
        store: Option<LedgerStore>,
    ) -> Self {
        LedgerContract {
            state: Arc::new(RwLock::new(ContractState {
                chain,
                sellers,
                total_cocoa_sold,
            })),
            sequencer: tokio::sync::Mutex::new(()),
            store,
            address: options.address,
            operator_wallet: options.operator_wallet,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    pub fn proof_of_work_prefix(&self) -> String {
        self.state.read().chain.proof_of_work_target().prefix().to_string()
    }
}

fn registration_hash(wallet: &str, seller_id: &str, timestamp: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("register:{}:{}:{}", wallet, seller_id, timestamp));
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl SalesContract for LedgerContract {
    async fn register_seller(&self, wallet: &str) -> LedgerResult<Registration> {
        let seller_id = generate_seller_id(wallet)?;
        let _guard = self.sequencer.lock().await;

        if self.state.read().sellers.contains_key(&seller_id) {
            return Err(LedgerError::SellerAlreadyRegistered(seller_id));
        }

        let record = SellerRecord::new(seller_id.clone(), wallet);
        let registered_at = Utc::now().timestamp_millis();
        if let Some(store) = &self.store {
            store.save_seller(&record, registered_at)?;
        }
        self.state.write().sellers.insert(seller_id.clone(), record);

        info!(seller_id = %seller_id, wallet = %wallet, "Seller registered");
        Ok(Registration {
            transaction_hash: registration_hash(wallet, &seller_id, registered_at),
            seller_id,
            wallet_address: wallet.to_string(),
        })
    }

    async fn is_seller_registered(&self, seller_id: &str) -> LedgerResult<bool> {
        Ok(self.state.read().sellers.contains_key(seller_id))
    }

    async fn record_sale(
        &self,
        seller_id: &str,
        buyer_name: &str,
        quantity_kg: u64,
        price: u64,
    ) -> LedgerResult<SaleReceipt> {
        let _guard = self.sequencer.lock().await;

        let (previous_hash, data, pow) = {
            let state = self.state.read();
            if !state.sellers.contains_key(seller_id) {
                return Err(LedgerError::SellerNotRegistered(seller_id.to_string()));
            }
            let sale = state
                .chain
                .create_sale(seller_id, buyer_name, quantity_kg, price)?;
            state.totals_after(&sale)?;
            let data = BlockData {
                index: state.chain.last_block().index + 1,
                sales: vec![sale],
            };
            (
                state.chain.last_block().hash.clone(),
                data,
                state.chain.proof_of_work_target().clone(),
            )
        };

        let search_data = data.clone();
        let nonce = tokio::task::spawn_blocking(move || pow.search(&previous_hash, &search_data))
            .await
            .map_err(|e| LedgerError::Mining(e.to_string()))?;

        let block = self.state.read().chain.prepare_block(data, nonce)?;
        if let Some(store) = &self.store {
            store.save_block(&block)?;
        }

        let mut state = self.state.write();
        let sale = block.sales[0].clone();
        let (seller, total) = state.totals_after(&sale)?;
        let block = state.chain.append_block(block)?;
        let receipt = SaleReceipt {
            transaction_hash: block.hash.clone(),
            sale_id: sale.sale_id,
            block_index: block.index,
        };
        state.sellers.insert(seller.seller_id.clone(), seller);
        state.total_cocoa_sold = total;

        info!(
            seller_id = %sale.seller_id,
            sale_id = sale.sale_id,
            block_index = receipt.block_index,
            quantity_kg = sale.quantity_kg,
            "Sale recorded"
        );
        Ok(receipt)
    }

    async fn sales_count(&self) -> LedgerResult<u64> {
        Ok(self.state.read().sealed_sales().count() as u64)
    }

    async fn sale(&self, index: u64) -> LedgerResult<Sale> {
        self.state
            .read()
            .sealed_sales()
            .nth(index as usize)
            .cloned()
            .ok_or(LedgerError::SaleNotFound(index))
    }

    async fn all_sales(&self) -> LedgerResult<Vec<Sale>> {
        Ok(self.state.read().chain.all_sales())
    }

    async fn sellers_count(&self) -> LedgerResult<u64> {
        Ok(self.state.read().sellers.len() as u64)
    }

    async fn total_cocoa_sold(&self) -> LedgerResult<u64> {
        Ok(self.state.read().total_cocoa_sold)
    }

    async fn seller_details(&self, seller_id: &str) -> LedgerResult<SellerRecord> {
        self.state
            .read()
            .sellers
            .get(seller_id)
            .cloned()
            .ok_or_else(|| LedgerError::SellerNotFound(seller_id.to_string()))
    }

    async fn seller_sales(&self, seller_id: &str) -> LedgerResult<Vec<Sale>> {
        Ok(self.state.read().chain.seller_sales(seller_id))
    }

    async fn chain_height(&self) -> LedgerResult<u64> {
        Ok(self.state.read().chain.len() as u64)
    }

    async fn latest_blocks(&self, limit: usize) -> LedgerResult<Vec<Block>> {
        Ok(self
            .state
            .read()
            .chain
            .blocks()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn verify_chain(&self) -> LedgerResult<()> {
        self.state.read().chain.verify_chain()
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn operator_wallet(&self) -> &str {
        &self.operator_wallet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET_A: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const WALLET_B: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn init() {
        crate::logger::init_test_logger();
    }

    #[tokio::test]
    async fn test_register_seller() {
        init();
        let contract = LedgerContract::new(ContractOptions::default());
        let reg = contract.register_seller(WALLET_A).await.unwrap();

        assert_eq!(reg.seller_id, "SEL3f65ad8");
        assert_eq!(reg.wallet_address, WALLET_A);
        assert_eq!(reg.transaction_hash.len(), 64);
        assert!(contract.is_seller_registered("SEL3f65ad8").await.unwrap());
        assert_eq!(contract.sellers_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_twice_fails() {
        init();
        let contract = LedgerContract::new(ContractOptions::default());
        contract.register_seller(WALLET_A).await.unwrap();
        let err = contract.register_seller(WALLET_A).await.unwrap_err();
        assert!(matches!(err, LedgerError::SellerAlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_register_invalid_wallet() {
        init();
        let contract = LedgerContract::new(ContractOptions::default());
        let err = contract.register_seller("not-a-wallet").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidWallet(_)));
    }

    #[tokio::test]
    async fn test_record_sale_requires_registration() {
        init();
        let contract = LedgerContract::new(ContractOptions::default());
        let err = contract
            .record_sale("SEL3f65ad8", "Buyer", 10, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SellerNotRegistered(_)));
        assert_eq!(contract.chain_height().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_sale_mines_block_and_updates_totals() {
        init();
        let contract = LedgerContract::new(ContractOptions::default());
        let reg = contract.register_seller(WALLET_A).await.unwrap();

        let first = contract
            .record_sale(&reg.seller_id, "Kumasi Co", 100, 3)
            .await
            .unwrap();
        let second = contract
            .record_sale(&reg.seller_id, "Tema Ltd", 20, 5)
            .await
            .unwrap();

        assert_eq!(first.sale_id, 0);
        assert_eq!(first.block_index, 1);
        assert_eq!(second.sale_id, 1);
        assert_eq!(second.block_index, 2);
        assert!(first.transaction_hash.starts_with("00"));

        let seller = contract.seller_details(&reg.seller_id).await.unwrap();
        assert_eq!(seller.total_sales, 2);
        assert_eq!(seller.total_quantity, 120);
        assert_eq!(seller.total_revenue, 400);

        assert_eq!(contract.sales_count().await.unwrap(), 2);
        assert_eq!(contract.total_cocoa_sold().await.unwrap(), 120);
        assert_eq!(contract.sale(1).await.unwrap().buyer_name, "Tema Ltd");
        assert!(matches!(
            contract.sale(5).await,
            Err(LedgerError::SaleNotFound(5))
        ));
        assert!(contract.verify_chain().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_sale_is_rejected_before_mining() {
        init();
        let contract = LedgerContract::new(ContractOptions::default());
        let reg = contract.register_seller(WALLET_A).await.unwrap();
        let err = contract
            .record_sale(&reg.seller_id, "Buyer", 0, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(contract.chain_height().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seller_queries() {
        init();
        let contract = LedgerContract::new(ContractOptions::default());
        let a = contract.register_seller(WALLET_A).await.unwrap().seller_id;
        let b = contract.register_seller(WALLET_B).await.unwrap().seller_id;
        contract.record_sale(&a, "One", 1, 1).await.unwrap();
        contract.record_sale(&b, "Two", 2, 2).await.unwrap();
        contract.record_sale(&a, "Three", 3, 3).await.unwrap();

        assert_eq!(contract.seller_sales(&a).await.unwrap().len(), 2);
        assert_eq!(contract.seller_sales(&b).await.unwrap().len(), 1);
        assert!(matches!(
            contract.seller_details("SELmissing").await,
            Err(LedgerError::SellerNotFound(_))
        ));

        let all = contract.all_sales().await.unwrap();
        let ids: Vec<u64> = all.iter().map(|s| s.sale_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        let latest = contract.latest_blocks(2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].index, 3);
        assert_eq!(latest[1].index, 2);
    }

    #[tokio::test]
    async fn test_concurrent_sales_keep_chain_linked() {
        init();
        let contract = Arc::new(LedgerContract::new(ContractOptions::default()));
        let seller = contract.register_seller(WALLET_A).await.unwrap().seller_id;

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let contract = contract.clone();
            let seller = seller.clone();
            handles.push(tokio::spawn(async move {
                contract.record_sale(&seller, "Buyer", i + 1, 2).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(contract.chain_height().await.unwrap(), 9);
        assert_eq!(contract.total_cocoa_sold().await.unwrap(), 36);
        assert!(contract.verify_chain().await.is_ok());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cocoa.db");

        {
            let store = LedgerStore::open(&path).unwrap();
            let contract = LedgerContract::open(ContractOptions::default(), store).unwrap();
            assert!(contract.is_persistent());
            let seller = contract.register_seller(WALLET_A).await.unwrap().seller_id;
            contract.record_sale(&seller, "Kumasi Co", 40, 6).await.unwrap();
            contract.record_sale(&seller, "Tema Ltd", 10, 2).await.unwrap();
        }

        let store = LedgerStore::open(&path).unwrap();
        let contract = LedgerContract::open(ContractOptions::default(), store).unwrap();
        assert_eq!(contract.chain_height().await.unwrap(), 3);
        assert_eq!(contract.sales_count().await.unwrap(), 2);
        assert_eq!(contract.total_cocoa_sold().await.unwrap(), 50);

        let seller = contract.seller_details("SEL3f65ad8").await.unwrap();
        assert_eq!(seller.total_sales, 2);
        assert_eq!(seller.total_revenue, 260);

        let receipt = contract
            .record_sale("SEL3f65ad8", "Accra", 1, 1)
            .await
            .unwrap();
        assert_eq!(receipt.sale_id, 2);
        assert_eq!(receipt.block_index, 3);
    }
}

use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::ledger::pow::{hash_block, ProofOfWork};
use crate::ledger::summary::SalesSummary;
use crate::ledger::validator::SaleValidator;
use crate::ledger::{Block, BlockData, Sale};
use chrono::Utc;
use tracing::{debug, info};

pub const GENESIS_NONCE: u64 = 100;
pub const GENESIS_HASH: &str = "0";
pub const DEFAULT_NODE_URL: &str = "http://localhost:3001";

/// Additive in-memory chain of sale blocks.
pub struct Blockchain {
    chain: Vec<Block>,
    pending_sales: Vec<Sale>,
    node_url: String,
    pow: ProofOfWork,
    validator: SaleValidator,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Blockchain {
    pub fn new(node_url: Option<String>) -> Self {
        let mut blockchain = Blockchain {
            chain: Vec::new(),
            pending_sales: Vec::new(),
            node_url: node_url.unwrap_or_else(|| DEFAULT_NODE_URL.to_string()),
            pow: ProofOfWork::default(),
            validator: SaleValidator::new(),
        };
        blockchain.create_new_block(GENESIS_NONCE, GENESIS_HASH, GENESIS_HASH);
        blockchain
    }

    /// Rebuilds a chain from persisted blocks, refusing one that does not verify.
    pub fn from_blocks(
        blocks: Vec<Block>,
        node_url: Option<String>,
        pow: ProofOfWork,
    ) -> LedgerResult<Self> {
        if blocks.is_empty() {
            return Ok(Self::new(node_url).with_proof_of_work(pow));
        }
        let blockchain = Blockchain {
            chain: blocks,
            pending_sales: Vec::new(),
            node_url: node_url.unwrap_or_else(|| DEFAULT_NODE_URL.to_string()),
            pow,
            validator: SaleValidator::new(),
        };
        blockchain.verify_chain()?;
        Ok(blockchain)
    }

    pub fn with_proof_of_work(mut self, pow: ProofOfWork) -> Self {
        self.pow = pow;
        self
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub fn proof_of_work_target(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending_sales(&self) -> &[Sale] {
        &self.pending_sales
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Seals every pending sale into a new block.
    pub fn create_new_block(&mut self, nonce: u64, previous_block_hash: &str, hash: &str) -> &Block {
        let block = Block {
            index: self.chain.len() as u64,
            timestamp: Utc::now().timestamp_millis(),
            sales: std::mem::take(&mut self.pending_sales),
            nonce,
            hash: hash.to_string(),
            previous_block_hash: previous_block_hash.to_string(),
        };
        debug!(
            block_index = block.index,
            sales = block.sales.len(),
            "Block appended"
        );
        self.chain.push(block);
        self.last_block()
    }

    pub fn last_block(&self) -> &Block {
        // The genesis block is created in every constructor.
        &self.chain[self.chain.len() - 1]
    }

    /// Total sales ever created, sealed or pending.
    pub fn sale_count(&self) -> u64 {
        let sealed: usize = self.chain.iter().map(|b| b.sales.len()).sum();
        (sealed + self.pending_sales.len()) as u64
    }

    pub fn create_sale(
        &self,
        seller_id: &str,
        buyer_name: &str,
        quantity_kg: u64,
        price: u64,
    ) -> Result<Sale, ValidationError> {
        self.validator
            .validate_sale(seller_id, buyer_name, quantity_kg, price)?;
        Ok(Sale {
            sale_id: self.sale_count(),
            seller_id: seller_id.to_string(),
            buyer_name: buyer_name.to_string(),
            quantity_kg,
            price,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    /// Queues a sale; returns the index of the block it will land in.
    pub fn add_sale_to_pending(&mut self, sale: Sale) -> u64 {
        self.pending_sales.push(sale);
        self.last_block().index + 1
    }

    pub fn hash_block(&self, prev_hash: &str, block_data: &BlockData, nonce: u64) -> String {
        hash_block(prev_hash, block_data, nonce)
    }

    pub fn proof_of_work(&self, prev_hash: &str, block_data: &BlockData) -> u64 {
        self.pow.search(prev_hash, block_data)
    }

    /// Block data the next mined block will commit to.
    pub fn next_block_data(&self) -> BlockData {
        BlockData {
            index: self.last_block().index + 1,
            sales: self.pending_sales.clone(),
        }
    }

    /// Runs proof-of-work over the pending sales and appends the block.
    pub fn mine(&mut self) -> &Block {
        let previous_hash = self.last_block().hash.clone();
        let data = self.next_block_data();
        let nonce = self.proof_of_work(&previous_hash, &data);
        let hash = self.hash_block(&previous_hash, &data, nonce);
        info!(block_index = data.index, nonce, "Block mined");
        self.create_new_block(nonce, &previous_hash, &hash)
    }

    /// Builds the block that `data` and `nonce` produce on top of the current
    /// tip without appending it.
    pub fn prepare_block(&self, data: BlockData, nonce: u64) -> LedgerResult<Block> {
        let tip = self.last_block();
        if data.index != tip.index + 1 {
            return Err(LedgerError::InvalidChain(format!(
                "block {} does not follow tip {}",
                data.index, tip.index
            )));
        }
        let hash = hash_block(&tip.hash, &data, nonce);
        if !self.pow.meets_target(&hash) {
            return Err(LedgerError::InvalidChain(format!(
                "nonce {} does not satisfy proof of work for block {}",
                nonce, data.index
            )));
        }
        Ok(Block {
            index: data.index,
            timestamp: Utc::now().timestamp_millis(),
            sales: data.sales,
            nonce,
            hash,
            previous_block_hash: tip.hash.clone(),
        })
    }

    /// Appends a prepared block if it still extends the tip.
    pub fn append_block(&mut self, block: Block) -> LedgerResult<&Block> {
        let tip = self.last_block();
        if block.index != tip.index + 1 || block.previous_block_hash != tip.hash {
            return Err(LedgerError::InvalidChain(format!(
                "block {} does not extend the current tip",
                block.index
            )));
        }
        debug!(
            block_index = block.index,
            sales = block.sales.len(),
            "Block appended"
        );
        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Aggregates over sales sealed into blocks; pending sales are not counted.
    pub fn sales_summary(&self) -> SalesSummary {
        SalesSummary::from_sales(self.chain.iter().flat_map(|b| b.sales.iter()))
    }

    pub fn all_sales(&self) -> Vec<Sale> {
        self.chain
            .iter()
            .flat_map(|b| b.sales.iter().cloned())
            .collect()
    }

    pub fn seller_sales(&self, seller_id: &str) -> Vec<Sale> {
        self.chain
            .iter()
            .flat_map(|b| b.sales.iter())
            .filter(|s| s.seller_id == seller_id)
            .cloned()
            .collect()
    }

    /// Checks linkage, stored hashes and the proof-of-work target.
    pub fn verify_chain(&self) -> LedgerResult<()> {
        for (i, block) in self.chain.iter().enumerate() {
            if block.index != i as u64 {
                return Err(LedgerError::InvalidChain(format!(
                    "block at position {} has index {}",
                    i, block.index
                )));
            }
            if block.is_genesis() {
                if !is_pristine_genesis(block) {
                    return Err(LedgerError::InvalidChain(
                        "genesis block has been altered".to_string(),
                    ));
                }
                continue;
            }

            let prev = &self.chain[i - 1];
            if block.previous_block_hash != prev.hash {
                return Err(LedgerError::InvalidChain(format!(
                    "block {} previous hash mismatch",
                    block.index
                )));
            }

            let recomputed = hash_block(&block.previous_block_hash, &block.data(), block.nonce);
            if recomputed != block.hash {
                return Err(LedgerError::InvalidChain(format!(
                    "block {} hash mismatch",
                    block.index
                )));
            }
            if !self.pow.meets_target(&block.hash) {
                return Err(LedgerError::InvalidChain(format!(
                    "block {} does not meet proof of work target",
                    block.index
                )));
            }
        }
        Ok(())
    }
}

fn is_pristine_genesis(block: &Block) -> bool {
    block.nonce == GENESIS_NONCE
        && block.hash == GENESIS_HASH
        && block.previous_block_hash == GENESIS_HASH
        && block.sales.is_empty()
}

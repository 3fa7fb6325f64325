use crate::contract::SellerRecord;
use crate::error::{StoreError, StoreResult};
use crate::ledger::{Block, Sale};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// SQLite persistence for sealed blocks and registered sellers.
pub struct LedgerStore {
    conn: Arc<Mutex<Connection>>,
}

impl LedgerStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        let store = LedgerStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        info!(path = %path.as_ref().display(), "Store: SQLite database opened");
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let store = LedgerStore {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> StoreResult<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                block_index   INTEGER PRIMARY KEY,
                timestamp     INTEGER NOT NULL,
                sales_json    TEXT NOT NULL,
                nonce         INTEGER NOT NULL,
                hash          TEXT NOT NULL,
                prev_hash     TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sellers (
                seller_id       TEXT PRIMARY KEY,
                wallet_address  TEXT NOT NULL,
                registered_at   INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_blocks_hash ON blocks(hash)",
            [],
        )?;

        Ok(())
    }

    pub fn save_block(&self, block: &Block) -> StoreResult<()> {
        let sales_json = serde_json::to_string(&block.sales)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO blocks (block_index, timestamp, sales_json, nonce, hash, prev_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                block.index as i64,
                block.timestamp,
                sales_json,
                block.nonce as i64,
                block.hash,
                block.previous_block_hash
            ],
        )?;

        debug!(block_index = block.index, "Store: block saved");
        Ok(())
    }

    /// All blocks in index order.
    pub fn load_blocks(&self) -> StoreResult<Vec<Block>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT block_index, timestamp, sales_json, nonce, hash, prev_hash
             FROM blocks ORDER BY block_index ASC",
        )?;

        let rows = stmt.query_map([], block_from_row)?;
        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(row?);
        }
        Ok(blocks)
    }

    pub fn block_count(&self) -> StoreResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn save_seller(&self, seller: &SellerRecord, registered_at: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sellers (seller_id, wallet_address, registered_at) VALUES (?1, ?2, ?3)",
            params![seller.seller_id, seller.wallet_address, registered_at],
        )?;
        debug!(seller_id = %seller.seller_id, "Store: seller saved");
        Ok(())
    }

    /// Registered sellers in registration order, with empty aggregates.
    pub fn load_sellers(&self) -> StoreResult<Vec<SellerRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT seller_id, wallet_address FROM sellers ORDER BY registered_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let seller_id: String = row.get(0)?;
            let wallet_address: String = row.get(1)?;
            Ok(SellerRecord::new(seller_id, wallet_address))
        })?;

        let mut sellers = Vec::new();
        for row in rows {
            sellers.push(row?);
        }
        Ok(sellers)
    }
}

fn block_from_row(row: &Row<'_>) -> rusqlite::Result<Block> {
    let index: i64 = row.get(0)?;
    let timestamp: i64 = row.get(1)?;
    let sales_json: String = row.get(2)?;
    let nonce: i64 = row.get(3)?;
    let hash: String = row.get(4)?;
    let previous_block_hash: String = row.get(5)?;

    let sales: Vec<Sale> = serde_json::from_str(&sales_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Block {
        index: index as u64,
        timestamp,
        sales,
        nonce: nonce as u64,
        hash,
        previous_block_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Blockchain;

    fn mined_chain() -> Blockchain {
        let mut chain = Blockchain::new(None);
        let sale = chain.create_sale("SEL3f65ad8", "Kumasi Co", 100, 3).unwrap();
        chain.add_sale_to_pending(sale);
        chain.mine();
        chain
    }

    #[test]
    fn test_init_empty() {
        let store = LedgerStore::open_in_memory().unwrap();
        assert_eq!(store.block_count().unwrap(), 0);
        assert!(store.load_blocks().unwrap().is_empty());
        assert!(store.load_sellers().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_blocks() {
        let store = LedgerStore::open_in_memory().unwrap();
        let chain = mined_chain();
        for block in chain.blocks() {
            store.save_block(block).unwrap();
        }

        assert_eq!(store.block_count().unwrap(), 2);
        let loaded = store.load_blocks().unwrap();
        assert_eq!(loaded, chain.blocks().to_vec());
        assert_eq!(loaded[1].sales[0].buyer_name, "Kumasi Co");
    }

    #[test]
    fn test_corrupt_sales_row_reports_cause() {
        let store = LedgerStore::open_in_memory().unwrap();
        store.save_block(Blockchain::new(None).last_block()).unwrap();
        store
            .conn
            .lock()
            .execute("UPDATE blocks SET sales_json = '[{\"saleId\":' WHERE block_index = 0", [])
            .unwrap();

        match store.load_blocks() {
            Err(StoreError::Sqlite(rusqlite::Error::FromSqlConversionFailure(2, Type::Text, cause))) => {
                assert!(cause.to_string().contains("EOF"));
            }
            other => panic!("expected conversion failure, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_duplicate_block_rejected() {
        let store = LedgerStore::open_in_memory().unwrap();
        let chain = Blockchain::new(None);
        store.save_block(chain.last_block()).unwrap();
        assert!(store.save_block(chain.last_block()).is_err());
    }

    #[test]
    fn test_sellers_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let store = LedgerStore::open(&path).unwrap();
            store
                .save_seller(&SellerRecord::new("SEL1111111", "0x11"), 1)
                .unwrap();
            store
                .save_seller(&SellerRecord::new("SEL2222222", "0x22"), 2)
                .unwrap();
        }

        let store = LedgerStore::open(&path).unwrap();
        let sellers = store.load_sellers().unwrap();
        assert_eq!(sellers.len(), 2);
        assert_eq!(sellers[0].seller_id, "SEL1111111");
        assert_eq!(sellers[1].wallet_address, "0x22");
        assert_eq!(sellers[1].total_sales, 0);
    }
}

//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `meta` - Ledger identity (key: fixed, holds the owner account)
//! - `items` - Catalog entries (key: item id)
//! - `order_counts` - Orders placed per buyer (key: buyer)
//! - `orders` - Purchase records (key: buyer || index)
//! - `funds` - Retained balance pending withdrawal (key: fixed)
//!
//! Every mutating operation commits through a single `WriteBatch`, so a
//! purchase can never land with its order but without its stock decrement.

use crate::{
    error::{Error, Result},
    types::{AccountId, Item, Order},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, IteratorMode, Options, WriteBatch, DB,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Column family names
const CF_META: &str = "meta";
const CF_ITEMS: &str = "items";
const CF_ORDER_COUNTS: &str = "order_counts";
const CF_ORDERS: &str = "orders";
const CF_FUNDS: &str = "funds";

/// Fixed key for the owner account in `meta`
const KEY_OWNER: &[u8] = b"owner";

/// Fixed key for the retained balance in `funds`
const KEY_RETAINED: &[u8] = b"retained";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    // Column family handles are stored in DB, accessed by name
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        // Enable statistics
        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_META, Self::cf_options_meta()),
            ColumnFamilyDescriptor::new(CF_ITEMS, Self::cf_options_items()),
            ColumnFamilyDescriptor::new(CF_ORDER_COUNTS, Self::cf_options_order_counts()),
            ColumnFamilyDescriptor::new(CF_ORDERS, Self::cf_options_orders()),
            ColumnFamilyDescriptor::new(CF_FUNDS, Self::cf_options_funds()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_meta() -> Options {
        // Tiny, written once
        Options::default()
    }

    fn cf_options_items() -> Options {
        let mut opts = Options::default();
        // Catalog is frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_order_counts() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups by buyer benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_orders() -> Options {
        let mut opts = Options::default();
        // Append-only history, compress aggressively
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_funds() -> Options {
        Options::default()
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    fn item_key(id: u64) -> [u8; 8] {
        id.to_be_bytes()
    }

    fn count_key(buyer: &AccountId) -> Vec<u8> {
        buyer.as_str().as_bytes().to_vec()
    }

    fn order_key(buyer: &AccountId, index: u64) -> Vec<u8> {
        let mut key = buyer.as_str().as_bytes().to_vec();
        key.push(b'|'); // Separator
        key.extend_from_slice(&index.to_be_bytes());
        key
    }

    // Owner operations

    /// Get stored owner, if the ledger has been initialized
    pub fn get_owner(&self) -> Result<Option<AccountId>> {
        let cf = self.cf_handle(CF_META)?;

        match self.db.get_cf(cf, KEY_OWNER)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Persist the owner account (one-time initialization)
    pub fn put_owner(&self, owner: &AccountId) -> Result<()> {
        let cf = self.cf_handle(CF_META)?;
        let value = bincode::serialize(owner)?;

        self.db.put_cf(cf, KEY_OWNER, &value)?;

        tracing::info!(owner = %owner, "Ledger initialized");

        Ok(())
    }

    // Catalog operations

    /// Insert or fully overwrite a catalog entry
    pub fn put_item(&self, item: &Item) -> Result<()> {
        let cf = self.cf_handle(CF_ITEMS)?;
        let value = bincode::serialize(item)?;

        self.db.put_cf(cf, Self::item_key(item.id), &value)?;

        tracing::debug!(item_id = item.id, stock = item.stock, "Item listed");

        Ok(())
    }

    /// Get catalog entry by id
    pub fn get_item(&self, id: u64) -> Result<Option<Item>> {
        let cf = self.cf_handle(CF_ITEMS)?;

        match self.db.get_cf(cf, Self::item_key(id))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Order operations

    /// Number of orders placed by a buyer (0 for unknown buyers)
    pub fn orders_count(&self, buyer: &AccountId) -> Result<u64> {
        let cf = self.cf_handle(CF_ORDER_COUNTS)?;

        match self.db.get_cf(cf, Self::count_key(buyer))? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(0),
        }
    }

    /// Get an order by buyer and 1-based index
    pub fn get_order(&self, buyer: &AccountId, index: u64) -> Result<Option<Order>> {
        let cf = self.cf_handle(CF_ORDERS)?;

        match self.db.get_cf(cf, Self::order_key(buyer, index))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Funds operations

    /// Balance currently held by the ledger pending withdrawal
    pub fn retained_balance(&self) -> Result<Decimal> {
        let cf = self.cf_handle(CF_FUNDS)?;

        match self.db.get_cf(cf, KEY_RETAINED)? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(Decimal::ZERO),
        }
    }

    // Batch operations (atomic)

    /// Commit a purchase: decremented item, bumped order count, new order,
    /// and updated retained balance land in one atomic write
    pub fn commit_purchase(
        &self,
        item: &Item,
        buyer: &AccountId,
        index: u64,
        order: &Order,
        new_balance: Decimal,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        // 1. Catalog entry with decremented stock
        let cf_items = self.cf_handle(CF_ITEMS)?;
        batch.put_cf(cf_items, Self::item_key(item.id), bincode::serialize(item)?);

        // 2. Buyer's order count
        let cf_counts = self.cf_handle(CF_ORDER_COUNTS)?;
        batch.put_cf(cf_counts, Self::count_key(buyer), bincode::serialize(&index)?);

        // 3. Order record
        let cf_orders = self.cf_handle(CF_ORDERS)?;
        batch.put_cf(
            cf_orders,
            Self::order_key(buyer, index),
            bincode::serialize(order)?,
        );

        // 4. Retained balance
        let cf_funds = self.cf_handle(CF_FUNDS)?;
        batch.put_cf(cf_funds, KEY_RETAINED, bincode::serialize(&new_balance)?);

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(
            buyer = %buyer,
            item_id = item.id,
            order_index = index,
            "Purchase committed"
        );

        Ok(())
    }

    /// Commit a withdrawal: retained balance drops to zero
    pub fn commit_withdrawal(&self, amount: Decimal) -> Result<()> {
        let cf = self.cf_handle(CF_FUNDS)?;
        let value = bincode::serialize(&Decimal::ZERO)?;

        self.db.put_cf(cf, KEY_RETAINED, &value)?;

        tracing::info!(amount = %amount, "Withdrawal committed");

        Ok(())
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_items = self.cf_handle(CF_ITEMS)?;
        let cf_orders = self.cf_handle(CF_ORDERS)?;

        // Count items (approximate, fast)
        let item_count = self.approximate_count(cf_items)?;

        // Count orders
        let mut order_count = 0u64;
        let iter = self.db.iterator_cf(cf_orders, IteratorMode::Start);
        for _ in iter {
            order_count += 1;
        }

        Ok(StorageStats {
            total_items: item_count,
            total_orders: order_count,
            retained_balance: self.retained_balance()?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Catalog entries ever listed (approximate)
    pub total_items: u64,
    /// Orders on the books
    pub total_orders: u64,
    /// Balance held pending withdrawal
    pub retained_balance: Decimal,
}

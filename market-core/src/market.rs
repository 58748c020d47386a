//! Main marketplace orchestration layer
//!
//! This module ties together storage, metrics, and actor components into a
//! high-level API for the marketplace ledger.
//!
//! # Example
//!
//! ```no_run
//! use market_core::{AccountId, Config, Market};
//!
//! #[tokio::main]
//! async fn main() -> market_core::Result<()> {
//!     let config = Config::default();
//!     let market = Market::open(config, AccountId::new("admin")).await?;
//!
//!     // List an item
//!     // market.list(&AccountId::new("admin"), item).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_market_actor, MarketHandle},
    metrics::Metrics,
    payout::{LoggingPayout, Payout},
    storage::StorageStats,
    types::{AccountId, Item, Notification, Order},
    Config, Error, Result, Storage,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Main marketplace interface
pub struct Market {
    /// Actor handle for serialized operations
    handle: MarketHandle,

    /// Direct storage access (for stats)
    storage: Arc<Storage>,

    /// Administrative identity
    owner: AccountId,

    /// Notification fan-out
    notifications: broadcast::Sender<Notification>,

    /// Actor task, awaited on shutdown
    task: tokio::task::JoinHandle<()>,
}

impl Market {
    /// Open the marketplace with configuration
    ///
    /// The first open initializes the ledger and fixes `owner` for its
    /// lifetime. Reopening an existing data directory with a different
    /// owner identity fails with a configuration error.
    pub async fn open(config: Config, owner: AccountId) -> Result<Self> {
        Self::open_with_payout(config, owner, Arc::new(LoggingPayout)).await
    }

    /// Open the marketplace with a custom payout destination
    pub async fn open_with_payout(
        config: Config,
        owner: AccountId,
        payout: Arc<dyn Payout>,
    ) -> Result<Self> {
        // Open storage
        let storage = Arc::new(Storage::open(&config)?);

        // One-time initialization: the stored owner is authoritative
        let owner = match storage.get_owner()? {
            Some(stored) => {
                if stored != owner {
                    return Err(Error::Config(format!(
                        "ledger already initialized with owner {}, refusing to rebind to {}",
                        stored, owner
                    )));
                }
                stored
            }
            None => {
                storage.put_owner(&owner)?;
                owner
            }
        };

        // Metrics
        let metrics = Metrics::new()?;
        let balance = storage.retained_balance()?;
        metrics.set_retained_balance(balance.to_f64().unwrap_or(0.0));

        // Notification channel
        let (notifications, _) = broadcast::channel(config.notification_capacity);

        // Spawn actor
        let (handle, task) = spawn_market_actor(
            storage.clone(),
            owner.clone(),
            payout,
            metrics,
            notifications.clone(),
            config.mailbox_capacity,
        );

        Ok(Self {
            handle,
            storage,
            owner,
            notifications,
            task,
        })
    }

    /// The administrative identity fixed at initialization
    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// List (or re-list) an item in the catalog
    ///
    /// Owner-only. Fully replaces any prior entry for the same id,
    /// including its stock.
    pub async fn list(&self, caller: &AccountId, item: Item) -> Result<()> {
        self.handle.list(caller.clone(), item).await
    }

    /// Buy an item, attaching a payment that must exactly equal its cost
    ///
    /// Returns the 1-based index of the new order in the buyer's sequence.
    pub async fn buy(&self, buyer: &AccountId, item_id: u64, payment: Decimal) -> Result<u64> {
        self.handle.buy(buyer.clone(), item_id, payment).await
    }

    /// Withdraw the full retained balance to the owner
    ///
    /// Owner-only. Returns the amount withdrawn.
    pub async fn withdraw(&self, caller: &AccountId) -> Result<Decimal> {
        self.handle.withdraw(caller.clone()).await
    }

    /// Get a catalog entry (`None` for unknown ids)
    pub async fn item(&self, id: u64) -> Result<Option<Item>> {
        self.handle.get_item(id).await
    }

    /// Number of orders placed by a buyer (0 for unknown buyers)
    pub async fn orders_count_for(&self, buyer: &AccountId) -> Result<u64> {
        self.handle.get_orders_count(buyer.clone()).await
    }

    /// Get an order by buyer and 1-based index
    ///
    /// `None` outside `1..=orders_count_for(buyer)`.
    pub async fn order_for(&self, buyer: &AccountId, index: u64) -> Result<Option<Order>> {
        self.handle.get_order(buyer.clone(), index).await
    }

    /// Balance currently held by the ledger pending withdrawal
    pub async fn retained_balance(&self) -> Result<Decimal> {
        self.handle.get_balance().await
    }

    /// Subscribe to notifications emitted after successful operations
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Shutdown the marketplace
    ///
    /// Waits for the actor to drain and release storage, so the data
    /// directory can be reopened immediately afterwards.
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await?;
        self.task
            .await
            .map_err(|e| Error::Concurrency(format!("Actor task failed: {}", e)))
    }
}

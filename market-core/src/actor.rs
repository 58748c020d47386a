//! Actor-based concurrency for the marketplace ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task eliminates race conditions
//! - Every operation observes a fully-consistent state and commits before
//!   its response is sent
//! - Async message passing with backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │            Callers (owner, buyers, readers)           │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ operation requests
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               MarketHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              MarketActor (Single Task)                │
//! │   check preconditions → stage new state in locals     │
//! │          → one atomic WriteBatch commit               │
//! │          → notification + metrics on success          │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::metrics::Metrics;
use crate::payout::Payout;
use crate::types::{AccountId, Item, Notification, Order};
use crate::{Error, Result, Storage};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Message sent to the market actor
pub enum MarketMessage {
    /// List (or re-list) an item in the catalog
    List {
        caller: AccountId,
        item: Item,
        response: oneshot::Sender<Result<()>>,
    },

    /// Buy an item with an attached payment
    Buy {
        buyer: AccountId,
        item_id: u64,
        payment: Decimal,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Withdraw the full retained balance to the owner
    Withdraw {
        caller: AccountId,
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Get catalog entry
    GetItem {
        id: u64,
        response: oneshot::Sender<Result<Option<Item>>>,
    },

    /// Get a buyer's order count
    GetOrdersCount {
        buyer: AccountId,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Get an order by buyer and index
    GetOrder {
        buyer: AccountId,
        index: u64,
        response: oneshot::Sender<Result<Option<Order>>>,
    },

    /// Get the retained balance
    GetBalance {
        response: oneshot::Sender<Result<Decimal>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes market messages
pub struct MarketActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Administrative identity, fixed at initialization
    owner: AccountId,

    /// Funds transfer seam for withdrawals
    payout: Arc<dyn Payout>,

    /// Metrics collector
    metrics: Metrics,

    /// Notification fan-out to external observers
    notifications: broadcast::Sender<Notification>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<MarketMessage>,
}

impl MarketActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        owner: AccountId,
        payout: Arc<dyn Payout>,
        metrics: Metrics,
        notifications: broadcast::Sender<Notification>,
        mailbox: mpsc::Receiver<MarketMessage>,
    ) -> Self {
        Self {
            storage,
            owner,
            payout,
            metrics,
            notifications,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                MarketMessage::Shutdown => break,
                _ => self.handle_message(msg),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: MarketMessage) {
        match msg {
            MarketMessage::List {
                caller,
                item,
                response,
            } => {
                let result = self.handle_list(caller, item);
                if result.is_err() {
                    self.metrics.record_rejected();
                }
                let _ = response.send(result);
            }

            MarketMessage::Buy {
                buyer,
                item_id,
                payment,
                response,
            } => {
                let started = Instant::now();
                let result = self.handle_buy(buyer, item_id, payment);
                match &result {
                    Ok(_) => self
                        .metrics
                        .record_purchase(started.elapsed().as_secs_f64()),
                    Err(_) => self.metrics.record_rejected(),
                }
                let _ = response.send(result);
            }

            MarketMessage::Withdraw { caller, response } => {
                let result = self.handle_withdraw(caller);
                if result.is_err() {
                    self.metrics.record_rejected();
                }
                let _ = response.send(result);
            }

            MarketMessage::GetItem { id, response } => {
                let _ = response.send(self.storage.get_item(id));
            }

            MarketMessage::GetOrdersCount { buyer, response } => {
                let _ = response.send(self.storage.orders_count(&buyer));
            }

            MarketMessage::GetOrder {
                buyer,
                index,
                response,
            } => {
                let _ = response.send(self.storage.get_order(&buyer, index));
            }

            MarketMessage::GetBalance { response } => {
                let _ = response.send(self.storage.retained_balance());
            }

            MarketMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// List an item: owner-only, full overwrite of the catalog entry
    fn handle_list(&self, caller: AccountId, item: Item) -> Result<()> {
        if caller != self.owner {
            return Err(Error::Unauthorized(caller.to_string()));
        }

        if item.id == 0 {
            return Err(Error::InvalidListing("item id must be positive".to_string()));
        }

        if item.cost < Decimal::ZERO {
            return Err(Error::InvalidListing("cost must be non-negative".to_string()));
        }

        self.storage.put_item(&item)?;

        self.metrics.record_listing();
        let _ = self.notifications.send(Notification::listed(item));

        Ok(())
    }

    /// Buy an item: validate, stage, commit atomically
    fn handle_buy(&self, buyer: AccountId, item_id: u64, payment: Decimal) -> Result<u64> {
        let listed = self
            .storage
            .get_item(item_id)?
            .ok_or(Error::ItemNotFound(item_id))?;

        if !listed.in_stock() {
            return Err(Error::OutOfStock(item_id));
        }

        // Exact match: neither under- nor over-payment is accepted
        if payment != listed.cost {
            return Err(Error::InvalidPayment {
                expected: listed.cost,
                paid: payment,
            });
        }

        // Stage the full effect in locals; nothing below can partially land
        let snapshot = listed.clone();
        let mut updated = listed;
        updated.stock -= 1;

        let index = self.storage.orders_count(&buyer)? + 1;
        let order = Order {
            placed_at: Utc::now(),
            item: snapshot,
        };
        let new_balance = self.storage.retained_balance()? + payment;

        self.storage
            .commit_purchase(&updated, &buyer, index, &order, new_balance)?;

        self.metrics
            .set_retained_balance(new_balance.to_f64().unwrap_or(0.0));
        let _ = self
            .notifications
            .send(Notification::purchased(buyer.clone(), item_id, index));

        tracing::info!(
            buyer = %buyer,
            item_id,
            order_index = index,
            "Item purchased"
        );

        Ok(index)
    }

    /// Withdraw the full retained balance to the owner
    fn handle_withdraw(&self, caller: AccountId) -> Result<Decimal> {
        if caller != self.owner {
            return Err(Error::Unauthorized(caller.to_string()));
        }

        let amount = self.storage.retained_balance()?;

        // Funds move first; the balance reset only commits once the
        // transfer succeeded, so a failed transfer leaves custody intact.
        self.payout.transfer(&self.owner, amount)?;
        self.storage.commit_withdrawal(amount)?;

        self.metrics.record_withdrawal();
        self.metrics.set_retained_balance(0.0);

        Ok(amount)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct MarketHandle {
    sender: mpsc::Sender<MarketMessage>,
}

impl MarketHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<MarketMessage>) -> Self {
        Self { sender }
    }

    /// List an item
    pub async fn list(&self, caller: AccountId, item: Item) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MarketMessage::List {
                caller,
                item,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Buy an item
    pub async fn buy(&self, buyer: AccountId, item_id: u64, payment: Decimal) -> Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MarketMessage::Buy {
                buyer,
                item_id,
                payment,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Withdraw the retained balance
    pub async fn withdraw(&self, caller: AccountId) -> Result<Decimal> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MarketMessage::Withdraw {
                caller,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get catalog entry
    pub async fn get_item(&self, id: u64) -> Result<Option<Item>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MarketMessage::GetItem { id, response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get a buyer's order count
    pub async fn get_orders_count(&self, buyer: AccountId) -> Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MarketMessage::GetOrdersCount {
                buyer,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get an order by buyer and index
    pub async fn get_order(&self, buyer: AccountId, index: u64) -> Result<Option<Order>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MarketMessage::GetOrder {
                buyer,
                index,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get the retained balance
    pub async fn get_balance(&self) -> Result<Decimal> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MarketMessage::GetBalance { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MarketMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the market actor
///
/// Returns the handle plus the actor's join handle; awaiting the latter
/// after shutdown guarantees the actor has released its storage reference.
pub fn spawn_market_actor(
    storage: Arc<Storage>,
    owner: AccountId,
    payout: Arc<dyn Payout>,
    metrics: Metrics,
    notifications: broadcast::Sender<Notification>,
    mailbox_capacity: usize,
) -> (MarketHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = MarketActor::new(storage, owner, payout, metrics, notifications, rx);

    let task = tokio::spawn(async move {
        actor.run().await;
    });

    (MarketHandle::new(tx), task)
}

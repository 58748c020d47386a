//! Core types for the marketplace ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account identifier (wallet address, user id, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog entry: a purchasable product with price and inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier, assigned by the owner at listing time (never 0)
    pub id: u64,

    /// Product name
    pub name: String,

    /// Product category
    pub category: String,

    /// Image URL
    pub image: String,

    /// Price in smallest currency units (exact decimal)
    pub cost: Decimal,

    /// Informational rating, not validated by the ledger
    pub rating: u8,

    /// Remaining inventory, decremented by one per purchase
    pub stock: u32,
}

impl Item {
    /// Check whether the item can currently be purchased
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A completed purchase, recorded against the buyer
///
/// The embedded item is a snapshot taken at purchase time. Re-listing the
/// catalog entry later must not change orders already on the books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Purchase timestamp, set by the ledger
    pub placed_at: DateTime<Utc>,

    /// Snapshot of the item as it was when bought (pre-decrement stock)
    pub item: Item,
}

/// Notification emitted to external observers (indexers, UIs)
///
/// Notifications are pure side effects: they carry no state and are only
/// emitted after the corresponding operation has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification ID (UUIDv7 for time-ordering)
    pub notification_id: Uuid,

    /// Emission timestamp
    pub emitted_at: DateTime<Utc>,

    /// What happened
    pub kind: NotificationKind,
}

impl Notification {
    /// Notification for a successful listing
    pub fn listed(item: Item) -> Self {
        Self {
            notification_id: Uuid::now_v7(),
            emitted_at: Utc::now(),
            kind: NotificationKind::Listed { item },
        }
    }

    /// Notification for a successful purchase
    pub fn purchased(buyer: AccountId, item_id: u64, order_index: u64) -> Self {
        Self {
            notification_id: Uuid::now_v7(),
            emitted_at: Utc::now(),
            kind: NotificationKind::Purchased {
                buyer,
                item_id,
                order_index,
            },
        }
    }
}

/// Notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// An item was listed (or re-listed) in the catalog
    Listed {
        /// The listed item, exactly as stored
        item: Item,
    },

    /// An item was purchased
    Purchased {
        /// Buyer identity
        buyer: AccountId,
        /// Purchased item id
        item_id: u64,
        /// 1-based index of the order in the buyer's sequence
        order_index: u64,
    },
}

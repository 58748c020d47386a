//! Bazaar Market Core
//!
//! Single-owner marketplace ledger with durable catalog, order history,
//! and fund custody.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task serializes every operation
//! - **Atomic Commits**: each operation lands in one RocksDB WriteBatch
//! - **Snapshots**: orders embed the item as it was at purchase time
//! - **Notifications**: committed operations fan out to observers
//!
//! # Invariants
//!
//! - The owner is fixed at initialization and never changes
//! - Stock never goes below zero
//! - A buyer's order indices are exactly the contiguous sequence 1..=count
//! - Retained balance equals payments accepted minus amounts withdrawn,
//!   and only `withdraw` (owner-only, full balance) reduces it

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod payout;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use market::Market;
pub use payout::Payout;
pub use storage::Storage;
pub use types::{AccountId, Item, Notification, NotificationKind, Order};

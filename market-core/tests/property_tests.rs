//! Property-based tests for marketplace invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Catalog fidelity: listed attributes read back exactly
//! - Contiguity: order indices per buyer are always 1..=count
//! - Conservation: retained balance == payments accepted - withdrawals
//! - Atomicity: rejected operations change nothing
//! - Immutability: stored orders survive catalog re-listing

use market_core::{
    payout::Payout,
    types::{AccountId, Item},
    Config, Error, Market, Result,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

/// Strategy for generating valid costs (non-negative decimals)
fn cost_strategy() -> impl Strategy<Value = Decimal> {
    (0u64..1_000_000_00u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Strategy for generating opaque descriptive strings
fn label_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,14}".prop_map(|s| s.trim_end().to_string())
}

/// Strategy for generating valid catalog entries
fn item_strategy() -> impl Strategy<Value = Item> {
    (
        1u64..100,
        label_strategy(),
        label_strategy(),
        "[a-z]{3,10}",
        cost_strategy(),
        0u8..=5,
        0u32..20,
    )
        .prop_map(|(id, name, category, slug, cost, rating, stock)| Item {
            id,
            name,
            category,
            image: format!("https://cdn.example.com/{}.jpg", slug),
            cost,
            rating,
            stock,
        })
}

/// Create test market with temp directory
async fn create_test_market(owner: &AccountId) -> (Market, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();

    let market = Market::open(config, owner.clone()).await.unwrap();
    (market, temp_dir)
}

/// Payout double that accumulates transferred amounts
#[derive(Default)]
struct RecordingPayout {
    total: Mutex<Decimal>,
}

impl Payout for RecordingPayout {
    fn transfer(&self, _to: &AccountId, amount: Decimal) -> Result<()> {
        *self.total.lock().unwrap() += amount;
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: every field of a listed item reads back exactly
    #[test]
    fn prop_listing_roundtrip(item in item_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let owner = AccountId::new("owner");
            let (market, _temp) = create_test_market(&owner).await;

            market.list(&owner, item.clone()).await.unwrap();

            let retrieved = market.item(item.id).await.unwrap().unwrap();
            prop_assert_eq!(retrieved, item);

            market.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: sequential purchases yield contiguous 1..=count indices
    /// with non-decreasing timestamps
    #[test]
    fn prop_order_indices_are_contiguous(purchases in 1u64..8) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let owner = AccountId::new("owner");
            let buyer = AccountId::new("buyer");
            let (market, _temp) = create_test_market(&owner).await;

            let cost = Decimal::new(100, 2);
            let item = Item {
                id: 1,
                name: "Shoes".to_string(),
                category: "Clothing".to_string(),
                image: "https://cdn.example.com/shoes.jpg".to_string(),
                cost,
                rating: 4,
                stock: purchases as u32,
            };
            market.list(&owner, item).await.unwrap();

            for expected in 1..=purchases {
                let index = market.buy(&buyer, 1, cost).await.unwrap();
                prop_assert_eq!(index, expected);
            }

            prop_assert_eq!(market.orders_count_for(&buyer).await.unwrap(), purchases);

            // Exactly 1..=count is populated, nothing outside it
            prop_assert!(market.order_for(&buyer, 0).await.unwrap().is_none());
            let mut previous = None;
            for index in 1..=purchases {
                let order = market.order_for(&buyer, index).await.unwrap();
                prop_assert!(order.is_some());
                let placed_at = order.unwrap().placed_at;
                if let Some(prev) = previous {
                    prop_assert!(placed_at >= prev);
                }
                previous = Some(placed_at);
            }
            prop_assert!(market
                .order_for(&buyer, purchases + 1)
                .await
                .unwrap()
                .is_none());

            market.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: retained balance equals the sum of accepted payments;
    /// rejected payments are never retained
    #[test]
    fn prop_balance_conservation(offsets in prop::collection::vec(0i64..3, 1..12)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let owner = AccountId::new("owner");
            let buyer = AccountId::new("buyer");
            let (market, _temp) = create_test_market(&owner).await;

            let cost = Decimal::new(250, 2);
            let item = Item {
                id: 1,
                name: "Camera".to_string(),
                category: "Electronics".to_string(),
                image: "https://cdn.example.com/camera.jpg".to_string(),
                cost,
                rating: 5,
                stock: offsets.len() as u32,
            };
            market.list(&owner, item).await.unwrap();

            // Offset 0 is an exact payment; anything else must be rejected
            let mut accepted = 0u64;
            for offset in &offsets {
                let payment = cost + Decimal::new(*offset, 2);
                match market.buy(&buyer, 1, payment).await {
                    Ok(_) => {
                        prop_assert_eq!(*offset, 0);
                        accepted += 1;
                    }
                    Err(Error::InvalidPayment { .. }) => prop_assert_ne!(*offset, 0),
                    Err(e) => return Err(TestCaseError::fail(format!("unexpected: {}", e))),
                }
            }

            let expected = cost * Decimal::from(accepted);
            prop_assert_eq!(market.retained_balance().await.unwrap(), expected);
            prop_assert_eq!(market.orders_count_for(&buyer).await.unwrap(), accepted);

            market.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: a rejected purchase leaves catalog, orders, and balance
    /// untouched
    #[test]
    fn prop_rejections_change_nothing(item in item_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let owner = AccountId::new("owner");
            let buyer = AccountId::new("buyer");
            let (market, _temp) = create_test_market(&owner).await;

            market.list(&owner, item.clone()).await.unwrap();

            // Wrong payment is always rejected; out-of-stock rejects even
            // an exact payment
            let result = market.buy(&buyer, item.id, item.cost + Decimal::ONE).await;
            match result {
                Err(Error::InvalidPayment { .. }) | Err(Error::OutOfStock(_)) => {}
                other => {
                    return Err(TestCaseError::fail(format!(
                        "expected rejection, got {:?}",
                        other.map(|_| ())
                    )))
                }
            }

            prop_assert_eq!(market.item(item.id).await.unwrap().unwrap(), item);
            prop_assert_eq!(market.orders_count_for(&buyer).await.unwrap(), 0);
            prop_assert_eq!(market.retained_balance().await.unwrap(), Decimal::ZERO);

            market.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: re-listing an item never rewrites orders already on the
    /// books
    #[test]
    fn prop_orders_survive_relisting(original in item_strategy(), replacement in item_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let owner = AccountId::new("owner");
            let buyer = AccountId::new("buyer");
            let (market, _temp) = create_test_market(&owner).await;

            let mut original = original;
            original.stock = original.stock.max(1);
            let mut replacement = replacement;
            replacement.id = original.id;

            market.list(&owner, original.clone()).await.unwrap();
            market.buy(&buyer, original.id, original.cost).await.unwrap();
            market.list(&owner, replacement.clone()).await.unwrap();

            // Catalog shows the replacement, the order keeps its snapshot
            prop_assert_eq!(market.item(original.id).await.unwrap().unwrap(), replacement);
            let order = market.order_for(&buyer, 1).await.unwrap().unwrap();
            prop_assert_eq!(order.item, original);

            market.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: withdrawal pays out exactly the retained balance and
    /// resets it to zero
    #[test]
    fn prop_withdraw_conserves_funds(purchases in 1u64..6) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let owner = AccountId::new("owner");
            let buyer = AccountId::new("buyer");

            let temp_dir = tempfile::tempdir().unwrap();
            let mut config = Config::default();
            config.data_dir = temp_dir.path().to_path_buf();

            let payout = Arc::new(RecordingPayout::default());
            let market = Market::open_with_payout(config, owner.clone(), payout.clone())
                .await
                .unwrap();

            let cost = Decimal::new(199, 2);
            let item = Item {
                id: 1,
                name: "Lamp".to_string(),
                category: "Home".to_string(),
                image: "https://cdn.example.com/lamp.jpg".to_string(),
                cost,
                rating: 3,
                stock: purchases as u32,
            };
            market.list(&owner, item).await.unwrap();

            for _ in 0..purchases {
                market.buy(&buyer, 1, cost).await.unwrap();
            }

            let expected = cost * Decimal::from(purchases);
            let withdrawn = market.withdraw(&owner).await.unwrap();
            prop_assert_eq!(withdrawn, expected);
            prop_assert_eq!(market.retained_balance().await.unwrap(), Decimal::ZERO);
            prop_assert_eq!(*payout.total.lock().unwrap(), expected);

            market.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use market_core::NotificationKind;

    const COST: Decimal = Decimal::from_parts(100, 0, 0, false, 2); // 1.00

    fn shoes(stock: u32) -> Item {
        Item {
            id: 1,
            name: "Shoes".to_string(),
            category: "Clothing".to_string(),
            image: "https://cdn.example.com/shoes.jpg".to_string(),
            cost: COST,
            rating: 4,
            stock,
        }
    }

    #[tokio::test]
    async fn test_open_fixes_the_owner() {
        let owner = AccountId::new("deployer");
        let (market, _temp) = create_test_market(&owner).await;

        assert_eq!(market.owner(), &owner);

        // Owner-only operations reject everyone else
        let result = market.list(&AccountId::new("buyer"), shoes(5)).await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));

        market.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_listing_emits_notification() {
        let owner = AccountId::new("owner");
        let (market, _temp) = create_test_market(&owner).await;
        let mut subscriber = market.subscribe();

        let item = shoes(5);
        market.list(&owner, item.clone()).await.unwrap();

        let notification = subscriber.recv().await.unwrap();
        assert_eq!(notification.kind, NotificationKind::Listed { item });

        market.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_buying_flow() {
        let owner = AccountId::new("owner");
        let buyer = AccountId::new("buyer");
        let (market, _temp) = create_test_market(&owner).await;
        let mut subscriber = market.subscribe();

        market.list(&owner, shoes(5)).await.unwrap();
        let index = market.buy(&buyer, 1, COST).await.unwrap();
        assert_eq!(index, 1);

        // Money is held by the ledger
        assert_eq!(market.retained_balance().await.unwrap(), COST);

        // Buyer's order count updated
        assert_eq!(market.orders_count_for(&buyer).await.unwrap(), 1);

        // Order is on the books with a real timestamp
        let order = market.order_for(&buyer, 1).await.unwrap().unwrap();
        assert!(order.placed_at.timestamp() > 0);
        assert_eq!(order.item.name, "Shoes");

        // Buy notification follows the List notification
        let _list = subscriber.recv().await.unwrap();
        let buy = subscriber.recv().await.unwrap();
        assert_eq!(
            buy.kind,
            NotificationKind::Purchased {
                buyer: buyer.clone(),
                item_id: 1,
                order_index: 1,
            }
        );

        market.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_buy_rejects_when_out_of_stock() {
        let owner = AccountId::new("owner");
        let buyer = AccountId::new("buyer");
        let (market, _temp) = create_test_market(&owner).await;

        let mut sold_out = shoes(0);
        sold_out.id = 2;
        market.list(&owner, sold_out).await.unwrap();

        let result = market.buy(&buyer, 2, COST).await;
        assert!(matches!(result, Err(Error::OutOfStock(2))));
        assert_eq!(market.retained_balance().await.unwrap(), Decimal::ZERO);

        market.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_buy_rejects_wrong_price() {
        let owner = AccountId::new("owner");
        let buyer = AccountId::new("buyer");
        let (market, _temp) = create_test_market(&owner).await;

        market.list(&owner, shoes(5)).await.unwrap();

        let result = market.buy(&buyer, 1, COST + Decimal::ONE).await;
        assert!(matches!(result, Err(Error::InvalidPayment { .. })));
        assert_eq!(market.retained_balance().await.unwrap(), Decimal::ZERO);
        assert_eq!(market.item(1).await.unwrap().unwrap().stock, 5);

        market.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_withdraw_moves_funds_to_owner() {
        let owner = AccountId::new("owner");
        let buyer = AccountId::new("buyer");

        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let payout = Arc::new(RecordingPayout::default());
        let market = Market::open_with_payout(config, owner.clone(), payout.clone())
            .await
            .unwrap();

        market.list(&owner, shoes(5)).await.unwrap();
        market.buy(&buyer, 1, COST).await.unwrap();

        market.withdraw(&owner).await.unwrap();

        // Owner received the funds, ledger holds nothing
        assert_eq!(*payout.total.lock().unwrap(), COST);
        assert_eq!(market.retained_balance().await.unwrap(), Decimal::ZERO);

        market.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_withdraw_rejects_non_owner() {
        let owner = AccountId::new("owner");
        let buyer = AccountId::new("buyer");
        let (market, _temp) = create_test_market(&owner).await;

        market.list(&owner, shoes(5)).await.unwrap();
        market.buy(&buyer, 1, COST).await.unwrap();

        let result = market.withdraw(&buyer).await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert_eq!(market.retained_balance().await.unwrap(), COST);

        market.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeat_purchases_get_indices_one_and_two() {
        let owner = AccountId::new("owner");
        let buyer = AccountId::new("buyer");
        let (market, _temp) = create_test_market(&owner).await;

        market.list(&owner, shoes(5)).await.unwrap();

        let first = market.buy(&buyer, 1, COST).await.unwrap();
        let second = market.buy(&buyer, 1, COST).await.unwrap();
        assert_eq!((first, second), (1, 2));

        let a = market.order_for(&buyer, 1).await.unwrap().unwrap();
        let b = market.order_for(&buyer, 2).await.unwrap().unwrap();
        assert!(b.placed_at >= a.placed_at);

        market.shutdown().await.unwrap();
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{ItemId, OrderId};
use tokio::sync::RwLock;

use crate::{
    InventoryItem, Order, Result, StoreError,
    store::{InventoryStore, StockDecrement, StockLevel, validate_commit},
};

/// In-memory inventory store for testing.
///
/// Stores items and orders in memory behind the same interface as the
/// PostgreSQL implementation, and adds failure injection: a whole-store
/// outage switch and a mid-commit failure point for verifying that
/// partial commits never become visible.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    items: Arc<RwLock<HashMap<ItemId, InventoryItem>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    unavailable: Arc<AtomicBool>,
    fail_after_decrements: Arc<RwLock<Option<usize>>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with catalog items.
    pub async fn with_items(items: Vec<InventoryItem>) -> Self {
        let store = Self::new();
        {
            let mut map = store.items.write().await;
            for item in items {
                map.insert(item.id.clone(), item);
            }
        }
        store
    }

    /// Simulates a whole-store outage: every operation fails with
    /// [`StoreError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Injects a failure after `n` decrements have been applied inside
    /// the next commit, before the transaction completes.
    pub async fn fail_after_decrements(&self, n: Option<usize>) {
        *self.fail_after_decrements.write().await = n;
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_item(&self, id: &ItemId) -> Result<Option<InventoryItem>> {
        self.check_available()?;
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Option<InventoryItem>>> {
        self.check_available()?;
        let items = self.items.read().await;
        Ok(ids.iter().map(|id| items.get(id).cloned()).collect())
    }

    async fn upsert_item(&self, item: InventoryItem) -> Result<()> {
        self.check_available()?;
        self.items.write().await.insert(item.id.clone(), item);
        Ok(())
    }

    async fn commit_order(
        &self,
        order: Order,
        decrements: Vec<StockDecrement>,
    ) -> Result<Vec<StockLevel>> {
        self.check_available()?;
        validate_commit(&order, &decrements)?;

        let mut items = self.items.write().await;
        let mut orders = self.orders.write().await;
        let fail_after = *self.fail_after_decrements.read().await;

        // All decrements are applied to a staged copy; the real map is
        // only replaced once every conditional write has succeeded.
        // A failure at any point leaves the store untouched.
        let mut staged = items.clone();
        let mut levels = Vec::with_capacity(decrements.len());

        for (applied, decrement) in decrements.iter().enumerate() {
            if fail_after == Some(applied) {
                return Err(StoreError::Internal(format!(
                    "injected failure after {applied} decrements"
                )));
            }

            let item = staged
                .get_mut(&decrement.item_id)
                .ok_or_else(|| StoreError::ItemNotFound(decrement.item_id.clone()))?;

            // Inactive items refuse decrements, matching the Postgres
            // conditional write (`... AND active`).
            if !item.active || item.available_quantity != decrement.expected_quantity {
                return Err(StoreError::Conflict {
                    item_id: decrement.item_id.clone(),
                    expected: decrement.expected_quantity,
                    actual: item.available_quantity,
                });
            }

            item.available_quantity = decrement.resulting_quantity();
            levels.push(StockLevel {
                item_id: decrement.item_id.clone(),
                available_quantity: item.available_quantity,
            });
        }

        if fail_after == Some(decrements.len()) {
            return Err(StoreError::Internal(format!(
                "injected failure after {} decrements",
                decrements.len()
            )));
        }

        orders.insert(order.id, order);
        *items = staged;
        Ok(levels)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        self.check_available()?;
        Ok(self.orders.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use common::Money;

    use super::*;
    use crate::{OrderLine, OrderStatus};

    fn item(id: &str, quantity: u32) -> InventoryItem {
        InventoryItem::new(id, format!("Item {id}"), "kg", Money::from_cents(120), quantity)
    }

    fn order_for(decrements: &[StockDecrement]) -> Order {
        let lines = decrements
            .iter()
            .map(|d| {
                OrderLine::new(
                    d.item_id.clone(),
                    format!("Item {}", d.item_id),
                    d.quantity,
                    Money::from_cents(120),
                )
            })
            .collect();
        Order::new(
            OrderId::generate(),
            lines,
            Money::from_cents(500),
            None,
            OrderStatus::Committed,
        )
    }

    #[tokio::test]
    async fn get_items_preserves_order_and_marks_missing() {
        let store =
            InMemoryInventoryStore::with_items(vec![item("ITEM-1", 5), item("ITEM-3", 2)]).await;

        let found = store
            .get_items(&["ITEM-1".into(), "ITEM-2".into(), "ITEM-3".into()])
            .await
            .unwrap();

        assert!(found[0].is_some());
        assert!(found[1].is_none());
        assert_eq!(found[2].as_ref().unwrap().available_quantity, 2);
    }

    #[tokio::test]
    async fn commit_decrements_and_persists_order() {
        let store = InMemoryInventoryStore::with_items(vec![item("ITEM-1", 5)]).await;
        let decrements = vec![StockDecrement::new("ITEM-1", 5, 3)];
        let order = order_for(&decrements);
        let order_id = order.id;

        let levels = store.commit_order(order, decrements).await.unwrap();

        assert_eq!(levels, vec![StockLevel {
            item_id: "ITEM-1".into(),
            available_quantity: 2,
        }]);
        let stored = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Committed);
        assert_eq!(
            store
                .get_item(&"ITEM-1".into())
                .await
                .unwrap()
                .unwrap()
                .available_quantity,
            2
        );
    }

    #[tokio::test]
    async fn commit_conflicts_when_quantity_changed() {
        let store = InMemoryInventoryStore::with_items(vec![item("ITEM-1", 4)]).await;
        // Decrement expects the quantity observed by a stale read.
        let decrements = vec![StockDecrement::new("ITEM-1", 5, 3)];
        let order = order_for(&decrements);
        let order_id = order.id;

        let result = store.commit_order(order, decrements).await;

        assert!(matches!(
            result,
            Err(StoreError::Conflict {
                expected: 5,
                actual: 4,
                ..
            })
        ));
        assert!(store.get_order(order_id).await.unwrap().is_none());
        assert_eq!(
            store
                .get_item(&"ITEM-1".into())
                .await
                .unwrap()
                .unwrap()
                .available_quantity,
            4
        );
    }

    #[tokio::test]
    async fn mid_commit_failure_leaves_no_partial_state() {
        let store =
            InMemoryInventoryStore::with_items(vec![item("ITEM-1", 5), item("ITEM-2", 5)]).await;
        store.fail_after_decrements(Some(1)).await;

        let decrements = vec![
            StockDecrement::new("ITEM-1", 5, 2),
            StockDecrement::new("ITEM-2", 5, 2),
        ];
        let order = order_for(&decrements);
        let order_id = order.id;

        let result = store.commit_order(order, decrements).await;
        assert!(matches!(result, Err(StoreError::Internal(_))));

        // First decrement was applied to the staged copy only.
        assert_eq!(
            store
                .get_item(&"ITEM-1".into())
                .await
                .unwrap()
                .unwrap()
                .available_quantity,
            5
        );
        assert!(store.get_order(order_id).await.unwrap().is_none());
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn conflict_in_second_line_rolls_back_first() {
        let store =
            InMemoryInventoryStore::with_items(vec![item("ITEM-1", 5), item("ITEM-2", 1)]).await;

        let decrements = vec![
            StockDecrement::new("ITEM-1", 5, 2),
            StockDecrement::new("ITEM-2", 2, 1), // stale expected quantity
        ];
        let order = order_for(&decrements);

        let result = store.commit_order(order, decrements).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(
            store
                .get_item(&"ITEM-1".into())
                .await
                .unwrap()
                .unwrap()
                .available_quantity,
            5
        );
    }

    #[tokio::test]
    async fn decrement_floors_at_zero() {
        let store = InMemoryInventoryStore::with_items(vec![item("ITEM-1", 2)]).await;
        let decrements = vec![StockDecrement::new("ITEM-1", 2, 2)];
        let order = order_for(&decrements);

        let levels = store.commit_order(order, decrements).await.unwrap();
        assert_eq!(levels[0].available_quantity, 0);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = InMemoryInventoryStore::with_items(vec![item("ITEM-1", 5)]).await;
        store.set_unavailable(true);

        assert!(matches!(
            store.get_item(&"ITEM-1".into()).await,
            Err(StoreError::Unavailable(_))
        ));

        let decrements = vec![StockDecrement::new("ITEM-1", 5, 1)];
        let order = order_for(&decrements);
        assert!(matches!(
            store.commit_order(order, decrements).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_unavailable(false);
        assert!(store.get_item(&"ITEM-1".into()).await.is_ok());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_item() {
        let store = InMemoryInventoryStore::with_items(vec![item("ITEM-1", 5)]).await;

        let mut updated = item("ITEM-1", 9);
        updated.price = Money::from_cents(150);
        store.upsert_item(updated).await.unwrap();

        let stored = store.get_item(&"ITEM-1".into()).await.unwrap().unwrap();
        assert_eq!(stored.available_quantity, 9);
        assert_eq!(stored.price, Money::from_cents(150));
    }
}

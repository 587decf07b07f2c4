use async_trait::async_trait;
use common::{ItemId, OrderId};
use serde::{Deserialize, Serialize};

use crate::{InventoryItem, Order, Result, StoreError};

/// A conditional stock decrement.
///
/// The write only succeeds if the row's `available_quantity` still
/// equals `expected_quantity` when the transaction applies it; the new
/// quantity is `max(expected_quantity - quantity, 0)`. This is the
/// optimistic-concurrency guard that prevents two simultaneous
/// checkouts from double-spending the same unit of stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDecrement {
    /// The item whose stock is decremented.
    pub item_id: ItemId,

    /// The quantity observed when the committing transaction read the row.
    pub expected_quantity: u32,

    /// Units to subtract, floored at zero.
    pub quantity: u32,
}

impl StockDecrement {
    /// Creates a decrement conditional on the observed quantity.
    pub fn new(item_id: impl Into<ItemId>, expected_quantity: u32, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            expected_quantity,
            quantity,
        }
    }

    /// The quantity the row will hold after this decrement applies.
    pub fn resulting_quantity(&self) -> u32 {
        self.expected_quantity.saturating_sub(self.quantity)
    }
}

/// Post-decrement stock level, returned for caller display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub item_id: ItemId,
    pub available_quantity: u32,
}

/// Core trait for inventory store implementations.
///
/// The store holds the inventory table (the optimistic-concurrency
/// guarded quantity per item) and the orders table (immutable order
/// records). All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Fetches a single item by id.
    ///
    /// Returns `Ok(None)` when the item does not exist; an `Err` means
    /// the store itself could not answer.
    async fn get_item(&self, id: &ItemId) -> Result<Option<InventoryItem>>;

    /// Fetches a batch of items, preserving input order.
    ///
    /// Missing items appear as `None` in the corresponding position. A
    /// whole-batch failure surfaces as [`StoreError::Unavailable`] so
    /// callers can distinguish an outage from a vanished item.
    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Option<InventoryItem>>>;

    /// Inserts or replaces a catalog item.
    ///
    /// Catalog management hook, used for seeding and tests; the
    /// checkout core itself never calls this.
    async fn upsert_item(&self, item: InventoryItem) -> Result<()>;

    /// Atomically persists an order and applies its stock decrements.
    ///
    /// Either the order record and every decrement become durable
    /// together, or none of them do. A failed conditional decrement
    /// aborts the whole transaction with [`StoreError::Conflict`].
    ///
    /// Returns the post-decrement stock levels in decrement order.
    async fn commit_order(
        &self,
        order: Order,
        decrements: Vec<StockDecrement>,
    ) -> Result<Vec<StockLevel>>;

    /// Fetches a persisted order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;
}

/// Validates a commit request before any write is attempted.
///
/// Every order line must be matched by exactly one decrement for the
/// same item with the same quantity, and quantities must be positive.
pub fn validate_commit(order: &Order, decrements: &[StockDecrement]) -> Result<()> {
    if order.lines.is_empty() {
        return Err(StoreError::InvalidCommit(
            "order has no lines".to_string(),
        ));
    }
    if order.lines.len() != decrements.len() {
        return Err(StoreError::InvalidCommit(format!(
            "order has {} lines but {} decrements",
            order.lines.len(),
            decrements.len()
        )));
    }

    for (line, decrement) in order.lines.iter().zip(decrements) {
        if line.item_id != decrement.item_id {
            return Err(StoreError::InvalidCommit(format!(
                "line for item {} paired with decrement for item {}",
                line.item_id, decrement.item_id
            )));
        }
        if line.quantity != decrement.quantity {
            return Err(StoreError::InvalidCommit(format!(
                "line quantity {} does not match decrement quantity {} for item {}",
                line.quantity, decrement.quantity, line.item_id
            )));
        }
        if decrement.quantity == 0 {
            return Err(StoreError::InvalidCommit(format!(
                "zero-quantity decrement for item {}",
                decrement.item_id
            )));
        }
    }

    Ok(())
}

use common::ItemId;
use inventory_store::StoreError;
use thiserror::Error;

use crate::cart::LineStatus;

/// Errors that can occur during reconciliation or commit.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart or reconciled line list is empty.
    #[error("Cart is empty")]
    EmptyCart,

    /// A line carries a zero quantity.
    #[error("Invalid quantity for item {item_id}: must be greater than 0")]
    InvalidQuantity { item_id: ItemId },

    /// A non-Ok line was submitted for commit. The caller must
    /// re-reconcile and let the user confirm the corrections first.
    #[error("Line for item {item_id} has status {status}; only Ok lines may be committed")]
    UnconfirmedLine { item_id: ItemId, status: LineStatus },

    /// The item vanished between reads. Not fatal during
    /// reconciliation (the line is dropped), fatal during commit.
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// Inventory changed between reconciliation and commit, or two
    /// commits raced. Recoverable by re-reconciling and re-submitting;
    /// never retried blindly with the same stale quantities.
    #[error("Conflict on item {item_id}: {reason}")]
    Conflict { item_id: ItemId, reason: String },

    /// The store is unreachable for the whole attempt. The commit path
    /// degrades to an unconfirmed acknowledgment instead of blocking.
    #[error("Inventory store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other transactional failure. Fully rolled back and safe to
    /// retry from scratch.
    #[error("Commit failed: {0}")]
    CommitFailure(String),
}

impl From<StoreError> for CheckoutError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(reason) => CheckoutError::StoreUnavailable(reason),
            StoreError::Conflict {
                item_id,
                expected,
                actual,
            } => CheckoutError::Conflict {
                item_id,
                reason: format!("stock changed concurrently: expected {expected}, found {actual}"),
            },
            StoreError::ItemNotFound(item_id) => CheckoutError::NotFound(item_id),
            other => CheckoutError::CommitFailure(other.to_string()),
        }
    }
}

use common::ItemId;
use thiserror::Error;

/// Errors that can occur when interacting with the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The item does not exist in the inventory table.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// A conditional decrement failed because the row's quantity changed
    /// between the read and the write. The losing transaction must be
    /// retried against re-reconciled quantities.
    #[error(
        "Concurrent modification of item {item_id}: expected quantity {expected}, found {actual}"
    )]
    Conflict {
        item_id: ItemId,
        expected: u32,
        actual: u32,
    },

    /// The store is unreachable for the whole operation. Distinguishable
    /// from a missing item so callers can enter degraded mode.
    #[error("Inventory store unavailable: {0}")]
    Unavailable(String),

    /// A commit request failed structural validation before any write.
    #[error("Invalid commit: {0}")]
    InvalidCommit(String),

    /// A stored record could not be interpreted.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend failure that aborted the transaction.
    #[error("Store backend error: {0}")]
    Internal(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

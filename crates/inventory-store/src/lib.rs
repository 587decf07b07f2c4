//! Authoritative inventory and order storage.
//!
//! This crate defines the [`InventoryStore`] trait — the single shared
//! mutable resource of the checkout engine — together with the records
//! it holds ([`InventoryItem`], [`Order`]) and two implementations: an
//! in-memory store for tests and a PostgreSQL-backed store.
//!
//! All stock mutation goes through [`InventoryStore::commit_order`],
//! which persists the order and applies conditional decrements as one
//! atomic unit.

mod error;
mod item;
mod memory;
mod order;
mod postgres;
mod store;

pub use common::{ItemId, Money, OrderId};
pub use error::{Result, StoreError};
pub use item::InventoryItem;
pub use memory::InMemoryInventoryStore;
pub use order::{Order, OrderLine, OrderStatus};
pub use postgres::PostgresInventoryStore;
pub use store::{InventoryStore, StockDecrement, StockLevel, validate_commit};

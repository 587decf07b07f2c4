//! Shared types for the cart reconciliation and order commit engine.

mod money;
mod types;

pub use money::Money;
pub use types::{ItemId, OrderId};

use common::{ItemId, Money};
use serde::{Deserialize, Serialize};

/// Authoritative record of a sellable item.
///
/// Created by catalog management (out of scope here beyond the upsert
/// hook); its quantity is adjusted only by committed orders. Items
/// referenced by historical orders are soft-deactivated via `active`,
/// never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Stable item identifier.
    pub id: ItemId,

    /// Human-readable item name.
    pub name: String,

    /// Selling unit (e.g. "kg", "crate", "piece").
    pub unit: String,

    /// Price per unit. Always strictly positive.
    pub price: Money,

    /// Units currently available for sale.
    pub available_quantity: u32,

    /// False once the item has been soft-deactivated.
    pub active: bool,
}

impl InventoryItem {
    /// Creates a new active inventory item.
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        unit: impl Into<String>,
        price: Money,
        available_quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
            price,
            available_quantity,
            active: true,
        }
    }

    /// Returns a copy of this item with `active` set to false.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns true if the item can currently appear in a cart at all.
    pub fn is_listed(&self) -> bool {
        self.active
    }

    /// Returns true if at least one unit can be sold right now.
    pub fn in_stock(&self) -> bool {
        self.active && self.available_quantity > 0
    }
}

//! Cart line types: the client-submitted cart and its reconciled form.

use common::{ItemId, Money};
use serde::{Deserialize, Serialize};

/// A client-submitted cart line.
///
/// Holds a weak reference to an inventory item plus the desired
/// quantity. The cached price and name are advisory display values the
/// client last saw; they are never trusted for commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_name: Option<String>,
}

impl CartLine {
    /// Creates a cart line for an item and quantity.
    pub fn new(item_id: impl Into<ItemId>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            cached_price: None,
            cached_name: None,
        }
    }

    /// Attaches the client's last-seen price and name.
    pub fn with_cached(mut self, price: Money, name: impl Into<String>) -> Self {
        self.cached_price = Some(price);
        self.cached_name = Some(name.into());
        self
    }
}

/// Outcome of reconciling one cart line against inventory truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStatus {
    /// Requested quantity is fully available at the authoritative price.
    Ok,

    /// Requested quantity exceeded availability; quantity was clamped.
    QuantityReduced,

    /// The item is currently out of stock (clamped quantity is zero).
    Unavailable,

    /// The item is inactive or vanished; the line was dropped.
    Removed,
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LineStatus::Ok => "Ok",
            LineStatus::QuantityReduced => "QuantityReduced",
            LineStatus::Unavailable => "Unavailable",
            LineStatus::Removed => "Removed",
        };
        write!(f, "{s}")
    }
}

/// A cart line corrected against the inventory snapshot.
///
/// Produced fresh on every reconciliation call and never persisted.
/// `price`, `name` and `unit` are authoritative values read from the
/// store; `quantity` is `min(requested_quantity, available)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledCartLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit: String,
    pub price: Money,
    pub requested_quantity: u32,
    pub quantity: u32,
    pub status: LineStatus,
}

impl ReconciledCartLine {
    /// Returns the clamped line total (`price * quantity`).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Full result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Corrected lines, in cart order. Removed lines are not included.
    pub lines: Vec<ReconciledCartLine>,

    /// Items whose lines were dropped (inactive or vanished).
    pub removed: Vec<ItemId>,
}

impl Reconciliation {
    /// True when every surviving line is `Ok` and nothing was removed,
    /// i.e. the cart can go straight to commit without user confirmation.
    pub fn all_ok(&self) -> bool {
        self.removed.is_empty() && self.lines.iter().all(|l| l.status == LineStatus::Ok)
    }

    /// Subtotal over the clamped quantities.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(|l| l.line_total()).sum()
    }
}

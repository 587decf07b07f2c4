use chrono::{DateTime, Utc};
use common::{ItemId, Money, OrderId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created but not yet committed against inventory.
    Pending,

    /// Durably persisted together with its inventory decrements.
    Committed,

    /// Acknowledged while the store was unreachable. Carries no
    /// inventory guarantee until promoted by a successful re-commit.
    DegradedUnconfirmed,

    /// A degraded order whose retries were exhausted or rejected.
    Failed,
}

impl OrderStatus {
    /// Returns the canonical string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Committed => "Committed",
            OrderStatus::DegradedUnconfirmed => "DegradedUnconfirmed",
            OrderStatus::Failed => "Failed",
        }
    }

    /// Parses the canonical string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "Committed" => Some(OrderStatus::Committed),
            "DegradedUnconfirmed" => Some(OrderStatus::DegradedUnconfirmed),
            "Failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of one ordered line.
///
/// Values are captured at commit time and never updated afterwards,
/// even if the catalog item changes or is deactivated later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl OrderLine {
    /// Creates a line snapshot, computing the line total.
    pub fn new(
        item_id: impl Into<ItemId>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            quantity,
            unit_price,
            line_total: unit_price.multiply(quantity),
        }
    }
}

/// An order record with embedded immutable line snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub grand_total: Money,
    pub status: OrderStatus,
    pub customer_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order, computing totals from the line snapshots.
    pub fn new(
        id: OrderId,
        lines: Vec<OrderLine>,
        delivery_fee: Money,
        customer_ref: Option<String>,
        status: OrderStatus,
    ) -> Self {
        let subtotal: Money = lines.iter().map(|l| l.line_total).sum();
        Self {
            id,
            lines,
            subtotal,
            delivery_fee,
            grand_total: subtotal + delivery_fee,
            status,
            customer_ref,
            created_at: Utc::now(),
        }
    }

    /// Returns a copy of this order with a different status. Line
    /// snapshots and totals are never touched.
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }
}

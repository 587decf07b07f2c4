//! Cart reconciliation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use checkout::{CartLine, LineStatus, ReconciledCartLine};
use common::Money;
use inventory_store::InventoryStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::orders::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct ReconcileRequest {
    pub lines: Vec<CartLineRequest>,
}

#[derive(Deserialize)]
pub struct CartLineRequest {
    pub item_id: String,
    pub quantity: u32,
    /// Last price the client displayed; advisory only.
    #[serde(default)]
    pub cached_price_cents: Option<i64>,
    #[serde(default)]
    pub cached_name: Option<String>,
}

// -- Response types --

/// Wire form of a reconciled line. Also accepted back verbatim by
/// `POST /orders`, closing the reconcile-then-confirm loop.
#[derive(Serialize, Deserialize, Clone)]
pub struct ReconciledLineDto {
    pub item_id: String,
    pub name: String,
    pub unit: String,
    pub price_cents: i64,
    pub requested_quantity: u32,
    pub quantity: u32,
    pub status: LineStatus,
}

impl From<ReconciledCartLine> for ReconciledLineDto {
    fn from(line: ReconciledCartLine) -> Self {
        Self {
            item_id: line.item_id.to_string(),
            name: line.name,
            unit: line.unit,
            price_cents: line.price.cents(),
            requested_quantity: line.requested_quantity,
            quantity: line.quantity,
            status: line.status,
        }
    }
}

impl From<ReconciledLineDto> for ReconciledCartLine {
    fn from(dto: ReconciledLineDto) -> Self {
        Self {
            item_id: dto.item_id.into(),
            name: dto.name,
            unit: dto.unit,
            price: Money::from_cents(dto.price_cents),
            requested_quantity: dto.requested_quantity,
            quantity: dto.quantity,
            status: dto.status,
        }
    }
}

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub lines: Vec<ReconciledLineDto>,
    pub removed: Vec<String>,
    /// True when the cart can be committed without user confirmation.
    pub all_ok: bool,
    pub subtotal_cents: i64,
}

// -- Handlers --

/// POST /cart/reconcile — revalidate a client cart against inventory.
///
/// Read-only and safe to call at high frequency.
#[tracing::instrument(skip(state, req))]
pub async fn reconcile<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let cart: Vec<CartLine> = req
        .lines
        .into_iter()
        .map(|l| {
            let mut line = CartLine::new(l.item_id, l.quantity);
            line.cached_price = l.cached_price_cents.map(Money::from_cents);
            line.cached_name = l.cached_name;
            line
        })
        .collect();

    let reconciliation = state.reconciler.reconcile(&cart).await?;

    Ok(Json(ReconcileResponse {
        all_ok: reconciliation.all_ok(),
        subtotal_cents: reconciliation.subtotal().cents(),
        removed: reconciliation
            .removed
            .iter()
            .map(ToString::to_string)
            .collect(),
        lines: reconciliation.lines.into_iter().map(Into::into).collect(),
    }))
}

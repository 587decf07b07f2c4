//! Order commit and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{
    CartReconciler, CheckoutError, CheckoutOutcome, CommitEngine, CommitOutcome,
    ReconciledCartLine, RetryOutcome, RetryQueue,
};
use common::{Money, OrderId};
use inventory_store::{InventoryStore, Order, StockLevel};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::cart::ReconciledLineDto;

/// Shared application state accessible from all handlers.
pub struct AppState<S: InventoryStore> {
    pub reconciler: CartReconciler<S>,
    pub engine: CommitEngine<S>,
    pub retries: Arc<RetryQueue>,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CommitOrderRequest {
    /// Reconciled lines as returned by `POST /cart/reconcile`. Must all
    /// carry status `Ok`; anything else means the user has not
    /// confirmed the corrections and the request is rejected.
    pub lines: Vec<ReconciledLineDto>,
    pub delivery_fee_cents: i64,
    #[serde(default)]
    pub customer_ref: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct StockLevelResponse {
    pub item_id: String,
    pub available_quantity: u32,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub lines: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    pub grand_total_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_ref: Option<String>,
    pub created_at: String,
    /// Post-commit stock per line; present only for committed orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<Vec<StockLevelResponse>>,
    /// Terminal failure reason for degraded orders that were rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl OrderResponse {
    fn from_order(order: Order, stock: Option<Vec<StockLevel>>) -> Self {
        Self {
            order_id: order.id.to_string(),
            status: order.status.to_string(),
            lines: order
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    item_id: l.item_id.to_string(),
                    name: l.name,
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price.cents(),
                    line_total_cents: l.line_total.cents(),
                })
                .collect(),
            subtotal_cents: order.subtotal.cents(),
            delivery_fee_cents: order.delivery_fee.cents(),
            grand_total_cents: order.grand_total.cents(),
            customer_ref: order.customer_ref,
            created_at: order.created_at.to_rfc3339(),
            stock: stock.map(|levels| {
                levels
                    .into_iter()
                    .map(|s| StockLevelResponse {
                        item_id: s.item_id.to_string(),
                        available_quantity: s.available_quantity,
                    })
                    .collect()
            }),
            failure_reason: None,
        }
    }

    fn committed(outcome: CommitOutcome) -> Self {
        Self::from_order(outcome.order, Some(outcome.stock))
    }
}

// -- Handlers --

/// POST /orders — commit a reconciled cart as an order.
///
/// Responds 201 when committed, 409 on conflict (re-reconcile and
/// re-submit), and 200 with status `DegradedUnconfirmed` when the
/// inventory store is down.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CommitOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    if req.delivery_fee_cents < 0 {
        return Err(ApiError::BadRequest(
            "delivery_fee_cents must not be negative".to_string(),
        ));
    }

    let lines: Vec<ReconciledCartLine> = req.lines.into_iter().map(Into::into).collect();
    let delivery_fee = Money::from_cents(req.delivery_fee_cents);

    let outcome = state
        .engine
        .checkout(&lines, delivery_fee, req.customer_ref)
        .await?;

    match outcome {
        CheckoutOutcome::Committed(outcome) => Ok((
            StatusCode::CREATED,
            Json(OrderResponse::committed(outcome)),
        )),
        CheckoutOutcome::Degraded(order) => {
            Ok((StatusCode::OK, Json(OrderResponse::from_order(order, None))))
        }
    }
}

/// GET /orders/{id} — look up an order by id.
///
/// Checks the degraded-order queue before the store so an order
/// acknowledged during an outage stays visible while the store is
/// still down, then falls through to retry resolutions.
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;

    if let Some(order) = state.retries.pending_order(order_id).await {
        return Ok(Json(OrderResponse::from_order(order, None)));
    }

    let stored = state
        .store
        .get_order(order_id)
        .await
        .map_err(CheckoutError::from)?;
    if let Some(order) = stored {
        return Ok(Json(OrderResponse::from_order(order, None)));
    }

    if let Some(RetryOutcome::Failed { reason }) = state.retries.resolution(order_id).await {
        return Err(ApiError::NotFound(format!(
            "Order {id} was not committed: {reason}"
        )));
    }

    Err(ApiError::NotFound(format!("Order {id} not found")))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

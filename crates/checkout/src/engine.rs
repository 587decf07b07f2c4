//! The order commit engine: atomic checkout against inventory.

use std::sync::Arc;
use std::time::Instant;

use common::{Money, OrderId};
use inventory_store::{InventoryStore, Order, OrderLine, OrderStatus, StockDecrement, StockLevel};

use crate::cart::{LineStatus, ReconciledCartLine};
use crate::error::CheckoutError;
use crate::fallback::{PendingCommit, RetryQueue};

/// A successfully committed order with its post-decrement stock levels.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub order: Order,
    pub stock: Vec<StockLevel>,
}

/// Result of a checkout attempt, including the degraded path.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// The order and its decrements are durable.
    Committed(CommitOutcome),

    /// The store was unreachable; this acknowledgment carries no
    /// inventory guarantee and awaits retry resolution.
    Degraded(Order),
}

/// Commits reconciled carts as atomic order-plus-decrement transactions.
///
/// Callable only with lines whose status is [`LineStatus::Ok`]: the
/// user must have seen and accepted any corrections before money
/// changes hands, so anything else is rejected and the caller is sent
/// back to reconciliation. First transaction to commit wins; losers get
/// a `Conflict` and must re-reconcile against the now-lower quantity.
pub struct CommitEngine<S> {
    store: S,
    retries: Arc<RetryQueue>,
}

impl<S: InventoryStore + Clone> CommitEngine<S> {
    /// Creates an engine committing against the given store, parking
    /// degraded attempts on the given retry queue.
    pub fn new(store: S, retries: Arc<RetryQueue>) -> Self {
        Self { store, retries }
    }

    /// Returns the retry queue degraded attempts are parked on.
    pub fn retry_queue(&self) -> &Arc<RetryQueue> {
        &self.retries
    }

    /// Commits an order, falling back to a degraded acknowledgment when
    /// the store is unreachable for the whole attempt.
    ///
    /// Row-level conflicts are NOT degraded: they propagate as
    /// [`CheckoutError::Conflict`] because the remedy is re-reconciling,
    /// not waiting for the store to recover.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn checkout(
        &self,
        lines: &[ReconciledCartLine],
        delivery_fee: Money,
        customer_ref: Option<String>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        match self.commit(lines, delivery_fee, customer_ref.clone()).await {
            Ok(outcome) => Ok(CheckoutOutcome::Committed(outcome)),
            Err(CheckoutError::StoreUnavailable(reason)) => {
                // Synthesize an acknowledgment from the client-held
                // (unvalidated) snapshot so the caller is never blocked,
                // and park the attempt for bounded retries.
                let order = degraded_order(lines, delivery_fee, customer_ref.clone());
                tracing::warn!(
                    order_id = %order.id,
                    %reason,
                    "store unreachable, acknowledging order as degraded"
                );
                metrics::counter!("checkout_degraded_total").increment(1);

                self.retries
                    .enqueue(PendingCommit::new(
                        order.clone(),
                        lines.to_vec(),
                        delivery_fee,
                        customer_ref,
                    ))
                    .await;

                Ok(CheckoutOutcome::Degraded(order))
            }
            Err(other) => Err(other),
        }
    }

    /// Commits an order with a freshly generated id.
    pub async fn commit(
        &self,
        lines: &[ReconciledCartLine],
        delivery_fee: Money,
        customer_ref: Option<String>,
    ) -> Result<CommitOutcome, CheckoutError> {
        self.commit_as(OrderId::generate(), lines, delivery_fee, customer_ref)
            .await
    }

    /// Commits an order under a caller-chosen id.
    ///
    /// Used by the retry worker so a promoted degraded order keeps the
    /// id it was acknowledged under.
    pub(crate) async fn commit_as(
        &self,
        order_id: OrderId,
        lines: &[ReconciledCartLine],
        delivery_fee: Money,
        customer_ref: Option<String>,
    ) -> Result<CommitOutcome, CheckoutError> {
        validate_lines(lines)?;
        let started = Instant::now();

        // Re-read authoritative truth inside the commit attempt. The
        // quantities observed here become the preconditions of the
        // conditional decrements below.
        let ids: Vec<_> = lines.iter().map(|l| l.item_id.clone()).collect();
        let items = self.store.get_items(&ids).await?;

        let mut order_lines = Vec::with_capacity(lines.len());
        let mut decrements = Vec::with_capacity(lines.len());

        for (line, item) in lines.iter().zip(items) {
            let item = match item {
                Some(item) if item.is_listed() => item,
                _ => {
                    return Err(conflict(line, "item is no longer available"));
                }
            };
            if line.quantity > item.available_quantity {
                metrics::counter!("checkout_conflicts_total").increment(1);
                return Err(conflict(line, "insufficient stock, re-reconcile required"));
            }
            if line.price != item.price {
                metrics::counter!("checkout_conflicts_total").increment(1);
                return Err(conflict(line, "price changed since reconciliation"));
            }

            order_lines.push(OrderLine::new(
                item.id.clone(),
                item.name.clone(),
                line.quantity,
                item.price,
            ));
            decrements.push(StockDecrement::new(
                item.id,
                item.available_quantity,
                line.quantity,
            ));
        }

        let order = Order::new(
            order_id,
            order_lines,
            delivery_fee,
            customer_ref,
            OrderStatus::Committed,
        );

        let stock = self
            .store
            .commit_order(order.clone(), decrements)
            .await
            .inspect_err(|e| {
                if matches!(e, inventory_store::StoreError::Conflict { .. }) {
                    metrics::counter!("checkout_conflicts_total").increment(1);
                }
            })?;

        metrics::counter!("checkout_commits_total").increment(1);
        metrics::histogram!("checkout_commit_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id, total = %order.grand_total, "order committed");

        Ok(CommitOutcome { order, stock })
    }
}

fn validate_lines(lines: &[ReconciledCartLine]) -> Result<(), CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    for line in lines {
        if line.status != LineStatus::Ok {
            return Err(CheckoutError::UnconfirmedLine {
                item_id: line.item_id.clone(),
                status: line.status,
            });
        }
        if line.quantity == 0 {
            return Err(CheckoutError::InvalidQuantity {
                item_id: line.item_id.clone(),
            });
        }
    }
    Ok(())
}

fn conflict(line: &ReconciledCartLine, reason: &str) -> CheckoutError {
    CheckoutError::Conflict {
        item_id: line.item_id.clone(),
        reason: reason.to_string(),
    }
}

/// Builds the unconfirmed order acknowledged during a store outage.
///
/// Totals come from the client-held reconciled lines and are explicitly
/// unvalidated; the order never counts as fulfilling inventory
/// guarantees until re-committed through the full transaction.
fn degraded_order(
    lines: &[ReconciledCartLine],
    delivery_fee: Money,
    customer_ref: Option<String>,
) -> Order {
    let order_lines = lines
        .iter()
        .map(|l| OrderLine::new(l.item_id.clone(), l.name.clone(), l.quantity, l.price))
        .collect();
    Order::new(
        OrderId::generate(),
        order_lines,
        delivery_fee,
        customer_ref,
        OrderStatus::DegradedUnconfirmed,
    )
}

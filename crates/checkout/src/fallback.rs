//! Degraded-mode fallback: bounded retries for unconfirmed orders.
//!
//! When the inventory store is unreachable, the engine acknowledges the
//! order as `DegradedUnconfirmed` and parks the attempt here. The
//! [`RetryWorker`] re-runs the full commit transaction (never a
//! shortcut promotion) until it succeeds, is rejected, or the attempt
//! budget is exhausted.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use common::{Money, OrderId};
use inventory_store::{InventoryStore, Order};
use tokio::sync::{Mutex, RwLock};

use crate::cart::ReconciledCartLine;
use crate::engine::CommitEngine;
use crate::error::CheckoutError;

/// Bounds for the retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum commit attempts per degraded order (the initial failed
    /// attempt is not counted).
    pub max_attempts: u32,

    /// Delay between retry passes.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(2),
        }
    }
}

/// A commit attempt waiting for the store to recover.
#[derive(Debug, Clone)]
pub struct PendingCommit {
    /// The degraded acknowledgment handed to the caller.
    pub order: Order,

    /// The reconciled lines the commit will be re-run with.
    pub lines: Vec<ReconciledCartLine>,

    pub delivery_fee: Money,
    pub customer_ref: Option<String>,

    /// Retry attempts consumed so far.
    pub attempts: u32,
}

impl PendingCommit {
    /// Creates a pending commit with no attempts consumed.
    pub fn new(
        order: Order,
        lines: Vec<ReconciledCartLine>,
        delivery_fee: Money,
        customer_ref: Option<String>,
    ) -> Self {
        Self {
            order,
            lines,
            delivery_fee,
            customer_ref,
            attempts: 0,
        }
    }
}

/// Terminal resolution of a degraded order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The full commit transaction eventually succeeded; the order is
    /// durable in the store under its original id.
    Committed,

    /// The retry was rejected or the attempt budget ran out. The order
    /// never affected inventory.
    Failed { reason: String },
}

/// Queue of degraded commit attempts plus their resolutions.
#[derive(Default)]
pub struct RetryQueue {
    pending: Mutex<VecDeque<PendingCommit>>,
    resolutions: RwLock<HashMap<OrderId, RetryOutcome>>,
}

impl RetryQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a degraded commit attempt.
    pub async fn enqueue(&self, pending: PendingCommit) {
        self.pending.lock().await.push_back(pending);
    }

    /// Number of attempts currently waiting.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// True when nothing is waiting.
    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Looks up a still-unresolved degraded order by id.
    pub async fn pending_order(&self, order_id: OrderId) -> Option<Order> {
        self.pending
            .lock()
            .await
            .iter()
            .find(|p| p.order.id == order_id)
            .map(|p| p.order.clone())
    }

    /// Looks up the terminal resolution of a degraded order, if any.
    pub async fn resolution(&self, order_id: OrderId) -> Option<RetryOutcome> {
        self.resolutions.read().await.get(&order_id).cloned()
    }

    async fn take_pending(&self) -> Vec<PendingCommit> {
        self.pending.lock().await.drain(..).collect()
    }

    async fn requeue(&self, pending: PendingCommit) {
        self.pending.lock().await.push_back(pending);
    }

    async fn resolve(&self, order_id: OrderId, outcome: RetryOutcome) {
        self.resolutions.write().await.insert(order_id, outcome);
    }
}

/// Background worker resolving degraded orders against the store.
pub struct RetryWorker<S> {
    engine: CommitEngine<S>,
    queue: Arc<RetryQueue>,
    policy: RetryPolicy,
}

impl<S> RetryWorker<S>
where
    S: InventoryStore + Clone + Send + Sync + 'static,
{
    /// Creates a worker draining `queue` through `engine`.
    pub fn new(engine: CommitEngine<S>, queue: Arc<RetryQueue>, policy: RetryPolicy) -> Self {
        Self {
            engine,
            queue,
            policy,
        }
    }

    /// Processes every currently pending attempt once.
    ///
    /// Returns how many attempts reached a terminal resolution. Exposed
    /// separately from [`spawn`](Self::spawn) so tests can drive the
    /// retry loop deterministically.
    pub async fn run_once(&self) -> usize {
        let batch = self.queue.take_pending().await;
        let mut resolved = 0;

        for mut pending in batch {
            pending.attempts += 1;
            let order_id = pending.order.id;

            let result = self
                .engine
                .commit_as(
                    order_id,
                    &pending.lines,
                    pending.delivery_fee,
                    pending.customer_ref.clone(),
                )
                .await;

            match result {
                Ok(_) => {
                    tracing::info!(%order_id, "degraded order promoted to committed");
                    metrics::counter!("checkout_retry_resolutions_total", "outcome" => "committed")
                        .increment(1);
                    self.queue.resolve(order_id, RetryOutcome::Committed).await;
                    resolved += 1;
                }
                Err(CheckoutError::StoreUnavailable(reason)) => {
                    if pending.attempts >= self.policy.max_attempts {
                        tracing::warn!(
                            %order_id,
                            attempts = pending.attempts,
                            "retry budget exhausted, failing degraded order"
                        );
                        metrics::counter!("checkout_retry_resolutions_total", "outcome" => "exhausted")
                            .increment(1);
                        self.queue
                            .resolve(order_id, RetryOutcome::Failed {
                                reason: format!(
                                    "store unavailable after {} attempts: {reason}",
                                    pending.attempts
                                ),
                            })
                            .await;
                        resolved += 1;
                    } else {
                        self.queue.requeue(pending).await;
                    }
                }
                Err(other) => {
                    // Conflicts and commit failures are terminal: the
                    // reconciled quantities are stale and must not be
                    // silently adjusted on the user's behalf.
                    tracing::warn!(%order_id, error = %other, "degraded order rejected on retry");
                    metrics::counter!("checkout_retry_resolutions_total", "outcome" => "rejected")
                        .increment(1);
                    self.queue
                        .resolve(order_id, RetryOutcome::Failed {
                            reason: other.to_string(),
                        })
                        .await;
                    resolved += 1;
                }
            }
        }

        resolved
    }

    /// Spawns the retry loop as a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.policy.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !self.queue.is_empty().await {
                    self.run_once().await;
                }
            }
        })
    }
}

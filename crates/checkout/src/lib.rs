//! Cart reconciliation and order commit engine.
//!
//! The checkout flow is a deliberate two-phase protocol:
//!
//! 1. [`CartReconciler::reconcile`] revalidates a client-held cart
//!    against authoritative inventory, correcting prices and clamping
//!    quantities. It is read-only and safe to call at any rate.
//! 2. [`CommitEngine::checkout`] consumes accepted reconciled lines and
//!    commits the order atomically: order record and stock decrements
//!    succeed or fail as one unit, guarded by optimistic concurrency.
//!
//! When the inventory store is unreachable, the engine answers with a
//! [`inventory_store::OrderStatus::DegradedUnconfirmed`] order and
//! hands the attempt to the [`RetryWorker`], which re-runs the full
//! commit once the store recovers.

mod cart;
mod engine;
mod error;
mod fallback;
mod reconciler;

pub use cart::{CartLine, LineStatus, ReconciledCartLine, Reconciliation};
pub use engine::{CheckoutOutcome, CommitEngine, CommitOutcome};
pub use error::CheckoutError;
pub use fallback::{PendingCommit, RetryOutcome, RetryPolicy, RetryQueue, RetryWorker};
pub use reconciler::CartReconciler;

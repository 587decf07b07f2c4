//! Cart reconciliation against authoritative inventory.

use common::ItemId;
use inventory_store::InventoryStore;

use crate::cart::{CartLine, LineStatus, ReconciledCartLine, Reconciliation};
use crate::error::CheckoutError;

/// Revalidates client-held carts against the inventory store.
///
/// Reconciliation is pure with respect to the store snapshot: it never
/// writes, so it is safe to call on every cart mutation and once more
/// as the pre-checkout validation gate. Client-supplied prices are
/// always ignored in favor of the store's.
pub struct CartReconciler<S> {
    store: S,
}

impl<S: InventoryStore> CartReconciler<S> {
    /// Creates a reconciler reading from the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconciles a client-submitted cart.
    ///
    /// Lines for missing or inactive items are dropped and reported in
    /// `removed`; out-of-stock lines become `Unavailable`; over-requested
    /// lines are clamped to availability as `QuantityReduced`. A
    /// whole-batch read failure propagates as
    /// [`CheckoutError::StoreUnavailable`], distinguishable from any
    /// single item having vanished.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn reconcile(&self, lines: &[CartLine]) -> Result<Reconciliation, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Merge duplicate item ids, preserving first-seen order.
        let mut merged: Vec<(ItemId, u32)> = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity == 0 {
                return Err(CheckoutError::InvalidQuantity {
                    item_id: line.item_id.clone(),
                });
            }
            match merged.iter_mut().find(|(id, _)| *id == line.item_id) {
                Some((_, quantity)) => *quantity += line.quantity,
                None => merged.push((line.item_id.clone(), line.quantity)),
            }
        }

        let ids: Vec<ItemId> = merged.iter().map(|(id, _)| id.clone()).collect();
        let items = self.store.get_items(&ids).await?;

        let mut reconciliation = Reconciliation::default();
        for ((item_id, requested), item) in merged.into_iter().zip(items) {
            let item = match item {
                Some(item) if item.is_listed() => item,
                // Inactive or vanished: drop the line entirely.
                _ => {
                    tracing::debug!(%item_id, "dropping line for unlisted item");
                    reconciliation.removed.push(item_id);
                    continue;
                }
            };

            let (status, quantity) = if item.available_quantity == 0 {
                (LineStatus::Unavailable, 0)
            } else if requested > item.available_quantity {
                (LineStatus::QuantityReduced, item.available_quantity)
            } else {
                (LineStatus::Ok, requested)
            };

            reconciliation.lines.push(ReconciledCartLine {
                item_id,
                name: item.name,
                unit: item.unit,
                price: item.price,
                requested_quantity: requested,
                quantity,
                status,
            });
        }

        Ok(reconciliation)
    }
}

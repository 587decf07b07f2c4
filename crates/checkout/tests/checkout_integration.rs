//! End-to-end checkout flows against the in-memory store.

use std::sync::Arc;

use checkout::{
    CartLine, CartReconciler, CheckoutError, CheckoutOutcome, CommitEngine, LineStatus,
    RetryOutcome, RetryPolicy, RetryQueue, RetryWorker,
};
use common::Money;
use inventory_store::{InMemoryInventoryStore, InventoryItem, InventoryStore, OrderStatus};

fn item(id: &str, price_cents: i64, quantity: u32) -> InventoryItem {
    InventoryItem::new(id, format!("Item {id}"), "kg", Money::from_cents(price_cents), quantity)
}

struct Checkout {
    store: InMemoryInventoryStore,
    reconciler: CartReconciler<InMemoryInventoryStore>,
    engine: CommitEngine<InMemoryInventoryStore>,
    queue: Arc<RetryQueue>,
}

async fn setup(items: Vec<InventoryItem>) -> Checkout {
    let store = InMemoryInventoryStore::with_items(items).await;
    let queue = Arc::new(RetryQueue::new());
    Checkout {
        reconciler: CartReconciler::new(store.clone()),
        engine: CommitEngine::new(store.clone(), queue.clone()),
        store,
        queue,
    }
}

#[tokio::test]
async fn reconcile_then_commit_happy_path() {
    // Item X: price 120, 5 available; cart requests 3.
    let ctx = setup(vec![item("ITEM-X", 120, 5)]).await;

    let reconciliation = ctx
        .reconciler
        .reconcile(&[CartLine::new("ITEM-X", 3)])
        .await
        .unwrap();
    assert!(reconciliation.all_ok());
    let line = &reconciliation.lines[0];
    assert_eq!(line.status, LineStatus::Ok);
    assert_eq!(line.price, Money::from_cents(120));
    assert_eq!(line.quantity, 3);

    let outcome = ctx
        .engine
        .commit(&reconciliation.lines, Money::from_cents(500), None)
        .await
        .unwrap();

    assert_eq!(outcome.order.status, OrderStatus::Committed);
    assert_eq!(outcome.order.subtotal.cents(), 360);
    assert_eq!(outcome.order.grand_total.cents(), 860);
    assert_eq!(
        ctx.store
            .get_item(&"ITEM-X".into())
            .await
            .unwrap()
            .unwrap()
            .available_quantity,
        2
    );
}

#[tokio::test]
async fn clamped_cart_requires_confirmation_before_commit() {
    // Item Y: 2 available; cart requests 5.
    let ctx = setup(vec![item("ITEM-Y", 100, 2)]).await;

    let reconciliation = ctx
        .reconciler
        .reconcile(&[CartLine::new("ITEM-Y", 5)])
        .await
        .unwrap();
    let line = &reconciliation.lines[0];
    assert_eq!(line.status, LineStatus::QuantityReduced);
    assert_eq!(line.quantity, 2);

    // Committing the unconfirmed reduction is rejected outright.
    let rejected = ctx
        .engine
        .commit(&reconciliation.lines, Money::zero(), None)
        .await;
    assert!(matches!(
        rejected,
        Err(CheckoutError::UnconfirmedLine { .. })
    ));

    // The user accepts quantity 2 and the cart is re-reconciled.
    let confirmed = ctx
        .reconciler
        .reconcile(&[CartLine::new("ITEM-Y", 2)])
        .await
        .unwrap();
    assert!(confirmed.all_ok());
    let outcome = ctx
        .engine
        .commit(&confirmed.lines, Money::zero(), None)
        .await
        .unwrap();
    assert_eq!(outcome.stock[0].available_quantity, 0);
}

#[tokio::test]
async fn loser_of_a_race_re_reconciles_and_sees_reality() {
    let ctx = setup(vec![item("ITEM-R", 100, 1)]).await;

    let lines = ctx
        .reconciler
        .reconcile(&[CartLine::new("ITEM-R", 1)])
        .await
        .unwrap()
        .lines;

    // Winner takes the last unit.
    ctx.engine.commit(&lines, Money::zero(), None).await.unwrap();

    // Loser conflicts with its stale reconciliation...
    let lost = ctx.engine.commit(&lines, Money::zero(), None).await;
    assert!(matches!(lost, Err(CheckoutError::Conflict { .. })));

    // ...and a fresh reconciliation shows the item as unavailable.
    let after = ctx
        .reconciler
        .reconcile(&[CartLine::new("ITEM-R", 1)])
        .await
        .unwrap();
    assert_eq!(after.lines[0].status, LineStatus::Unavailable);
}

#[tokio::test]
async fn outage_checkout_is_acknowledged_then_promoted_on_recovery() {
    let ctx = setup(vec![item("ITEM-D", 120, 5)]).await;

    let lines = ctx
        .reconciler
        .reconcile(&[CartLine::new("ITEM-D", 2)])
        .await
        .unwrap()
        .lines;

    ctx.store.set_unavailable(true);
    let outcome = ctx
        .engine
        .checkout(&lines, Money::from_cents(500), Some("customer-9".to_string()))
        .await
        .unwrap();
    let degraded = match outcome {
        CheckoutOutcome::Degraded(order) => order,
        CheckoutOutcome::Committed(_) => panic!("store was down, commit must not succeed"),
    };
    assert_eq!(degraded.status, OrderStatus::DegradedUnconfirmed);

    // Nothing was persisted while the store was down.
    ctx.store.set_unavailable(false);
    assert_eq!(ctx.store.order_count().await, 0);
    assert_eq!(
        ctx.store
            .get_item(&"ITEM-D".into())
            .await
            .unwrap()
            .unwrap()
            .available_quantity,
        5
    );

    // Recovery: the worker re-runs the full transaction.
    let worker = RetryWorker::new(
        CommitEngine::new(ctx.store.clone(), ctx.queue.clone()),
        ctx.queue.clone(),
        RetryPolicy::default(),
    );
    assert_eq!(worker.run_once().await, 1);

    assert_eq!(
        ctx.queue.resolution(degraded.id).await,
        Some(RetryOutcome::Committed)
    );
    let stored = ctx.store.get_order(degraded.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Committed);
    assert_eq!(stored.customer_ref.as_deref(), Some("customer-9"));
    assert_eq!(
        ctx.store
            .get_item(&"ITEM-D".into())
            .await
            .unwrap()
            .unwrap()
            .available_quantity,
        3
    );
}

#[tokio::test]
async fn multi_line_commit_is_all_or_nothing() {
    let ctx = setup(vec![item("ITEM-A", 100, 5), item("ITEM-B", 100, 5)]).await;

    let lines = ctx
        .reconciler
        .reconcile(&[CartLine::new("ITEM-A", 2), CartLine::new("ITEM-B", 2)])
        .await
        .unwrap()
        .lines;

    // Inject a failure between the two decrements.
    ctx.store.fail_after_decrements(Some(1)).await;
    let result = ctx.engine.commit(&lines, Money::zero(), None).await;
    assert!(matches!(result, Err(CheckoutError::CommitFailure(_))));

    assert_eq!(ctx.store.order_count().await, 0);
    for id in ["ITEM-A", "ITEM-B"] {
        assert_eq!(
            ctx.store
                .get_item(&id.into())
                .await
                .unwrap()
                .unwrap()
                .available_quantity,
            5
        );
    }

    // The same cart commits cleanly once the fault is gone.
    ctx.store.fail_after_decrements(None).await;
    let outcome = ctx.engine.commit(&lines, Money::zero(), None).await.unwrap();
    assert_eq!(outcome.order.lines.len(), 2);
    assert_eq!(ctx.store.order_count().await, 1);
}

#[tokio::test]
async fn continuous_reconciliation_tracks_stock_drain() {
    let ctx = setup(vec![item("ITEM-S", 100, 3)]).await;
    let cart = [CartLine::new("ITEM-S", 2)];

    let first = ctx.reconciler.reconcile(&cart).await.unwrap();
    assert_eq!(first.lines[0].status, LineStatus::Ok);

    // Another shopper commits 2 units.
    let other = ctx
        .reconciler
        .reconcile(&[CartLine::new("ITEM-S", 2)])
        .await
        .unwrap()
        .lines;
    ctx.engine.commit(&other, Money::zero(), None).await.unwrap();

    // The same cart now reconciles to a reduced quantity.
    let second = ctx.reconciler.reconcile(&cart).await.unwrap();
    assert_eq!(second.lines[0].status, LineStatus::QuantityReduced);
    assert_eq!(second.lines[0].quantity, 1);
}

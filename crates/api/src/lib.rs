//! HTTP API server for the cart reconciliation and order commit engine.
//!
//! Exposes the two-phase checkout protocol over REST: reconcile at
//! `POST /cart/reconcile`, commit at `POST /orders`. Structured
//! logging via tracing, metrics via a Prometheus exporter.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{CartReconciler, CommitEngine, RetryPolicy, RetryQueue, RetryWorker};
use inventory_store::InventoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: InventoryStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart/reconcile", post(routes::cart::reconcile::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state plus the retry worker that resolves
/// degraded orders. The worker is returned unspawned so callers (and
/// tests) control when the retry loop runs.
pub fn create_state<S: InventoryStore + Clone + 'static>(
    store: S,
    retry_policy: RetryPolicy,
) -> (Arc<AppState<S>>, RetryWorker<S>) {
    let retries = Arc::new(RetryQueue::new());

    let state = Arc::new(AppState {
        reconciler: CartReconciler::new(store.clone()),
        engine: CommitEngine::new(store.clone(), retries.clone()),
        retries: retries.clone(),
        store: store.clone(),
    });

    let worker = RetryWorker::new(
        CommitEngine::new(store, retries.clone()),
        retries,
        retry_policy,
    );

    (state, worker)
}

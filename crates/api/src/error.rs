//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Reconciliation or commit error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        // Protocol violations: the caller skipped or ignored reconciliation.
        CheckoutError::EmptyCart
        | CheckoutError::InvalidQuantity { .. }
        | CheckoutError::UnconfirmedLine { .. } => (StatusCode::BAD_REQUEST, err.to_string()),

        CheckoutError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),

        // The caller must re-reconcile and re-submit.
        CheckoutError::Conflict { .. } => (StatusCode::CONFLICT, err.to_string()),

        // Reconciliation cannot degrade; the caller may retry or show
        // last-known data flagged as possibly stale.
        CheckoutError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),

        CheckoutError::CommitFailure(_) => {
            tracing::error!(error = %err, "commit failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

//! API error types with HTTP response mapping.
//!
//! Every error surfaces as `{"error": <kind>, "message": <text>}` where the
//! kind is a stable discriminator. Internal details are logged, never
//! leaked.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::DomainError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed customer identity.
    Unauthorized(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Checkout execution error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => internal(msg),
        };

        let body = serde_json::json!({ "error": kind, "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn internal(detail: String) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error".to_string(),
    )
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, &'static str, String) {
    match &err {
        DomainError::OrderNotFound(_)
        | DomainError::ProductNotFound(_)
        | DomainError::ItemNotFound { .. } => {
            (StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        DomainError::InvalidQuantity(_) => {
            (StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        DomainError::InsufficientStock { .. } => {
            (StatusCode::BAD_REQUEST, "insufficient_stock", err.to_string())
        }
        DomainError::Conflict(_) | DomainError::Store(StoreError::Conflict(_)) => {
            (StatusCode::CONFLICT, "conflict", err.to_string())
        }
        DomainError::Store(_) => internal(err.to_string()),
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, &'static str, String) {
    match err {
        CheckoutError::CartNotFound(_) => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        CheckoutError::EmptyCart(_) => {
            (StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        CheckoutError::PaymentDeclined(_) => (
            StatusCode::PAYMENT_REQUIRED,
            "payment_declined",
            err.to_string(),
        ),
        CheckoutError::Domain(inner) => domain_error_to_response(inner),
        CheckoutError::Store(StoreError::Conflict(_)) => {
            (StatusCode::CONFLICT, "conflict", err.to_string())
        }
        CheckoutError::Store(_) => internal(err.to_string()),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

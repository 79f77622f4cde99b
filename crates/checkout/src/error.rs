//! Checkout error types.

use common::{CustomerId, OrderId};
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while converting a cart into a completed order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The customer has no open cart to check out.
    #[error("no open cart for customer {0}")]
    CartNotFound(CustomerId),

    /// The cart has no line items.
    #[error("cannot check out empty cart {0}")]
    EmptyCart(OrderId),

    /// The payment authority refused the charge.
    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    /// Domain error (insufficient stock, conflicts).
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// An error occurred in the order store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

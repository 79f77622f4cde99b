//! Domain error taxonomy.

use common::{OrderId, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during cart, inventory, and history operations.
///
/// The missing-open-cart case lives in the checkout crate; cart resolution
/// here is get-or-create and never comes up empty.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No order exists with the given id (or it is not visible to the
    /// caller).
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The product does not resolve in the catalog.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// No line item exists for the (order, product) pair.
    #[error("no line item for product {product_id} in order {order_id}")]
    ItemNotFound {
        order_id: OrderId,
        product_id: ProductId,
    },

    /// Quantities below 1 are never valid.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    /// The decrement would take the product's stock negative.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// A concurrent mutation won, or the target order is no longer a cart.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An error occurred in the order store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

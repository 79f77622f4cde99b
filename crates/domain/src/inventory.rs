//! Inventory ledger.
//!
//! The leaf of the component graph: stock reads and decrements against the
//! catalog's `products` rows, always scoped to the caller's transaction so a
//! checkout rollback undoes them.

use common::ProductId;
use store::OrderTx;

use crate::error::DomainError;

/// Decrements a product's stock by `quantity` inside the caller's
/// transaction, returning the remaining stock.
///
/// The write is guarded: if it would take the stock negative the decrement
/// does not happen and the failure is resolved to
/// [`InsufficientStock`](DomainError::InsufficientStock) (the product exists
/// with too little stock) or [`ProductNotFound`](DomainError::ProductNotFound).
/// The operation is not idempotent; calling twice decrements twice.
pub async fn decrement<T: OrderTx>(
    tx: &mut T,
    product_id: ProductId,
    quantity: u32,
) -> Result<i64, DomainError> {
    match tx.decrement_stock(product_id, quantity).await? {
        Some(remaining) => {
            tracing::debug!(%product_id, quantity, remaining, "stock decremented");
            Ok(remaining)
        }
        None => match tx.get_product(product_id).await? {
            Some(product) => Err(DomainError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock_quantity,
            }),
            None => Err(DomainError::ProductNotFound(product_id)),
        },
    }
}

//! Transaction helpers shared by the services.

use store::OrderTx;

/// Rolls a transaction back on an error path.
///
/// A rollback failure is logged rather than propagated: the error from the
/// operation that failed first is the one the caller needs to see.
pub async fn discard<T: OrderTx>(tx: T) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "failed to roll back transaction");
    }
}

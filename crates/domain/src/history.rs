//! Read-only queries over finalized orders.

use common::{CustomerId, OrderId};
use store::{CartLine, OrderRecord, OrderStore, OrderSummary, OrderTx};

use crate::error::DomainError;
use crate::tx::discard;

/// Service for a customer's order history.
///
/// Only finalized (non-cart) orders are visible here; the open cart belongs
/// to the cart manager.
pub struct OrderHistory<S> {
    store: S,
}

impl<S: OrderStore> OrderHistory<S> {
    /// Creates a new order history service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists the customer's finalized orders, newest first, with line-item
    /// counts and their persisted totals.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderSummary>, DomainError> {
        let mut tx = self.store.begin().await?;
        match tx.list_completed_orders(customer_id).await {
            Ok(summaries) => {
                tx.commit().await?;
                Ok(summaries)
            }
            Err(err) => {
                discard(tx).await;
                Err(err.into())
            }
        }
    }

    /// Fetches one finalized order owned by the customer, with its items.
    ///
    /// Foreign and still-open orders are invisible: both come back as
    /// [`OrderNotFound`](DomainError::OrderNotFound).
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        customer_id: CustomerId,
        order_id: OrderId,
    ) -> Result<(OrderRecord, Vec<CartLine>), DomainError> {
        let mut tx = self.store.begin().await?;
        match Self::get_order_in(&mut tx, customer_id, order_id).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(err) => {
                discard(tx).await;
                Err(err)
            }
        }
    }

    async fn get_order_in(
        tx: &mut S::Tx,
        customer_id: CustomerId,
        order_id: OrderId,
    ) -> Result<(OrderRecord, Vec<CartLine>), DomainError> {
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;

        if order.customer_id != customer_id || order.status.is_open() {
            return Err(DomainError::OrderNotFound(order_id));
        }

        let items = tx.list_cart_lines(order_id).await?;
        Ok((order, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::InMemoryOrderStore;

    async fn complete_order_with_item(
        store: &InMemoryOrderStore,
        customer: CustomerId,
        total: Money,
    ) -> OrderId {
        let product = store.insert_product("Widget", Money::from_cents(1000), 100).await;
        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(customer).await.unwrap();
        tx.insert_line_item(order.id, product.id, 2, product.price)
            .await
            .unwrap();
        tx.complete_order(order.id, total).await.unwrap().unwrap();
        tx.commit().await.unwrap();
        order.id
    }

    #[tokio::test]
    async fn listing_shows_only_finalized_orders() {
        let store = InMemoryOrderStore::new();
        let history = OrderHistory::new(store.clone());
        let customer = CustomerId::new();

        let completed = complete_order_with_item(&store, customer, Money::from_cents(2000)).await;

        // A fresh open cart must stay invisible.
        let mut tx = store.begin().await.unwrap();
        tx.insert_open_order(customer).await.unwrap();
        tx.commit().await.unwrap();

        let summaries = history.list_orders(customer).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].order.id, completed);
        assert_eq!(summaries[0].item_count, 1);
        assert_eq!(summaries[0].order.total.cents(), 2000);
    }

    #[tokio::test]
    async fn get_order_returns_items() {
        let store = InMemoryOrderStore::new();
        let history = OrderHistory::new(store.clone());
        let customer = CustomerId::new();

        let completed = complete_order_with_item(&store, customer, Money::from_cents(2000)).await;

        let (order, items) = history.get_order(customer, completed).await.unwrap();
        assert_eq!(order.id, completed);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn foreign_and_open_orders_are_invisible() {
        let store = InMemoryOrderStore::new();
        let history = OrderHistory::new(store.clone());
        let customer = CustomerId::new();

        let completed = complete_order_with_item(&store, customer, Money::from_cents(2000)).await;

        let err = history
            .get_order(CustomerId::new(), completed)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));

        let mut tx = store.begin().await.unwrap();
        let open = tx.insert_open_order(customer).await.unwrap();
        tx.commit().await.unwrap();

        let err = history.get_order(customer, open.id).await.unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));

        let err = history
            .get_order(customer, OrderId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use common::{CustomerId, Money, OrderId, OrderStatus, ProductId};

use crate::error::{Result, StoreError};
use crate::record::{CartLine, LineItemRecord, OrderRecord, OrderSummary, ProductRecord};
use crate::store::{OrderStore, OrderTx};

#[derive(Debug, Clone, Default)]
struct MemState {
    orders: HashMap<OrderId, OrderRecord>,
    items: HashMap<(OrderId, ProductId), LineItemRecord>,
    products: HashMap<ProductId, ProductRecord>,
}

/// In-memory order store implementation for testing.
///
/// Transactions stage a clone of the whole state under an owned mutex guard
/// and publish it on commit. Holding the guard for the transaction's
/// lifetime serializes transactions completely, which is strictly stronger
/// than the row-level locking the Postgres implementation provides, so every
/// concurrency property that holds here holds there too.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a catalog product (tests stand in for the external catalog).
    pub async fn insert_product(&self, name: &str, price: Money, stock: i64) -> ProductRecord {
        let product = ProductRecord {
            id: ProductId::new(),
            name: name.to_string(),
            price,
            stock_quantity: stock,
        };
        self.state
            .lock()
            .await
            .products
            .insert(product.id, product.clone());
        product
    }

    /// Overwrites a product's live catalog price (tests stand in for the
    /// external catalog).
    pub async fn set_product_price(&self, product_id: ProductId, price: Money) {
        if let Some(product) = self.state.lock().await.products.get_mut(&product_id) {
            product.price = price;
        }
    }

    /// Returns a product's current stock, if it exists.
    pub async fn product_stock(&self, product_id: ProductId) -> Option<i64> {
        self.state
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock_quantity)
    }

    /// Returns how many open (`cart`-status) orders the customer has.
    pub async fn open_order_count(&self, customer_id: CustomerId) -> usize {
        self.state
            .lock()
            .await
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id && o.status.is_open())
            .count()
    }

    /// Returns the number of line items attached to an order.
    pub async fn line_item_count(&self, order_id: OrderId) -> usize {
        self.state
            .lock()
            .await
            .items
            .keys()
            .filter(|(o, _)| *o == order_id)
            .count()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    type Tx = InMemoryOrderTx;

    async fn begin(&self) -> Result<InMemoryOrderTx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryOrderTx { guard, staged })
    }
}

/// A staged copy of the store state, published on commit.
pub struct InMemoryOrderTx {
    guard: OwnedMutexGuard<MemState>,
    staged: MemState,
}

impl InMemoryOrderTx {
    fn cart_line(&self, item: &LineItemRecord) -> Result<CartLine> {
        let product = self.staged.products.get(&item.product_id).ok_or_else(|| {
            StoreError::Decode(format!(
                "line item references unknown product {}",
                item.product_id
            ))
        })?;
        Ok(CartLine {
            product_id: item.product_id,
            product_name: product.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
    }
}

#[async_trait]
impl OrderTx for InMemoryOrderTx {
    async fn find_open_order(&mut self, customer_id: CustomerId) -> Result<Option<OrderRecord>> {
        Ok(self
            .staged
            .orders
            .values()
            .find(|o| o.customer_id == customer_id && o.status.is_open())
            .cloned())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        // Transactions are fully serialized here; locking is a no-op.
        self.find_order(order_id).await
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.staged.orders.get(&order_id).cloned())
    }

    async fn insert_open_order(&mut self, customer_id: CustomerId) -> Result<OrderRecord> {
        if self
            .staged
            .orders
            .values()
            .any(|o| o.customer_id == customer_id && o.status.is_open())
        {
            return Err(StoreError::Conflict(
                "customer already has an open cart".to_string(),
            ));
        }

        let order = OrderRecord {
            id: OrderId::new(),
            customer_id,
            status: OrderStatus::Cart,
            total: Money::zero(),
            created_at: Utc::now(),
        };
        self.staged.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn list_cart_lines(&mut self, order_id: OrderId) -> Result<Vec<CartLine>> {
        let mut items: Vec<LineItemRecord> = self
            .staged
            .items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.product_id.as_uuid());

        items.iter().map(|item| self.cart_line(item)).collect()
    }

    async fn find_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<LineItemRecord>> {
        Ok(self.staged.items.get(&(order_id, product_id)).cloned())
    }

    async fn insert_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<LineItemRecord> {
        if self.staged.items.contains_key(&(order_id, product_id)) {
            return Err(StoreError::Conflict(
                "line item already exists for this product".to_string(),
            ));
        }

        let item = LineItemRecord {
            order_id,
            product_id,
            quantity,
            unit_price,
        };
        self.staged.items.insert((order_id, product_id), item.clone());
        Ok(item)
    }

    async fn increment_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        delta: u32,
    ) -> Result<Option<LineItemRecord>> {
        Ok(self
            .staged
            .items
            .get_mut(&(order_id, product_id))
            .map(|item| {
                item.quantity += delta;
                item.clone()
            }))
    }

    async fn set_line_item_quantity(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<LineItemRecord>> {
        Ok(self
            .staged
            .items
            .get_mut(&(order_id, product_id))
            .map(|item| {
                item.quantity = quantity;
                item.clone()
            }))
    }

    async fn delete_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<bool> {
        Ok(self.staged.items.remove(&(order_id, product_id)).is_some())
    }

    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.staged.products.get(&product_id).cloned())
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<i64>> {
        Ok(self.staged.products.get_mut(&product_id).and_then(|p| {
            if p.stock_quantity >= quantity as i64 {
                p.stock_quantity -= quantity as i64;
                Some(p.stock_quantity)
            } else {
                None
            }
        }))
    }

    async fn complete_order(
        &mut self,
        order_id: OrderId,
        total: Money,
    ) -> Result<Option<OrderRecord>> {
        Ok(self.staged.orders.get_mut(&order_id).and_then(|order| {
            if !order.status.is_open() {
                return None;
            }
            order.status = OrderStatus::Completed;
            order.total = total;
            Some(order.clone())
        }))
    }

    async fn list_completed_orders(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderSummary>> {
        let mut summaries: Vec<OrderSummary> = self
            .staged
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id && !o.status.is_open())
            .map(|order| OrderSummary {
                order: order.clone(),
                item_count: self
                    .staged
                    .items
                    .keys()
                    .filter(|(id, _)| *id == order.id)
                    .count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then(b.order.id.as_uuid().cmp(&a.order.id.as_uuid()))
        });
        Ok(summaries)
    }

    async fn commit(self) -> Result<()> {
        let InMemoryOrderTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_find_open_order() {
        let store = InMemoryOrderStore::new();
        let customer = CustomerId::new();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_open_order(customer).await.unwrap().is_none());
        let order = tx.insert_open_order(customer).await.unwrap();
        assert_eq!(order.status, OrderStatus::Cart);
        assert!(order.total.is_zero());
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let found = tx.find_open_order(customer).await.unwrap().unwrap();
        assert_eq!(found.id, order.id);
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn second_open_order_for_customer_conflicts() {
        let store = InMemoryOrderStore::new();
        let customer = CustomerId::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_open_order(customer).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let result = tx.insert_open_order(customer).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        tx.rollback().await.unwrap();

        assert_eq!(store.open_order_count(customer).await, 1);
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = InMemoryOrderStore::new();
        let customer = CustomerId::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_open_order(customer).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.open_order_count(customer).await, 0);
    }

    #[tokio::test]
    async fn duplicate_line_item_conflicts() {
        let store = InMemoryOrderStore::new();
        let product = store.insert_product("Widget", Money::from_cents(1000), 5).await;
        let customer = CustomerId::new();

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(customer).await.unwrap();
        tx.insert_line_item(order.id, product.id, 1, product.price)
            .await
            .unwrap();
        let dup = tx
            .insert_line_item(order.id, product.id, 1, product.price)
            .await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn decrement_stock_is_guarded() {
        let store = InMemoryOrderStore::new();
        let product = store.insert_product("Widget", Money::from_cents(1000), 3).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.decrement_stock(product.id, 2).await.unwrap(),
            Some(1)
        );
        assert_eq!(tx.decrement_stock(product.id, 2).await.unwrap(), None);
        assert_eq!(
            tx.decrement_stock(ProductId::new(), 1).await.unwrap(),
            None
        );
        tx.commit().await.unwrap();

        assert_eq!(store.product_stock(product.id).await, Some(1));
    }

    #[tokio::test]
    async fn complete_order_requires_open_cart() {
        let store = InMemoryOrderStore::new();
        let customer = CustomerId::new();

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(customer).await.unwrap();
        let completed = tx
            .complete_order(order.id, Money::from_cents(2000))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed.status, OrderStatus::Completed);
        assert_eq!(completed.total.cents(), 2000);

        // Already completed: no second transition.
        assert!(
            tx.complete_order(order.id, Money::zero())
                .await
                .unwrap()
                .is_none()
        );
        tx.commit().await.unwrap();
    }
}

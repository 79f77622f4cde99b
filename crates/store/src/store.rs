use async_trait::async_trait;

use common::{CustomerId, Money, OrderId, ProductId};

use crate::Result;
use crate::record::{CartLine, LineItemRecord, OrderRecord, OrderSummary, ProductRecord};

/// Hands out request-scoped transactions over the order data.
///
/// All implementations must be thread-safe (Send + Sync); the transaction
/// type they produce carries the actual operations.
#[async_trait]
pub trait OrderStore: Send + Sync {
    type Tx: OrderTx;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// One storage transaction.
///
/// Every operation is scoped to the transaction; nothing becomes visible to
/// other transactions until [`commit`](OrderTx::commit). Dropping a
/// transaction without committing discards its writes, but callers are
/// expected to [`rollback`](OrderTx::rollback) explicitly on error paths so
/// the connection returns to the pool promptly.
///
/// Locking contract: `find_open_order` and `lock_order` take a row-level
/// write lock on the matched order (Postgres `SELECT … FOR UPDATE`), which
/// serializes concurrent get-or-create, item mutation, and checkout against
/// the same cart. `find_order` is lock-free and meant for read-only paths.
#[async_trait]
pub trait OrderTx: Send {
    /// Finds the customer's open (`cart`-status) order, locking it.
    async fn find_open_order(&mut self, customer_id: CustomerId) -> Result<Option<OrderRecord>>;

    /// Finds an order by id, locking it for subsequent mutation.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Finds an order by id without locking.
    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Inserts a fresh open order (status `cart`, total 0) for the customer.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict) if
    /// the customer already has an open order — the at-most-one-open-cart
    /// invariant is enforced here as well as by callers.
    async fn insert_open_order(&mut self, customer_id: CustomerId) -> Result<OrderRecord>;

    /// Lists an order's line items joined with product names, in stable
    /// (product-id) order.
    async fn list_cart_lines(&mut self, order_id: OrderId) -> Result<Vec<CartLine>>;

    /// Finds one line item, locking it for subsequent mutation.
    async fn find_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<LineItemRecord>>;

    /// Inserts a new line item with the given captured unit price.
    ///
    /// Fails with `Conflict` if a row for (order, product) already exists.
    async fn insert_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<LineItemRecord>;

    /// Adds `delta` to an existing line item's quantity.
    ///
    /// Returns None if no matching row exists. The unit price is untouched.
    async fn increment_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        delta: u32,
    ) -> Result<Option<LineItemRecord>>;

    /// Overwrites an existing line item's quantity in place.
    ///
    /// Returns None if no matching row exists. The unit price is untouched.
    async fn set_line_item_quantity(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<LineItemRecord>>;

    /// Deletes a line item; returns false if no row was deleted.
    async fn delete_line_item(&mut self, order_id: OrderId, product_id: ProductId)
    -> Result<bool>;

    /// Reads a catalog product.
    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<ProductRecord>>;

    /// Decrements a product's stock, guarded against going negative.
    ///
    /// Returns the remaining stock, or None when no row matched — either the
    /// product does not exist or its stock is insufficient; callers that
    /// need to distinguish the two follow up with
    /// [`get_product`](OrderTx::get_product).
    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<i64>>;

    /// Transitions an open order to `completed`, persisting its total.
    ///
    /// Returns None if the order is absent or no longer an open cart.
    async fn complete_order(
        &mut self,
        order_id: OrderId,
        total: Money,
    ) -> Result<Option<OrderRecord>>;

    /// Lists the customer's finalized (non-cart) orders, newest first.
    async fn list_completed_orders(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderSummary>>;

    /// Commits the transaction, publishing all writes.
    async fn commit(self) -> Result<()>;

    /// Rolls the transaction back, discarding all writes.
    async fn rollback(self) -> Result<()>;
}

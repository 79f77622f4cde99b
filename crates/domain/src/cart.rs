//! Cart manager: the single open cart per customer and its line items.

use common::{CustomerId, OrderId, ProductId};
use store::{CartLine, LineItemRecord, OrderRecord, OrderStore, OrderTx, StoreError};

use crate::error::DomainError;
use crate::tx::discard;

/// How an add-to-cart request landed: a fresh row, or a merge into an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemChange {
    Added,
    Merged,
}

/// Service for the customer's open cart.
///
/// Every mutation runs inside a single store transaction with explicit
/// commit, and rolls back on any error path. Mutations verify the target
/// order is still an open cart: completed orders are immutable receipts.
pub struct CartManager<S> {
    store: S,
}

impl<S: OrderStore> CartManager<S> {
    /// Creates a new cart manager over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the customer's open cart, creating one lazily if none exists.
    ///
    /// Two concurrent calls can both observe "no cart" and race to insert;
    /// the open-cart uniqueness guarantee rejects the loser, which retries
    /// once and finds the winner's row.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create_cart(
        &self,
        customer_id: CustomerId,
    ) -> Result<OrderRecord, DomainError> {
        for attempt in 0..2 {
            let mut tx = self.store.begin().await?;
            match Self::get_or_create_in(&mut tx, customer_id).await {
                Ok(order) => {
                    tx.commit().await?;
                    return Ok(order);
                }
                Err(DomainError::Store(StoreError::Conflict(_))) if attempt == 0 => {
                    discard(tx).await;
                    tracing::debug!(%customer_id, "lost open-cart creation race, retrying");
                }
                Err(err) => {
                    discard(tx).await;
                    return Err(err);
                }
            }
        }

        Err(DomainError::Conflict(format!(
            "could not settle an open cart for customer {customer_id}"
        )))
    }

    async fn get_or_create_in(
        tx: &mut S::Tx,
        customer_id: CustomerId,
    ) -> Result<OrderRecord, DomainError> {
        if let Some(order) = tx.find_open_order(customer_id).await? {
            return Ok(order);
        }
        let order = tx.insert_open_order(customer_id).await?;
        tracing::info!(%customer_id, order_id = %order.id, "created open cart");
        Ok(order)
    }

    /// Returns the customer's open cart together with its line items.
    #[tracing::instrument(skip(self))]
    pub async fn cart_with_items(
        &self,
        customer_id: CustomerId,
    ) -> Result<(OrderRecord, Vec<CartLine>), DomainError> {
        let order = self.get_or_create_cart(customer_id).await?;
        let lines = self.list_items(order.id).await?;
        Ok((order, lines))
    }

    /// Lists a cart's line items joined with product names.
    pub async fn list_items(&self, cart_id: OrderId) -> Result<Vec<CartLine>, DomainError> {
        let mut tx = self.store.begin().await?;
        match tx.list_cart_lines(cart_id).await {
            Ok(lines) => {
                tx.commit().await?;
                Ok(lines)
            }
            Err(err) => {
                discard(tx).await;
                Err(err.into())
            }
        }
    }

    /// Adds a product to the cart, merging into an existing line item.
    ///
    /// The quantity defaults to 1. A new line item captures the catalog's
    /// current price as its immutable unit price; a merge only increments
    /// the quantity.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: OrderId,
        product_id: ProductId,
        quantity: Option<u32>,
    ) -> Result<(LineItemRecord, ItemChange), DomainError> {
        let quantity = quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(DomainError::InvalidQuantity(quantity));
        }

        let mut tx = self.store.begin().await?;
        match Self::add_item_in(&mut tx, cart_id, product_id, quantity).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                discard(tx).await;
                Err(err)
            }
        }
    }

    async fn add_item_in(
        tx: &mut S::Tx,
        cart_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(LineItemRecord, ItemChange), DomainError> {
        Self::lock_open_cart(tx, cart_id).await?;

        let product = tx
            .get_product(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;

        if tx.find_line_item(cart_id, product_id).await?.is_some() {
            let merged = tx
                .increment_line_item(cart_id, product_id, quantity)
                .await?
                .ok_or_else(|| {
                    DomainError::Conflict("line item vanished during merge".to_string())
                })?;
            Ok((merged, ItemChange::Merged))
        } else {
            let item = tx
                .insert_line_item(cart_id, product_id, quantity, product.price)
                .await?;
            Ok((item, ItemChange::Added))
        }
    }

    /// Overwrites a line item's quantity in place; the captured unit price
    /// is untouched.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<LineItemRecord, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidQuantity(quantity));
        }

        let mut tx = self.store.begin().await?;
        match Self::update_item_in(&mut tx, cart_id, product_id, quantity).await {
            Ok(item) => {
                tx.commit().await?;
                Ok(item)
            }
            Err(err) => {
                discard(tx).await;
                Err(err)
            }
        }
    }

    async fn update_item_in(
        tx: &mut S::Tx,
        cart_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<LineItemRecord, DomainError> {
        Self::lock_open_cart(tx, cart_id).await?;

        tx.set_line_item_quantity(cart_id, product_id, quantity)
            .await?
            .ok_or(DomainError::ItemNotFound {
                order_id: cart_id,
                product_id,
            })
    }

    /// Removes a line item from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_id: OrderId,
        product_id: ProductId,
    ) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        match Self::remove_item_in(&mut tx, cart_id, product_id).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                discard(tx).await;
                Err(err)
            }
        }
    }

    async fn remove_item_in(
        tx: &mut S::Tx,
        cart_id: OrderId,
        product_id: ProductId,
    ) -> Result<(), DomainError> {
        Self::lock_open_cart(tx, cart_id).await?;

        if tx.delete_line_item(cart_id, product_id).await? {
            Ok(())
        } else {
            Err(DomainError::ItemNotFound {
                order_id: cart_id,
                product_id,
            })
        }
    }

    /// Locks the order row and rejects anything that is not an open cart.
    async fn lock_open_cart(tx: &mut S::Tx, cart_id: OrderId) -> Result<OrderRecord, DomainError> {
        let order = tx
            .lock_order(cart_id)
            .await?
            .ok_or(DomainError::OrderNotFound(cart_id))?;
        if !order.status.is_open() {
            return Err(DomainError::Conflict(format!(
                "order {cart_id} is no longer an open cart"
            )));
        }
        Ok(order)
    }
}

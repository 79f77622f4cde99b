//! Row types surfaced by the order store.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId};

/// One row of the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    /// Authoritative only once the order is `Completed`; a cart's total is
    /// recomputed from its line items at read time.
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

/// One row of the `order_items` table.
///
/// The (order, product) pair is the primary key: a product appears at most
/// once per order, and repeated additions merge into the row. The unit price
/// is captured from the catalog when the row is first written and never
/// rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRecord {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItemRecord {
    /// Returns quantity × captured unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A line item joined with its catalog product's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartLine {
    /// Returns quantity × captured unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// One row of the (external) `products` catalog table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
}

/// A finalized order with its line-item count, for history listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order: OrderRecord,
    pub item_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_totals_multiply_quantity_by_unit_price() {
        let item = LineItemRecord {
            order_id: OrderId::new(),
            product_id: ProductId::new(),
            quantity: 3,
            unit_price: Money::from_cents(1000),
        };
        assert_eq!(item.line_total().cents(), 3000);

        let line = CartLine {
            product_id: item.product_id,
            product_name: "Widget".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(999),
        };
        assert_eq!(line.line_total().cents(), 1998);
    }
}

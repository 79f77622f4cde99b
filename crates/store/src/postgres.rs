use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use common::{CustomerId, Money, OrderId, OrderStatus, ProductId};

use crate::error::{Result, StoreError};
use crate::record::{CartLine, LineItemRecord, OrderRecord, OrderSummary, ProductRecord};
use crate::store::{OrderStore, OrderTx};

const ORDER_COLUMNS: &str = "id, customer_id, status, total_cents, created_at";
const ITEM_COLUMNS: &str = "order_id, product_id, quantity, unit_price_cents";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    type Tx = PostgresOrderTx;

    async fn begin(&self) -> Result<PostgresOrderTx> {
        Ok(PostgresOrderTx {
            tx: self.pool.begin().await?,
        })
    }
}

/// One `BEGIN … COMMIT/ROLLBACK` block on a pooled connection.
pub struct PostgresOrderTx {
    tx: Transaction<'static, Postgres>,
}

fn row_to_order(row: &PgRow) -> Result<OrderRecord> {
    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Decode(format!("unknown order status {status_raw:?}")))?;

    Ok(OrderRecord {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
        status,
        total: Money::from_cents(row.try_get("total_cents")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_line_item(row: &PgRow) -> Result<LineItemRecord> {
    Ok(LineItemRecord {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: decode_quantity(row.try_get("quantity")?)?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

fn decode_quantity(raw: i32) -> Result<u32> {
    u32::try_from(raw).map_err(|_| StoreError::Decode(format!("negative quantity {raw}")))
}

/// Maps a unique-constraint violation onto a typed conflict, leaving every
/// other database error as-is.
fn map_constraint(err: sqlx::Error, constraint: &str, message: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.constraint() == Some(constraint)
    {
        return StoreError::Conflict(message.to_string());
    }
    StoreError::Database(err)
}

#[async_trait]
impl OrderTx for PostgresOrderTx {
    async fn find_open_order(&mut self, customer_id: CustomerId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE customer_id = $1 AND status = 'cart' \
             FOR UPDATE"
        ))
        .bind(customer_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn insert_open_order(&mut self, customer_id: CustomerId) -> Result<OrderRecord> {
        let row = sqlx::query(&format!(
            "INSERT INTO orders (id, customer_id, status, total_cents) \
             VALUES ($1, $2, 'cart', 0) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(OrderId::new().as_uuid())
        .bind(customer_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                "one_open_cart_per_customer",
                "customer already has an open cart",
            )
        })?;

        row_to_order(&row)
    }

    async fn list_cart_lines(&mut self, order_id: OrderId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            "SELECT oi.product_id, p.name, oi.quantity, oi.unit_price_cents \
             FROM order_items oi \
             JOIN products p ON p.id = oi.product_id \
             WHERE oi.order_id = $1 \
             ORDER BY oi.product_id",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CartLine {
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    product_name: row.try_get("name")?,
                    quantity: decode_quantity(row.try_get("quantity")?)?,
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                })
            })
            .collect()
    }

    async fn find_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<LineItemRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items \
             WHERE order_id = $1 AND product_id = $2 \
             FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_line_item).transpose()
    }

    async fn insert_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<LineItemRecord> {
        let row = sqlx::query(&format!(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .bind(unit_price.cents())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                "order_items_pkey",
                "line item already exists for this product",
            )
        })?;

        row_to_line_item(&row)
    }

    async fn increment_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        delta: u32,
    ) -> Result<Option<LineItemRecord>> {
        let row = sqlx::query(&format!(
            "UPDATE order_items SET quantity = quantity + $3 \
             WHERE order_id = $1 AND product_id = $2 \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(delta as i32)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_line_item).transpose()
    }

    async fn set_line_item_quantity(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<LineItemRecord>> {
        let row = sqlx::query(&format!(
            "UPDATE order_items SET quantity = $3 \
             WHERE order_id = $1 AND product_id = $2 \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_line_item).transpose()
    }

    async fn delete_line_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND product_id = $2")
            .bind(order_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, stock_quantity FROM products WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => Ok(Some(ProductRecord {
                id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
                name: row.try_get("name")?,
                price: Money::from_cents(row.try_get("price_cents")?),
                stock_quantity: row.try_get("stock_quantity")?,
            })),
            None => Ok(None),
        }
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<i64>> {
        // The guard keeps stock from going negative; a missed match means
        // either an unknown product or insufficient stock.
        let remaining: Option<i64> = sqlx::query_scalar(
            "UPDATE products SET stock_quantity = stock_quantity - $2 \
             WHERE id = $1 AND stock_quantity >= $2 \
             RETURNING stock_quantity",
        )
        .bind(product_id.as_uuid())
        .bind(quantity as i64)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(remaining)
    }

    async fn complete_order(
        &mut self,
        order_id: OrderId,
        total: Money,
    ) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = 'completed', total_cents = $2 \
             WHERE id = $1 AND status = 'cart' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(total.cents())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn list_completed_orders(
        &mut self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderSummary>> {
        let rows = sqlx::query(
            "SELECT o.id, o.customer_id, o.status, o.total_cents, o.created_at, \
                    COUNT(oi.product_id) AS item_count \
             FROM orders o \
             LEFT JOIN order_items oi ON oi.order_id = o.id \
             WHERE o.customer_id = $1 AND o.status <> 'cart' \
             GROUP BY o.id \
             ORDER BY o.created_at DESC, o.id DESC",
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderSummary {
                    order: row_to_order(row)?,
                    item_count: row.try_get("item_count")?,
                })
            })
            .collect()
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

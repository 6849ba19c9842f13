// server/src/db/pg_store.rs

//! PostgreSQL implementation of the fulfillment storage contracts.
//!
//! Queries are built at runtime (`query_as` / `query_scalar`) so the crate
//! compiles without a live database. Transactions run at `SERIALIZABLE`.

use crate::config::AppConfig;
use crate::errors::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fulfillment::analytics::SaleLine;
use fulfillment::calendar::DateWindow;
use fulfillment::models::{
  CartLine, Order, OrderItem, OrderItemDetail, OrderPatch, OrderStatus, OrderSummary, Product, ProductSummary, ShippingFee,
};
use fulfillment::store::{OrderStore, StockUpdate, StoreResult, StoreTransaction, UserStore};
use fulfillment::{FulfillmentError, Store};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, total_price_cents, status, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, created_at";

fn db_err(e: sqlx::Error) -> FulfillmentError {
  FulfillmentError::storage(e)
}

fn window_bounds(window: Option<DateWindow>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
  match window {
    Some(w) => (Some(w.start), Some(w.end)),
    None => (None, None),
  }
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  /// Opens the pool. Every connection gets the configured `statement_timeout`.
  #[instrument(name = "db::connect", skip_all, fields(max_connections = config.database_max_connections))]
  pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
    let timeout_ms = config.database_statement_timeout_ms;
    let pool = PgPoolOptions::new()
      .max_connections(config.database_max_connections)
      .after_connect(move |conn, _meta| {
        Box::pin(async move {
          let statement = format!("SET statement_timeout = {}", timeout_ms);
          conn.execute(statement.as_str()).await?;
          Ok(())
        })
      })
      .connect(&config.database_url)
      .await?;
    info!(statement_timeout_ms = timeout_ms, "Database pool ready.");
    Ok(Self { pool })
  }

  pub async fn migrate(&self) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(sqlx::Error::from)?;
    info!("Database migrations applied.");
    Ok(())
  }
}

#[async_trait]
impl UserStore for PgStore {
  async fn update_address(&self, user_id: Uuid, address: &str) -> StoreResult<bool> {
    let result = sqlx::query("UPDATE users SET address = $2 WHERE id = $1")
      .bind(user_id)
      .bind(address)
      .execute(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(result.rows_affected() > 0)
  }
}

/// One row of the order-item history join. Product columns are null when the
/// product has since been deleted.
#[derive(sqlx::FromRow)]
struct ItemDetailRow {
  id: Uuid,
  order_id: Uuid,
  product_id: Uuid,
  quantity: i32,
  created_at: DateTime<Utc>,
  order_status: OrderStatus,
  order_total_price_cents: i64,
  order_created_at: DateTime<Utc>,
  product_name: Option<String>,
  product_price_cents: Option<i64>,
  product_stock: Option<i32>,
}

fn product_summary(id: Uuid, name: Option<String>, price_cents: Option<i64>, stock: Option<i32>) -> Option<ProductSummary> {
  Some(ProductSummary {
    id,
    name: name?,
    price_cents: price_cents?,
    stock: stock?,
  })
}

impl From<ItemDetailRow> for OrderItemDetail {
  fn from(row: ItemDetailRow) -> Self {
    OrderItemDetail {
      order: OrderSummary {
        id: row.order_id,
        status: row.order_status,
        total_price_cents: row.order_total_price_cents,
        created_at: row.order_created_at,
      },
      product: product_summary(row.product_id, row.product_name, row.product_price_cents, row.product_stock),
      item: OrderItem {
        id: row.id,
        order_id: row.order_id,
        product_id: row.product_id,
        quantity: row.quantity,
        created_at: row.created_at,
      },
    }
  }
}

#[derive(sqlx::FromRow)]
struct SaleRow {
  product_id: Uuid,
  quantity: i32,
  product_name: Option<String>,
  product_price_cents: Option<i64>,
  product_stock: Option<i32>,
}

impl From<SaleRow> for SaleLine {
  fn from(row: SaleRow) -> Self {
    SaleLine {
      product: product_summary(row.product_id, row.product_name, row.product_price_cents, row.product_stock),
      product_id: row.product_id,
      quantity: row.quantity,
    }
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn all_orders(&self) -> StoreResult<Vec<Order>> {
    sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS))
      .fetch_all(&self.pool)
      .await
      .map_err(db_err)
  }

  async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)
  }

  async fn order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)
  }

  async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
    sqlx::query_as::<_, OrderItem>(&format!(
      "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
      ITEM_COLUMNS
    ))
    .bind(order_id)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)
  }

  async fn update_order(&self, order_id: Uuid, patch: &OrderPatch) -> StoreResult<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!(
      "UPDATE orders \
       SET status = COALESCE($2, status), \
           total_price_cents = COALESCE($3, total_price_cents), \
           updated_at = NOW() \
       WHERE id = $1 \
       RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(order_id)
    .bind(patch.status)
    .bind(patch.total_price_cents)
    .fetch_optional(&self.pool)
    .await
    .map_err(db_err)
  }

  async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!(
      "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(order_id)
    .bind(status)
    .fetch_optional(&self.pool)
    .await
    .map_err(db_err)
  }

  async fn update_order_item_quantity(&self, order_id: Uuid, item_id: Uuid, quantity: i32) -> StoreResult<Option<OrderItem>> {
    sqlx::query_as::<_, OrderItem>(&format!(
      "UPDATE order_items SET quantity = $3 WHERE id = $2 AND order_id = $1 RETURNING {}",
      ITEM_COLUMNS
    ))
    .bind(order_id)
    .bind(item_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await
    .map_err(db_err)
  }

  async fn item_details_for_user(&self, user_id: Uuid, window: Option<DateWindow>) -> StoreResult<Vec<OrderItemDetail>> {
    let (start, end) = window_bounds(window);
    let rows = sqlx::query_as::<_, ItemDetailRow>(
      "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.created_at, \
              o.status AS order_status, o.total_price_cents AS order_total_price_cents, \
              o.created_at AS order_created_at, \
              p.name AS product_name, p.price_cents AS product_price_cents, p.stock AS product_stock \
       FROM order_items oi \
       JOIN orders o ON o.id = oi.order_id \
       LEFT JOIN products p ON p.id = oi.product_id \
       WHERE o.user_id = $1 \
         AND ($2::timestamptz IS NULL OR (oi.created_at >= $2 AND oi.created_at < $3)) \
       ORDER BY oi.created_at DESC, oi.id",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;
    Ok(rows.into_iter().map(OrderItemDetail::from).collect())
  }

  async fn delivered_sales(&self, window: Option<DateWindow>) -> StoreResult<Vec<SaleLine>> {
    let (start, end) = window_bounds(window);
    let rows = sqlx::query_as::<_, SaleRow>(
      "SELECT oi.product_id, oi.quantity, \
              p.name AS product_name, p.price_cents AS product_price_cents, p.stock AS product_stock \
       FROM order_items oi \
       JOIN orders o ON o.id = oi.order_id \
       LEFT JOIN products p ON p.id = oi.product_id \
       WHERE o.status = 'delivered' \
         AND ($1::timestamptz IS NULL OR (o.created_at >= $1 AND o.created_at < $2))",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;
    Ok(rows.into_iter().map(SaleLine::from).collect())
  }
}

#[async_trait]
impl Store for PgStore {
  async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
    let mut tx = self.pool.begin().await.map_err(db_err)?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
      .execute(&mut *tx)
      .await
      .map_err(db_err)?;
    debug!("Serializable transaction started.");
    Ok(Box::new(PgTransaction { tx }))
  }
}

/// Dropping it without `commit` rolls the transaction back.
struct PgTransaction {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
  async fn cart_lines_for_update(&mut self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
    sqlx::query_as::<_, CartLine>(
      "SELECT id, user_id, product_id, quantity FROM cart_lines WHERE user_id = $1 ORDER BY id FOR UPDATE",
    )
    .bind(user_id)
    .fetch_all(&mut *self.tx)
    .await
    .map_err(db_err)
  }

  async fn product(&mut self, product_id: Uuid) -> StoreResult<Option<Product>> {
    sqlx::query_as::<_, Product>("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(db_err)
  }

  async fn shipping_fee(&mut self) -> StoreResult<Option<ShippingFee>> {
    sqlx::query_as::<_, ShippingFee>("SELECT delivery_fee_cents FROM shipping_fees WHERE id = 1")
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(db_err)
  }

  async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO orders (id, user_id, total_price_cents, status, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.total_price_cents)
    .bind(order.status)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(db_err)?;
    Ok(())
  }

  async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
    sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, created_at) VALUES ($1, $2, $3, $4, $5)")
      .bind(item.id)
      .bind(item.order_id)
      .bind(item.product_id)
      .bind(item.quantity)
      .bind(item.created_at)
      .execute(&mut *self.tx)
      .await
      .map_err(db_err)?;
    Ok(())
  }

  async fn adjust_stock(&mut self, product_id: Uuid, delta: i32) -> StoreResult<StockUpdate> {
    let applied: Option<i32> =
      sqlx::query_scalar("UPDATE products SET stock = stock + $2 WHERE id = $1 AND stock + $2 >= 0 RETURNING stock")
        .bind(product_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
    if let Some(stock) = applied {
      return Ok(StockUpdate::Applied { stock });
    }

    let available: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(db_err)?;
    Ok(match available {
      Some(available) => StockUpdate::Insufficient { available },
      None => StockUpdate::ProductMissing,
    })
  }

  async fn clear_cart(&mut self, user_id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
      .bind(user_id)
      .execute(&mut *self.tx)
      .await
      .map_err(db_err)?;
    Ok(result.rows_affected())
  }

  async fn order_for_update(&mut self, order_id: Uuid) -> StoreResult<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS))
      .bind(order_id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(db_err)
  }

  async fn delete_order_item(&mut self, order_id: Uuid, item_id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM order_items WHERE id = $2 AND order_id = $1")
      .bind(order_id)
      .bind(item_id)
      .execute(&mut *self.tx)
      .await
      .map_err(db_err)?;
    Ok(result.rows_affected() > 0)
  }

  async fn count_order_items(&mut self, order_id: Uuid) -> StoreResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
      .bind(order_id)
      .fetch_one(&mut *self.tx)
      .await
      .map_err(db_err)
  }

  async fn delete_order_items(&mut self, order_id: Uuid) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
      .bind(order_id)
      .execute(&mut *self.tx)
      .await
      .map_err(db_err)?;
    Ok(result.rows_affected())
  }

  async fn delete_order(&mut self, order_id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(order_id)
      .execute(&mut *self.tx)
      .await
      .map_err(db_err)?;
    Ok(result.rows_affected() > 0)
  }

  async fn commit(self: Box<Self>) -> StoreResult<()> {
    self.tx.commit().await.map_err(db_err)?;
    debug!("Transaction committed.");
    Ok(())
  }

  async fn rollback(self: Box<Self>) -> StoreResult<()> {
    self.tx.rollback().await.map_err(db_err)?;
    debug!("Transaction rolled back.");
    Ok(())
  }
}

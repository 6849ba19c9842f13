// core/src/models/order_item.rs

use super::order::OrderSummary;
use super::product::ProductSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One order line. `product_id` is informational after checkout: quantity
/// edits are not re-validated against stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub created_at: DateTime<Utc>,
}

/// An order item joined with its order and (if it still exists) its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemDetail {
  #[serde(flatten)]
  pub item: OrderItem,
  pub order: OrderSummary,
  pub product: Option<ProductSummary>,
}

/// What a delete-item call removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRemoval {
  ItemOnly,
  /// The item was the order's last one, so the order went with it.
  ItemAndOrder,
}

// core/src/models/product.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
  /// Mutated only through the inventory ledger.
  pub stock: i32,
}

/// Product fields joined onto order-item listings and sales reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
  pub stock: i32,
}

impl From<&Product> for ProductSummary {
  fn from(p: &Product) -> Self {
    ProductSummary {
      id: p.id,
      name: p.name.clone(),
      price_cents: p.price_cents,
      stock: p.stock,
    }
  }
}

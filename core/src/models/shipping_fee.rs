// core/src/models/shipping_fee.rs

use serde::{Deserialize, Serialize};

/// The singleton delivery-fee record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ShippingFee {
  pub delivery_fee_cents: i64,
}

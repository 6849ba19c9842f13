// core/src/models/order.rs

use crate::error::FulfillmentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "order_status_enum", rename_all = "lowercase"))]
pub enum OrderStatus {
  Pending,
  Delivered,
  Canceled,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Canceled => "canceled",
    }
  }

  /// Only pending or canceled orders may be deleted.
  pub fn is_deletable(&self) -> bool {
    matches!(self, OrderStatus::Pending | OrderStatus::Canceled)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = FulfillmentError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pending" => Ok(OrderStatus::Pending),
      "delivered" => Ok(OrderStatus::Delivered),
      "canceled" | "cancelled" => Ok(OrderStatus::Canceled),
      other => Err(FulfillmentError::Validation(format!("Unknown order status '{}'", other))),
    }
  }
}

/// Order header. `total_price_cents` is fixed at checkout time and is not
/// recomputed when product prices change later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub total_price_cents: i64,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn pending(user_id: Uuid, total_price_cents: i64, now: DateTime<Utc>) -> Self {
    Order {
      id: Uuid::new_v4(),
      user_id,
      total_price_cents,
      status: OrderStatus::Pending,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn apply_patch(&mut self, patch: &OrderPatch, now: DateTime<Utc>) {
    if let Some(status) = patch.status {
      self.status = status;
    }
    if let Some(total) = patch.total_price_cents {
      self.total_price_cents = total;
    }
    self.updated_at = now;
  }

  pub fn summary(&self) -> OrderSummary {
    OrderSummary {
      id: self.id,
      status: self.status,
      total_price_cents: self.total_price_cents,
      created_at: self.created_at,
    }
  }
}

/// The admin-editable fields of an order. Anything else in the request body
/// is rejected at deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderPatch {
  #[serde(default)]
  pub status: Option<OrderStatus>,
  #[serde(default)]
  pub total_price_cents: Option<i64>,
}

impl OrderPatch {
  pub fn validate(&self) -> Result<(), FulfillmentError> {
    if self.status.is_none() && self.total_price_cents.is_none() {
      return Err(FulfillmentError::Validation(
        "Order update must change at least one of: status, total_price_cents".to_string(),
      ));
    }
    if matches!(self.total_price_cents, Some(total) if total < 0) {
      return Err(FulfillmentError::Validation("total_price_cents cannot be negative".to_string()));
    }
    Ok(())
  }
}

/// Order fields joined onto order-item listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
  pub id: Uuid,
  pub status: OrderStatus,
  pub total_price_cents: i64,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_parsing_accepts_both_spellings_of_canceled() {
    assert_eq!("Canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Canceled);
    assert_eq!("cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Canceled);
    assert!("shipped".parse::<OrderStatus>().is_err());
  }

  #[test]
  fn only_pending_and_canceled_are_deletable() {
    assert!(OrderStatus::Pending.is_deletable());
    assert!(OrderStatus::Canceled.is_deletable());
    assert!(!OrderStatus::Delivered.is_deletable());
  }

  #[test]
  fn patch_rejects_unknown_fields() {
    let err = serde_json::from_str::<OrderPatch>(r#"{"status":"delivered","user_id":"x"}"#).unwrap_err();
    assert!(err.to_string().contains("unknown field"));
  }

  #[test]
  fn patch_validation() {
    assert!(OrderPatch::default().validate().is_err());
    let negative = OrderPatch {
      total_price_cents: Some(-1),
      ..Default::default()
    };
    assert!(negative.validate().is_err());
    let ok = OrderPatch {
      status: Some(OrderStatus::Delivered),
      ..Default::default()
    };
    assert!(ok.validate().is_ok());
  }
}

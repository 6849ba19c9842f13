// core/src/pricing.rs

//! Line totals, delivery fee and grand total for a cart, in integer cents.

use crate::error::FulfillmentError;
use crate::models::{CartLine, Product, ShippingFee};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
  pub lines: Vec<PricedLine>,
  pub product_total_cents: i64,
  pub delivery_fee_cents: i64,
  pub total_cents: i64,
}

/// Prices each `(line, product)` pair at the product's current price and adds
/// the delivery fee, or nothing when no fee record exists.
pub fn quote<'a>(
  lines: impl IntoIterator<Item = (&'a CartLine, &'a Product)>,
  shipping_fee: Option<&ShippingFee>,
) -> Result<Quote, FulfillmentError> {
  let overflow = || FulfillmentError::Internal("order total overflowed".to_string());

  let mut priced = Vec::new();
  let mut product_total_cents: i64 = 0;
  for (line, product) in lines {
    let line_total_cents = product.price_cents.checked_mul(i64::from(line.quantity)).ok_or_else(overflow)?;
    product_total_cents = product_total_cents.checked_add(line_total_cents).ok_or_else(overflow)?;
    priced.push(PricedLine {
      product_id: product.id,
      quantity: line.quantity,
      unit_price_cents: product.price_cents,
      line_total_cents,
    });
  }

  let delivery_fee_cents = shipping_fee.map_or(0, |fee| fee.delivery_fee_cents);
  let total_cents = product_total_cents.checked_add(delivery_fee_cents).ok_or_else(overflow)?;

  Ok(Quote {
    lines: priced,
    product_total_cents,
    delivery_fee_cents,
    total_cents,
  })
}

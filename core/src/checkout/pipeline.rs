// core/src/checkout/pipeline.rs

//! The checkout pipeline: cart → priced order → items + stock → empty cart.
//!
//! Every step after `open_transaction` reads and writes through one store
//! transaction, so the cart that is priced is the cart that is cleared. The
//! shipping address is the exception and is written through the store
//! directly. Handlers never hold the context lock across an `.await`; store
//! calls work on values copied out of the context first.

use super::context::CheckoutCtxData;
use crate::error::FulfillmentError;
use crate::inventory::InventoryLedger;
use crate::models::{CartLine, Order, OrderItem, Product};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, SkipCondition};
use crate::pricing;
use crate::registry::PipelineRegistry;
use crate::store::StoreTransaction;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const OPEN_TRANSACTION: &str = "open_transaction";
pub const LOAD_CART: &str = "load_cart";
pub const SAVE_SHIPPING_ADDRESS: &str = "save_shipping_address";
pub const RESOLVE_PRODUCTS: &str = "resolve_products";
pub const PRICE_ORDER: &str = "price_order";
pub const CREATE_ORDER: &str = "create_order";
pub const RECORD_ORDER_ITEMS: &str = "record_order_items";
pub const CLEAR_CART: &str = "clear_cart";
pub const COMMIT_TRANSACTION: &str = "commit_transaction";

type StepResult = Result<PipelineControl, FulfillmentError>;

/// Builds the checkout pipeline with all of its handlers attached.
pub fn checkout_pipeline() -> Pipeline<CheckoutCtxData, FulfillmentError> {
  let no_address: SkipCondition<CheckoutCtxData> =
    Arc::new(|ctx: &ContextData<CheckoutCtxData>| ctx.read().shipping_address.is_none());

  let mut p = Pipeline::<CheckoutCtxData, FulfillmentError>::new(&[
    (OPEN_TRANSACTION, false, None),
    (LOAD_CART, false, None),
    (SAVE_SHIPPING_ADDRESS, false, Some(no_address)),
    (RESOLVE_PRODUCTS, false, None),
    (PRICE_ORDER, false, None),
    (CREATE_ORDER, false, None),
    (RECORD_ORDER_ITEMS, false, None),
    (CLEAR_CART, false, None),
    (COMMIT_TRANSACTION, false, None),
  ]);

  p.on_root(OPEN_TRANSACTION, open_transaction);
  p.on_root(LOAD_CART, load_cart);
  p.on_root(SAVE_SHIPPING_ADDRESS, save_shipping_address);
  p.on_root(RESOLVE_PRODUCTS, resolve_products);
  p.on_root(PRICE_ORDER, price_order);
  p.on_root(CREATE_ORDER, create_order);
  p.on_root(RECORD_ORDER_ITEMS, record_order_items);
  p.on_root(CLEAR_CART, clear_cart);
  p.on_root(COMMIT_TRANSACTION, commit_transaction);
  p
}

pub fn register_checkout_pipeline(registry: &PipelineRegistry<FulfillmentError>) {
  registry.register_pipeline(checkout_pipeline());
}

fn missing_state(what: &str) -> FulfillmentError {
  FulfillmentError::Internal(format!("checkout state '{}' was not populated by an earlier step", what))
}

async fn open_transaction(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let store = ctx.with(|d| Arc::clone(&d.store));
  let tx = store.begin().await?;
  ctx.with(|d| d.restore_transaction(tx));
  debug!("Checkout transaction opened.");
  Ok(PipelineControl::Continue)
}

async fn load_cart(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let user_id = ctx.with(|d| d.user_id);

  let mut tx = ctx.with(CheckoutCtxData::take_transaction)?;
  let outcome = tx.cart_lines_for_update(user_id).await;
  ctx.with(|d| d.restore_transaction(tx));
  let lines = outcome?;

  if lines.is_empty() {
    warn!(%user_id, "Checkout rejected: cart is empty.");
    return Err(FulfillmentError::Validation("Cart is empty".to_string()));
  }
  if let Some(bad) = lines.iter().find(|l| l.quantity < 1) {
    warn!(%user_id, product_id = %bad.product_id, quantity = bad.quantity, "Checkout rejected: bad cart quantity.");
    return Err(FulfillmentError::Validation(format!(
      "Invalid quantity {} for product {}",
      bad.quantity, bad.product_id
    )));
  }

  info!(%user_id, lines = lines.len(), "Cart loaded.");
  ctx.with_mut(|d| d.cart_lines = lines);
  Ok(PipelineControl::Continue)
}

/// Written through the store, not the checkout transaction: the address
/// sticks even if a later step fails.
async fn save_shipping_address(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let (store, user_id, address) = ctx.with(|d| (Arc::clone(&d.store), d.user_id, d.shipping_address.clone()));
  let Some(address) = address else {
    return Ok(PipelineControl::Continue);
  };

  if !store.update_address(user_id, &address).await? {
    return Err(FulfillmentError::NotFound(format!("User {} not found", user_id)));
  }
  debug!(%user_id, "Shipping address saved.");
  Ok(PipelineControl::Continue)
}

async fn resolve_products(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let lines = ctx.with(|d| d.cart_lines.clone());

  let mut tx = ctx.with(CheckoutCtxData::take_transaction)?;
  let outcome = fetch_products(tx.as_mut(), &lines).await;
  ctx.with(|d| d.restore_transaction(tx));
  let products = outcome?;

  ctx.with_mut(|d| d.products = products);
  Ok(PipelineControl::Continue)
}

async fn fetch_products(tx: &mut dyn StoreTransaction, lines: &[CartLine]) -> Result<Vec<Product>, FulfillmentError> {
  let mut products = Vec::with_capacity(lines.len());
  for line in lines {
    match tx.product(line.product_id).await? {
      Some(product) => products.push(product),
      None => {
        warn!(product_id = %line.product_id, "Checkout aborted: cart references a missing product.");
        return Err(FulfillmentError::NotFound(format!("Product ID {} not found", line.product_id)));
      }
    }
  }
  Ok(products)
}

async fn price_order(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let mut tx = ctx.with(CheckoutCtxData::take_transaction)?;
  let outcome = tx.shipping_fee().await;
  ctx.with(|d| d.restore_transaction(tx));
  let fee = outcome?;

  let quote = ctx.with(|d| pricing::quote(d.cart_lines.iter().zip(d.products.iter()), fee.as_ref()))?;
  info!(
    product_total_cents = quote.product_total_cents,
    delivery_fee_cents = quote.delivery_fee_cents,
    total_cents = quote.total_cents,
    "Order priced."
  );
  ctx.with_mut(|d| d.quote = Some(quote));
  Ok(PipelineControl::Continue)
}

async fn create_order(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let (user_id, total_cents) = ctx.with(|d| (d.user_id, d.quote.as_ref().map(|q| q.total_cents)));
  let total_cents = total_cents.ok_or_else(|| missing_state("quote"))?;
  let order = Order::pending(user_id, total_cents, Utc::now());

  let mut tx = ctx.with(CheckoutCtxData::take_transaction)?;
  let outcome = tx.insert_order(&order).await;
  ctx.with(|d| d.restore_transaction(tx));
  outcome?;

  info!(order_id = %order.id, %user_id, total_cents, "Order created.");
  ctx.with_mut(|d| d.order = Some(order));
  Ok(PipelineControl::Continue)
}

async fn record_order_items(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let (ledger, order, lines) = ctx.with(|d| (d.ledger, d.order.clone(), d.cart_lines.clone()));
  let order = order.ok_or_else(|| missing_state("order"))?;

  let mut tx = ctx.with(CheckoutCtxData::take_transaction)?;
  let outcome = record_items(tx.as_mut(), ledger, &order, &lines).await;
  ctx.with(|d| d.restore_transaction(tx));
  let items = outcome?;

  info!(order_id = %order.id, items = items.len(), policy = ?ledger.policy(), "Order items recorded.");
  ctx.with_mut(|d| d.items = items);
  Ok(PipelineControl::Continue)
}

async fn record_items(
  tx: &mut dyn StoreTransaction,
  ledger: InventoryLedger,
  order: &Order,
  lines: &[CartLine],
) -> Result<Vec<OrderItem>, FulfillmentError> {
  let mut items = Vec::with_capacity(lines.len());
  for line in lines {
    let item = OrderItem {
      id: Uuid::new_v4(),
      order_id: order.id,
      product_id: line.product_id,
      quantity: line.quantity,
      created_at: order.created_at,
    };
    tx.insert_order_item(&item).await?;
    ledger.record_sale(&mut *tx, line.product_id, line.quantity).await?;
    items.push(item);
  }
  Ok(items)
}

/// The lines removed must be exactly the lines that were ordered.
async fn clear_cart(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let (user_id, expected) = ctx.with(|d| (d.user_id, d.cart_lines.len() as u64));

  let mut tx = ctx.with(CheckoutCtxData::take_transaction)?;
  let outcome = tx.clear_cart(user_id).await;
  ctx.with(|d| d.restore_transaction(tx));
  let cleared = outcome?;

  if cleared != expected {
    warn!(%user_id, expected, cleared, "Checkout aborted: cart changed while checking out.");
    return Err(FulfillmentError::Conflict(
      "Cart changed during checkout, please retry".to_string(),
    ));
  }

  debug!(%user_id, cleared, "Cart cleared.");
  Ok(PipelineControl::Continue)
}

async fn commit_transaction(ctx: ContextData<CheckoutCtxData>) -> StepResult {
  let tx = ctx.with(CheckoutCtxData::take_transaction)?;
  tx.commit().await?;
  ctx.with_mut(|d| d.committed = true);
  debug!("Checkout transaction committed.");
  Ok(PipelineControl::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn steps_run_in_checkout_order() {
    let p = checkout_pipeline();
    assert_eq!(
      p.step_names(),
      vec![
        OPEN_TRANSACTION,
        LOAD_CART,
        SAVE_SHIPPING_ADDRESS,
        RESOLVE_PRODUCTS,
        PRICE_ORDER,
        CREATE_ORDER,
        RECORD_ORDER_ITEMS,
        CLEAR_CART,
        COMMIT_TRANSACTION,
      ]
    );
  }
}

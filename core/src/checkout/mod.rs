// core/src/checkout/mod.rs

//! Checkout orchestration: turns a user's cart into one persisted order.

pub mod context;
pub mod pipeline;

pub use context::CheckoutCtxData;
pub use pipeline::{checkout_pipeline, register_checkout_pipeline};

use crate::error::{FulfillmentError, PipelineError};
use crate::inventory::InventoryLedger;
use crate::models::OrderItem;
use crate::pipeline::{ContextData, PipelineResult};
use crate::policy::{authorize, Action, Actor, Resource};
use crate::registry::PipelineRegistry;
use crate::store::Store;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
  pub order_id: Uuid,
  pub total_cents: i64,
  pub delivery_fee_cents: i64,
  pub items: Vec<OrderItem>,
}

/// Runs the registered checkout pipeline for `actor`.
///
/// On any failure the open transaction, if there is one, is rolled back
/// before the error is returned, so a failed checkout leaves no order, no
/// items, no stock change and an untouched cart. Only the shipping address
/// update survives a failure.
#[instrument(
  name = "checkout::run",
  skip(registry, store, ledger, actor, shipping_address),
  fields(user_id = %actor.user_id, has_address = shipping_address.is_some()),
  err(Display)
)]
pub async fn run_checkout(
  registry: &PipelineRegistry<FulfillmentError>,
  store: Arc<dyn Store>,
  ledger: InventoryLedger,
  actor: &Actor,
  shipping_address: Option<String>,
) -> Result<CheckoutReceipt, FulfillmentError> {
  authorize(actor, Resource::OwnAccount, Action::Checkout)?;

  let ctx = ContextData::new(CheckoutCtxData::new(store, ledger, actor.user_id, shipping_address));
  let outcome = match registry.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => Ok(()),
    Ok(PipelineResult::Stopped) => Err(FulfillmentError::from(PipelineError::Halted {
      context_type: std::any::type_name::<CheckoutCtxData>().to_string(),
    })),
    Err(e) => Err(e),
  };

  if let Err(e) = outcome {
    roll_back(&ctx).await;
    if e.is_expected() {
      warn!(error = %e, "Checkout rejected.");
    } else {
      error!(error = ?e, "Checkout failed.");
    }
    return Err(e);
  }

  let receipt = ctx.with(|d| {
    let order = d.order.as_ref()?;
    let quote = d.quote.as_ref()?;
    d.committed.then(|| CheckoutReceipt {
      order_id: order.id,
      total_cents: quote.total_cents,
      delivery_fee_cents: quote.delivery_fee_cents,
      items: d.items.clone(),
    })
  });
  let receipt = receipt
    .ok_or_else(|| FulfillmentError::Internal("checkout completed without a committed order".to_string()))?;

  info!(order_id = %receipt.order_id, total_cents = receipt.total_cents, "Checkout completed.");
  Ok(receipt)
}

async fn roll_back(ctx: &ContextData<CheckoutCtxData>) {
  let pending = ctx.with(|d| d.transaction.lock().take());
  let Some(tx) = pending else { return };
  match tx.rollback().await {
    Ok(()) => info!("Checkout transaction rolled back."),
    Err(e) => error!(error = %e, "Checkout rollback failed; the store discards the transaction on its own."),
  }
}

// core/src/checkout/context.rs

use crate::error::FulfillmentError;
use crate::inventory::InventoryLedger;
use crate::models::{CartLine, Order, OrderItem, Product};
use crate::pricing::Quote;
use crate::store::{Store, StoreTransaction};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// State of one checkout run, shared by every step of the checkout pipeline.
pub struct CheckoutCtxData {
  pub store: Arc<dyn Store>,
  pub ledger: InventoryLedger,
  pub user_id: Uuid,
  /// Already trimmed; `None` when the caller sent no usable address.
  pub shipping_address: Option<String>,

  pub cart_lines: Vec<CartLine>,
  /// Resolved products, index-aligned with `cart_lines`.
  pub products: Vec<Product>,
  pub quote: Option<Quote>,
  pub order: Option<Order>,
  pub items: Vec<OrderItem>,

  /// The open store transaction between `open_transaction` and
  /// `commit_transaction`. Steps take it out for the duration of their store
  /// calls and put it back afterwards.
  pub transaction: Mutex<Option<Box<dyn StoreTransaction>>>,
  pub committed: bool,
}

impl CheckoutCtxData {
  pub fn new(store: Arc<dyn Store>, ledger: InventoryLedger, user_id: Uuid, shipping_address: Option<String>) -> Self {
    let shipping_address = shipping_address
      .map(|a| a.trim().to_string())
      .filter(|a| !a.is_empty());
    Self {
      store,
      ledger,
      user_id,
      shipping_address,
      cart_lines: Vec::new(),
      products: Vec::new(),
      quote: None,
      order: None,
      items: Vec::new(),
      transaction: Mutex::new(None),
      committed: false,
    }
  }

  pub(crate) fn take_transaction(&self) -> Result<Box<dyn StoreTransaction>, FulfillmentError> {
    self
      .transaction
      .lock()
      .take()
      .ok_or_else(|| FulfillmentError::Internal("checkout step ran without an open transaction".to_string()))
  }

  pub(crate) fn restore_transaction(&self, tx: Box<dyn StoreTransaction>) {
    *self.transaction.lock() = Some(tx);
  }

  pub fn has_open_transaction(&self) -> bool {
    self.transaction.lock().is_some()
  }
}

impl std::fmt::Debug for CheckoutCtxData {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CheckoutCtxData")
      .field("user_id", &self.user_id)
      .field("shipping_address", &self.shipping_address)
      .field("cart_lines", &self.cart_lines.len())
      .field("order_id", &self.order.as_ref().map(|o| o.id))
      .field("items", &self.items.len())
      .field("open_transaction", &self.has_open_transaction())
      .field("committed", &self.committed)
      .finish()
  }
}

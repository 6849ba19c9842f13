// core/src/store/memory.rs

//! A process-local [`Store`] used by tests and local runs.
//!
//! Transactions work on a private snapshot of the whole state and publish it
//! on commit. A commit fails if anything else committed since the snapshot was
//! taken, which gives the same guarantee as serializable isolation for the
//! stock counter. Failures can be injected at named points to exercise
//! rollback paths.

use super::{OrderStore, StockUpdate, Store, StoreResult, StoreTransaction, UserStore};
use crate::analytics::SaleLine;
use crate::calendar::DateWindow;
use crate::error::FulfillmentError;
use crate::models::{
  CartLine, Order, OrderItem, OrderItemDetail, OrderPatch, OrderStatus, Product, ProductSummary, ShippingFee,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Transactional operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
  InsertOrder,
  InsertOrderItem,
  AdjustStock,
  ClearCart,
  DeleteOrderItem,
  DeleteOrder,
  Commit,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
  version: u64,
  products: HashMap<Uuid, Product>,
  /// user id -> saved address
  users: HashMap<Uuid, Option<String>>,
  cart: Vec<CartLine>,
  shipping_fee: Option<ShippingFee>,
  orders: Vec<Order>,
  items: Vec<OrderItem>,
}

impl MemoryState {
  fn order(&self, order_id: Uuid) -> Option<&Order> {
    self.orders.iter().find(|o| o.id == order_id)
  }

  fn touch(&mut self) {
    self.version += 1;
  }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
  state: Arc<Mutex<MemoryState>>,
  fail_points: Arc<Mutex<Vec<FailPoint>>>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes the next transactional call at `point` fail with a storage error.
  pub fn fail_at(&self, point: FailPoint) {
    self.fail_points.lock().push(point);
  }

  pub fn add_user(&self, user_id: Uuid) {
    let mut state = self.state.lock();
    state.users.entry(user_id).or_insert(None);
    state.touch();
  }

  pub fn user_address(&self, user_id: Uuid) -> Option<String> {
    self.state.lock().users.get(&user_id).cloned().flatten()
  }

  pub fn add_product(&self, name: &str, price_cents: i64, stock: i32) -> Product {
    let product = Product {
      id: Uuid::new_v4(),
      name: name.to_string(),
      price_cents,
      stock,
    };
    let mut state = self.state.lock();
    state.products.insert(product.id, product.clone());
    state.touch();
    product
  }

  pub fn remove_product(&self, product_id: Uuid) {
    let mut state = self.state.lock();
    state.products.remove(&product_id);
    state.touch();
  }

  pub fn set_product_price(&self, product_id: Uuid, price_cents: i64) {
    let mut state = self.state.lock();
    if let Some(p) = state.products.get_mut(&product_id) {
      p.price_cents = price_cents;
    }
    state.touch();
  }

  pub fn stock_of(&self, product_id: Uuid) -> Option<i32> {
    self.state.lock().products.get(&product_id).map(|p| p.stock)
  }

  pub fn set_shipping_fee(&self, delivery_fee_cents: Option<i64>) {
    let mut state = self.state.lock();
    state.shipping_fee = delivery_fee_cents.map(|delivery_fee_cents| ShippingFee { delivery_fee_cents });
    state.touch();
  }

  pub fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> CartLine {
    let line = CartLine {
      id: Uuid::new_v4(),
      user_id,
      product_id,
      quantity,
    };
    let mut state = self.state.lock();
    state.cart.push(line.clone());
    state.touch();
    line
  }

  pub fn cart_snapshot(&self, user_id: Uuid) -> Vec<CartLine> {
    self.state.lock().cart.iter().filter(|l| l.user_id == user_id).cloned().collect()
  }

  /// Inserts a historical order with one item per `(product_id, quantity)`.
  pub fn seed_order(&self, user_id: Uuid, status: OrderStatus, created_at: DateTime<Utc>, lines: &[(Uuid, i32)]) -> Order {
    let mut order = Order::pending(user_id, 0, created_at);
    order.status = status;
    let mut state = self.state.lock();
    for (product_id, quantity) in lines {
      let price = state.products.get(product_id).map_or(0, |p| p.price_cents);
      order.total_price_cents += price * i64::from(*quantity);
      state.items.push(OrderItem {
        id: Uuid::new_v4(),
        order_id: order.id,
        product_id: *product_id,
        quantity: *quantity,
        created_at,
      });
    }
    state.orders.push(order.clone());
    state.touch();
    order
  }

  pub fn order_count(&self) -> usize {
    self.state.lock().orders.len()
  }

  pub fn item_count(&self) -> usize {
    self.state.lock().items.len()
  }
}

#[async_trait]
impl UserStore for InMemoryStore {
  async fn update_address(&self, user_id: Uuid, address: &str) -> StoreResult<bool> {
    let mut state = self.state.lock();
    let Some(slot) = state.users.get_mut(&user_id) else {
      return Ok(false);
    };
    // Transactions never read addresses, so this write does not move the version.
    *slot = Some(address.to_string());
    Ok(true)
  }
}

#[async_trait]
impl OrderStore for InMemoryStore {
  async fn all_orders(&self) -> StoreResult<Vec<Order>> {
    Ok(self.state.lock().orders.clone())
  }

  async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    Ok(self.state.lock().orders.iter().filter(|o| o.user_id == user_id).cloned().collect())
  }

  async fn order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.state.lock().order(order_id).cloned())
  }

  async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
    Ok(self.state.lock().items.iter().filter(|i| i.order_id == order_id).cloned().collect())
  }

  async fn update_order(&self, order_id: Uuid, patch: &OrderPatch) -> StoreResult<Option<Order>> {
    let mut state = self.state.lock();
    let now = Utc::now();
    let updated = state.orders.iter_mut().find(|o| o.id == order_id).map(|order| {
      order.apply_patch(patch, now);
      order.clone()
    });
    state.touch();
    Ok(updated)
  }

  async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>> {
    let patch = OrderPatch {
      status: Some(status),
      total_price_cents: None,
    };
    self.update_order(order_id, &patch).await
  }

  async fn update_order_item_quantity(&self, order_id: Uuid, item_id: Uuid, quantity: i32) -> StoreResult<Option<OrderItem>> {
    let mut state = self.state.lock();
    let updated = state
      .items
      .iter_mut()
      .find(|i| i.id == item_id && i.order_id == order_id)
      .map(|item| {
        item.quantity = quantity;
        item.clone()
      });
    state.touch();
    Ok(updated)
  }

  async fn item_details_for_user(&self, user_id: Uuid, window: Option<DateWindow>) -> StoreResult<Vec<OrderItemDetail>> {
    let state = self.state.lock();
    let details = state
      .items
      .iter()
      .filter(|item| window.map_or(true, |w| w.contains(item.created_at)))
      .filter_map(|item| {
        let order = state.order(item.order_id).filter(|o| o.user_id == user_id)?;
        Some(OrderItemDetail {
          item: item.clone(),
          order: order.summary(),
          product: state.products.get(&item.product_id).map(ProductSummary::from),
        })
      })
      .collect();
    Ok(details)
  }

  async fn delivered_sales(&self, window: Option<DateWindow>) -> StoreResult<Vec<SaleLine>> {
    let state = self.state.lock();
    let lines = state
      .items
      .iter()
      .filter(|item| {
        state.order(item.order_id).map_or(false, |o| {
          o.status == OrderStatus::Delivered && window.map_or(true, |w| w.contains(o.created_at))
        })
      })
      .map(|item| SaleLine {
        product_id: item.product_id,
        quantity: item.quantity,
        product: state.products.get(&item.product_id).map(ProductSummary::from),
      })
      .collect();
    Ok(lines)
  }
}

#[async_trait]
impl Store for InMemoryStore {
  async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
    let working = self.state.lock().clone();
    debug!(base_version = working.version, "In-memory transaction started.");
    Ok(Box::new(MemoryTransaction {
      shared: Arc::clone(&self.state),
      fail_points: Arc::clone(&self.fail_points),
      base_version: working.version,
      working,
    }))
  }
}

struct MemoryTransaction {
  shared: Arc<Mutex<MemoryState>>,
  fail_points: Arc<Mutex<Vec<FailPoint>>>,
  base_version: u64,
  working: MemoryState,
}

impl MemoryTransaction {
  fn trip(&self, point: FailPoint) -> StoreResult<()> {
    let mut points = self.fail_points.lock();
    if let Some(pos) = points.iter().position(|p| *p == point) {
      points.remove(pos);
      return Err(FulfillmentError::storage(anyhow!("injected failure at {:?}", point)));
    }
    Ok(())
  }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
  async fn cart_lines_for_update(&mut self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
    Ok(self.working.cart.iter().filter(|l| l.user_id == user_id).cloned().collect())
  }

  async fn product(&mut self, product_id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.working.products.get(&product_id).cloned())
  }

  async fn shipping_fee(&mut self) -> StoreResult<Option<ShippingFee>> {
    Ok(self.working.shipping_fee)
  }

  async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
    self.trip(FailPoint::InsertOrder)?;
    self.working.orders.push(order.clone());
    Ok(())
  }

  async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
    self.trip(FailPoint::InsertOrderItem)?;
    if self.working.order(item.order_id).is_none() {
      return Err(FulfillmentError::storage(anyhow!(
        "order item {} references missing order {}",
        item.id,
        item.order_id
      )));
    }
    self.working.items.push(item.clone());
    Ok(())
  }

  async fn adjust_stock(&mut self, product_id: Uuid, delta: i32) -> StoreResult<StockUpdate> {
    self.trip(FailPoint::AdjustStock)?;
    let Some(product) = self.working.products.get_mut(&product_id) else {
      return Ok(StockUpdate::ProductMissing);
    };
    let Some(stock) = product.stock.checked_add(delta) else {
      return Err(FulfillmentError::storage(anyhow!(
        "stock for product {} overflows: {} + {}",
        product_id,
        product.stock,
        delta
      )));
    };
    if stock < 0 {
      return Ok(StockUpdate::Insufficient { available: product.stock });
    }
    product.stock = stock;
    Ok(StockUpdate::Applied { stock })
  }

  async fn clear_cart(&mut self, user_id: Uuid) -> StoreResult<u64> {
    self.trip(FailPoint::ClearCart)?;
    let before = self.working.cart.len();
    self.working.cart.retain(|l| l.user_id != user_id);
    Ok((before - self.working.cart.len()) as u64)
  }

  async fn order_for_update(&mut self, order_id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.working.order(order_id).cloned())
  }

  async fn delete_order_item(&mut self, order_id: Uuid, item_id: Uuid) -> StoreResult<bool> {
    self.trip(FailPoint::DeleteOrderItem)?;
    let before = self.working.items.len();
    self.working.items.retain(|i| !(i.id == item_id && i.order_id == order_id));
    Ok(self.working.items.len() < before)
  }

  async fn count_order_items(&mut self, order_id: Uuid) -> StoreResult<i64> {
    Ok(self.working.items.iter().filter(|i| i.order_id == order_id).count() as i64)
  }

  async fn delete_order_items(&mut self, order_id: Uuid) -> StoreResult<u64> {
    let before = self.working.items.len();
    self.working.items.retain(|i| i.order_id != order_id);
    Ok((before - self.working.items.len()) as u64)
  }

  async fn delete_order(&mut self, order_id: Uuid) -> StoreResult<bool> {
    self.trip(FailPoint::DeleteOrder)?;
    let before = self.working.orders.len();
    self.working.orders.retain(|o| o.id != order_id);
    Ok(self.working.orders.len() < before)
  }

  async fn commit(self: Box<Self>) -> StoreResult<()> {
    self.trip(FailPoint::Commit)?;
    let this = *self;
    let mut shared = this.shared.lock();
    if shared.version != this.base_version {
      return Err(FulfillmentError::storage(anyhow!(
        "could not serialize access: state changed since transaction began (version {} -> {})",
        this.base_version,
        shared.version
      )));
    }
    let mut working = this.working;
    working.version = this.base_version + 1;
    // Addresses are written outside transactions; keep the live copy.
    working.users = std::mem::take(&mut shared.users);
    *shared = working;
    debug!(version = shared.version, "In-memory transaction committed.");
    Ok(())
  }

  async fn rollback(self: Box<Self>) -> StoreResult<()> {
    debug!(base_version = self.base_version, "In-memory transaction rolled back.");
    Ok(())
  }
}

// core/src/store/mod.rs

//! Storage contracts the fulfillment core consumes.
//!
//! Reads and single-row edits go through the store directly. Anything that
//! must change several records atomically (checkout, order deletion, item
//! deletion) goes through a [`StoreTransaction`] obtained from
//! [`Store::begin`], and so do the cart, product and shipping-fee reads that
//! checkout prices from. Implementations must run transactions with serializable
//! (or stronger) isolation and roll back any transaction that is dropped
//! without `commit`.

pub mod memory;

use crate::analytics::SaleLine;
use crate::calendar::DateWindow;
use crate::error::FulfillmentError;
use crate::models::{CartLine, Order, OrderItem, OrderItemDetail, OrderPatch, OrderStatus, Product, ShippingFee};
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::{FailPoint, InMemoryStore};

pub type StoreResult<T> = Result<T, FulfillmentError>;

#[async_trait]
pub trait UserStore: Send + Sync {
  /// Returns `false` when no such user exists.
  async fn update_address(&self, user_id: Uuid, address: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn all_orders(&self) -> StoreResult<Vec<Order>>;

  async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;

  async fn order(&self, order_id: Uuid) -> StoreResult<Option<Order>>;

  async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>>;

  async fn update_order(&self, order_id: Uuid, patch: &OrderPatch) -> StoreResult<Option<Order>>;

  async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>>;

  /// `None` when the item does not exist or belongs to another order.
  async fn update_order_item_quantity(&self, order_id: Uuid, item_id: Uuid, quantity: i32) -> StoreResult<Option<OrderItem>>;

  /// Items of `user_id`'s orders, created inside `window` when one is given.
  async fn item_details_for_user(&self, user_id: Uuid, window: Option<DateWindow>) -> StoreResult<Vec<OrderItemDetail>>;

  /// Items of delivered orders whose order was created inside `window`.
  async fn delivered_sales(&self, window: Option<DateWindow>) -> StoreResult<Vec<SaleLine>>;
}

/// Result of a conditional stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUpdate {
  Applied { stock: i32 },
  /// Applying the delta would take stock below zero; nothing changed.
  Insufficient { available: i32 },
  ProductMissing,
}

#[async_trait]
pub trait StoreTransaction: Send {
  /// Reads the user's cart lines and locks them for the rest of the transaction.
  async fn cart_lines_for_update(&mut self, user_id: Uuid) -> StoreResult<Vec<CartLine>>;

  async fn product(&mut self, product_id: Uuid) -> StoreResult<Option<Product>>;

  async fn shipping_fee(&mut self) -> StoreResult<Option<ShippingFee>>;

  async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;

  async fn insert_order_item(&mut self, item: &OrderItem) -> StoreResult<()>;

  /// Adds `delta` to the product's stock unless the result would be negative.
  async fn adjust_stock(&mut self, product_id: Uuid, delta: i32) -> StoreResult<StockUpdate>;

  async fn clear_cart(&mut self, user_id: Uuid) -> StoreResult<u64>;

  /// Reads an order and locks it for the rest of the transaction.
  async fn order_for_update(&mut self, order_id: Uuid) -> StoreResult<Option<Order>>;

  async fn delete_order_item(&mut self, order_id: Uuid, item_id: Uuid) -> StoreResult<bool>;

  async fn count_order_items(&mut self, order_id: Uuid) -> StoreResult<i64>;

  async fn delete_order_items(&mut self, order_id: Uuid) -> StoreResult<u64>;

  async fn delete_order(&mut self, order_id: Uuid) -> StoreResult<bool>;

  async fn commit(self: Box<Self>) -> StoreResult<()>;

  async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Everything the fulfillment core needs from persistence.
#[async_trait]
pub trait Store: UserStore + OrderStore {
  async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

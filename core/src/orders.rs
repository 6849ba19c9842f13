// core/src/orders.rs

//! Order aggregate lifecycle: listing, admin edits, cancellation and deletion.
//!
//! Every operation asks [`authorize`] first. Admin-only operations are decided
//! before the target is loaded; owner-or-admin operations need the order's
//! owner and therefore load it first.

use crate::calendar::MonthFilter;
use crate::error::FulfillmentError;
use crate::models::{ItemRemoval, Order, OrderItem, OrderItemDetail, OrderPatch, OrderStatus};
use crate::policy::{authorize, Action, Actor, Resource};
use crate::store::{Store, StoreTransaction};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderDeletion {
  pub order_id: Uuid,
  pub items_removed: u64,
}

#[derive(Clone)]
pub struct OrderService {
  store: Arc<dyn Store>,
}

fn order_not_found() -> FulfillmentError {
  FulfillmentError::NotFound("Order not found".to_string())
}

fn item_not_found() -> FulfillmentError {
  FulfillmentError::NotFound("Order item not found".to_string())
}

fn admin_target(order_id: Uuid) -> Resource {
  Resource::Order { id: order_id, owner: None }
}

impl OrderService {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  #[instrument(name = "orders::list_all", skip_all, fields(user_id = %actor.user_id), err(Display))]
  pub async fn list_all(&self, actor: &Actor) -> Result<Vec<Order>, FulfillmentError> {
    authorize(actor, Resource::AllOrders, Action::ListAllOrders)?;
    self.store.all_orders().await
  }

  #[instrument(name = "orders::list_mine", skip_all, fields(user_id = %actor.user_id), err(Display))]
  pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<Order>, FulfillmentError> {
    authorize(actor, Resource::OwnAccount, Action::ListOwnOrders)?;
    let orders = self.store.orders_for_user(actor.user_id).await?;
    if orders.is_empty() {
      return Err(FulfillmentError::NotFound("No orders found".to_string()));
    }
    Ok(orders)
  }

  #[instrument(name = "orders::items", skip(self, actor), fields(user_id = %actor.user_id), err(Display))]
  pub async fn order_items(&self, actor: &Actor, order_id: Uuid) -> Result<Vec<OrderItem>, FulfillmentError> {
    let order = self.store.order(order_id).await?.ok_or_else(order_not_found)?;
    authorize(
      actor,
      Resource::Order {
        id: order.id,
        owner: Some(order.user_id),
      },
      Action::ViewOrderItems,
    )?;
    self.store.order_items(order_id).await
  }

  /// Applies an allow-listed patch. Status transitions are not restricted.
  #[instrument(name = "orders::update", skip(self, actor), fields(user_id = %actor.user_id), err(Display))]
  pub async fn update_order(&self, actor: &Actor, order_id: Uuid, patch: OrderPatch) -> Result<Order, FulfillmentError> {
    authorize(actor, admin_target(order_id), Action::UpdateOrder)?;
    patch.validate()?;
    let order = self.store.update_order(order_id, &patch).await?.ok_or_else(order_not_found)?;
    info!(%order_id, status = %order.status, "Order updated.");
    Ok(order)
  }

  /// Forces the status to canceled whatever it was before.
  #[instrument(name = "orders::cancel", skip(self, actor), fields(user_id = %actor.user_id), err(Display))]
  pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order, FulfillmentError> {
    authorize(actor, admin_target(order_id), Action::CancelOrder)?;
    let order = self
      .store
      .set_order_status(order_id, OrderStatus::Canceled)
      .await?
      .ok_or_else(order_not_found)?;
    info!(%order_id, "Order canceled.");
    Ok(order)
  }

  /// Deletes a pending or canceled order together with its items.
  #[instrument(name = "orders::delete", skip(self, actor), fields(user_id = %actor.user_id), err(Display))]
  pub async fn delete_order(&self, actor: &Actor, order_id: Uuid) -> Result<OrderDeletion, FulfillmentError> {
    authorize(actor, admin_target(order_id), Action::DeleteOrder)?;
    let mut tx = self.store.begin().await?;
    let outcome = delete_order_in(tx.as_mut(), order_id).await;
    let deletion = finish(tx, outcome).await?;
    info!(%order_id, items_removed = deletion.items_removed, "Order deleted.");
    Ok(deletion)
  }

  /// Sets an item's quantity. Stock is not reconciled.
  #[instrument(name = "orders::update_item", skip(self, actor), fields(user_id = %actor.user_id), err(Display))]
  pub async fn update_order_item(
    &self,
    actor: &Actor,
    order_id: Uuid,
    item_id: Uuid,
    quantity: i32,
  ) -> Result<OrderItem, FulfillmentError> {
    authorize(actor, Resource::OrderItem { order_id, item_id }, Action::UpdateOrderItem)?;
    if quantity < 1 {
      return Err(FulfillmentError::Validation("Quantity must be at least 1".to_string()));
    }
    self
      .store
      .update_order_item_quantity(order_id, item_id, quantity)
      .await?
      .ok_or_else(item_not_found)
  }

  /// Removes one item; removing the last one removes the order as well.
  #[instrument(name = "orders::delete_item", skip(self, actor), fields(user_id = %actor.user_id), err(Display))]
  pub async fn delete_order_item(&self, actor: &Actor, order_id: Uuid, item_id: Uuid) -> Result<ItemRemoval, FulfillmentError> {
    authorize(actor, Resource::OrderItem { order_id, item_id }, Action::DeleteOrderItem)?;
    let mut tx = self.store.begin().await?;
    let outcome = delete_item_in(tx.as_mut(), order_id, item_id).await;
    let removal = finish(tx, outcome).await?;
    info!(%order_id, %item_id, ?removal, "Order item deleted.");
    Ok(removal)
  }

  /// The caller's order items, optionally limited to one month of the year of `now`.
  #[instrument(name = "orders::items_for_month", skip(self, actor), fields(user_id = %actor.user_id), err(Display))]
  pub async fn items_for_month(
    &self,
    actor: &Actor,
    filter: MonthFilter,
    now: DateTime<Utc>,
  ) -> Result<Vec<OrderItemDetail>, FulfillmentError> {
    authorize(actor, Resource::OwnAccount, Action::ViewOwnItemHistory)?;
    let window = filter.window_at(now)?;
    self.store.item_details_for_user(actor.user_id, window).await
  }
}

async fn delete_order_in(tx: &mut dyn StoreTransaction, order_id: Uuid) -> Result<OrderDeletion, FulfillmentError> {
  let order = tx.order_for_update(order_id).await?.ok_or_else(order_not_found)?;
  if !order.status.is_deletable() {
    warn!(%order_id, status = %order.status, "Delete refused for order status.");
    return Err(FulfillmentError::Conflict(
      "Only pending or canceled orders can be deleted".to_string(),
    ));
  }
  let items_removed = tx.delete_order_items(order_id).await?;
  if !tx.delete_order(order_id).await? {
    return Err(order_not_found());
  }
  Ok(OrderDeletion { order_id, items_removed })
}

async fn delete_item_in(tx: &mut dyn StoreTransaction, order_id: Uuid, item_id: Uuid) -> Result<ItemRemoval, FulfillmentError> {
  tx.order_for_update(order_id).await?.ok_or_else(item_not_found)?;
  if !tx.delete_order_item(order_id, item_id).await? {
    return Err(item_not_found());
  }
  if tx.count_order_items(order_id).await? > 0 {
    return Ok(ItemRemoval::ItemOnly);
  }
  tx.delete_order(order_id).await?;
  Ok(ItemRemoval::ItemAndOrder)
}

/// Commits on success, rolls back on failure.
async fn finish<T>(tx: Box<dyn StoreTransaction>, outcome: Result<T, FulfillmentError>) -> Result<T, FulfillmentError> {
  match outcome {
    Ok(value) => {
      tx.commit().await?;
      Ok(value)
    }
    Err(e) => {
      if let Err(rollback_err) = tx.rollback().await {
        error!(error = %rollback_err, "Rollback failed.");
      }
      Err(e)
    }
  }
}

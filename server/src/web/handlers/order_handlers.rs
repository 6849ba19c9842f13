// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use fulfillment::models::{ItemRemoval, OrderPatch};
use fulfillment::MonthFilter;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct UpdateItemRequestPayload {
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct ItemHistoryQuery {
  pub month: Option<String>,
}

#[instrument(name = "handler::list_all_orders", skip_all, fields(user_id = %auth_user.actor.user_id))]
pub async fn list_all_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.orders.list_all(&auth_user.actor).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::list_my_orders", skip_all, fields(user_id = %auth_user.actor.user_id))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.orders.list_mine(&auth_user.actor).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::order_items", skip(app_state, auth_user), fields(user_id = %auth_user.actor.user_id))]
pub async fn order_items_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let items = app_state.orders.order_items(&auth_user.actor, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(items))
}

#[instrument(name = "handler::update_order", skip(app_state, auth_user, patch), fields(user_id = %auth_user.actor.user_id))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  patch: web::Json<OrderPatch>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .orders
    .update_order(&auth_user.actor, path.into_inner(), patch.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::cancel_order", skip(app_state, auth_user), fields(user_id = %auth_user.actor.user_id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.cancel_order(&auth_user.actor, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::delete_order", skip(app_state, auth_user), fields(user_id = %auth_user.actor.user_id))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let deletion = app_state.orders.delete_order(&auth_user.actor, path.into_inner()).await?;
  info!(order_id = %deletion.order_id, items_removed = deletion.items_removed, "Order deleted.");
  Ok(HttpResponse::Ok().json(json!({
    "message": "Order deleted",
    "order_id": deletion.order_id,
    "items_removed": deletion.items_removed,
  })))
}

#[instrument(
  name = "handler::update_order_item",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.actor.user_id, quantity = req_payload.quantity)
)]
pub async fn update_order_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<(Uuid, Uuid)>,
  req_payload: web::Json<UpdateItemRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let (order_id, item_id) = path.into_inner();
  let item = app_state
    .orders
    .update_order_item(&auth_user.actor, order_id, item_id, req_payload.quantity)
    .await?;
  Ok(HttpResponse::Ok().json(item))
}

#[instrument(name = "handler::delete_order_item", skip(app_state, auth_user), fields(user_id = %auth_user.actor.user_id))]
pub async fn delete_order_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
  let (order_id, item_id) = path.into_inner();
  let removal = app_state.orders.delete_order_item(&auth_user.actor, order_id, item_id).await?;
  let message = match removal {
    ItemRemoval::ItemAndOrder => "Order and item deleted",
    ItemRemoval::ItemOnly => "Order item deleted",
  };
  Ok(HttpResponse::Ok().json(json!({ "message": message, "removed": removal })))
}

#[instrument(name = "handler::my_order_items", skip(app_state, auth_user), fields(user_id = %auth_user.actor.user_id))]
pub async fn my_order_items_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<ItemHistoryQuery>,
) -> Result<HttpResponse, AppError> {
  let filter = MonthFilter::parse(query.month.as_deref())?;
  let items = app_state.orders.items_for_month(&auth_user.actor, filter, Utc::now()).await?;
  Ok(HttpResponse::Ok().json(items))
}

// server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use fulfillment::run_checkout;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[derive(Deserialize, Debug, Default)]
pub struct CheckoutRequestPayload {
  #[serde(default)]
  pub address: Option<String>,
}

#[instrument(
  name = "handler::checkout",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.actor.user_id)
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: Option<web::Json<CheckoutRequestPayload>>,
) -> Result<HttpResponse, AppError> {
  let address = req_payload.and_then(|p| p.into_inner().address);

  let receipt = run_checkout(
    &app_state.registry,
    app_state.store.clone(),
    app_state.ledger,
    &auth_user.actor,
    address,
  )
  .await?;

  info!(order_id = %receipt.order_id, "Order placed.");
  Ok(HttpResponse::Created().json(json!({
    "message": "Order placed successfully",
    "order_id": receipt.order_id,
    "total": receipt.total_cents,
    "delivery_fee": receipt.delivery_fee_cents,
    "items": receipt.items,
  })))
}

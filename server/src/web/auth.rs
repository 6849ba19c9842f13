// server/src/web/auth.rs

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use fulfillment::{Actor, Role};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The caller as asserted by the trusted gateway in front of this service.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub actor: Actor,
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
  req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn actor_from_headers(req: &HttpRequest) -> Result<Actor, AppError> {
  let user_id = header(req, USER_ID_HEADER)
    .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    .ok_or_else(|| AppError::Auth(format!("Missing or invalid {} header", USER_ID_HEADER)))?;

  // A missing role means an ordinary customer.
  let role = match header(req, USER_ROLE_HEADER) {
    None => Role::Customer,
    Some(raw) => raw
      .parse::<Role>()
      .map_err(|_| AppError::Auth(format!("Invalid {} header", USER_ROLE_HEADER)))?,
  };
  Ok(Actor { user_id, role })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(actor_from_headers(req).map(|actor| AuthenticatedUser { actor }).map_err(|e| {
      warn!(error = %e, path = %req.path(), "Rejected unauthenticated request.");
      e
    }))
  }
}

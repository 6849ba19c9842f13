// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use fulfillment::{FulfillmentError, PipelineError};
use once_cell::sync::OnceCell;
use serde_json::json;
use thiserror::Error;

static EXPOSE_INTERNAL_DETAILS: OnceCell<bool> = OnceCell::new();

/// Whether 500 responses carry the underlying error text. Set once at startup.
pub fn expose_internal_details(expose: bool) {
  let _ = EXPOSE_INTERNAL_DETAILS.set(expose);
}

fn internal_details_exposed() -> bool {
  EXPOSE_INTERNAL_DETAILS.get().copied().unwrap_or(false)
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Storage Error: {0:#}")]
  Storage(anyhow::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: PipelineError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<FulfillmentError> for AppError {
  fn from(err: FulfillmentError) -> Self {
    match err {
      FulfillmentError::Validation(m) => AppError::Validation(m),
      FulfillmentError::NotFound(m) => AppError::NotFound(m),
      FulfillmentError::Forbidden(m) => AppError::Forbidden(m),
      FulfillmentError::Conflict(m) => AppError::Conflict(m),
      FulfillmentError::Storage { source } => AppError::Storage(source),
      FulfillmentError::Workflow { source } => AppError::Workflow { source },
      FulfillmentError::Internal(m) => AppError::Internal(m),
    }
  }
}

impl AppError {
  /// The caller-facing message for expected failures; `None` for internal ones.
  fn client_message(&self) -> Option<&str> {
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::NotFound(m) | AppError::Conflict(m) => {
        Some(m)
      }
      _ => None,
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      // Conflicts are reported as bad requests to match the public API.
      AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    let body = match self.client_message() {
      Some(message) => {
        tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
        json!({"error": message})
      }
      None => {
        tracing::error!(application_error = ?self, "Responding with internal error");
        if internal_details_exposed() {
          json!({"error": "An internal error occurred", "detail": self.to_string()})
        } else {
          json!({"error": "An internal error occurred"})
        }
      }
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

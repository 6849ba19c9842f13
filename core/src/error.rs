// core/src/error.rs

//! Error types for the pipeline engine and the fulfillment domain.

use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the step pipeline engine itself, as opposed to the
/// handlers it runs.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("Context type mismatch during dispatch (expected {expected_type})")]
  TypeMismatch { expected_type: String },

  #[error("Pipeline for '{context_type}' was stopped before completing")]
  Halted { context_type: String },
}

/// The error taxonomy every fulfillment operation reports.
///
/// `Validation`, `NotFound`, `Forbidden` and `Conflict` are expected outcomes
/// with caller-facing messages. `Storage` and `Internal` are unexpected and
/// should be logged in full but reported opaquely.
#[derive(Debug, Error)]
pub enum FulfillmentError {
  #[error("Validation failed: {0}")]
  Validation(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Storage failure: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },

  #[error("Workflow failure: {source}")]
  Workflow {
    #[from]
    source: PipelineError,
  },

  #[error("Internal error: {0}")]
  Internal(String),
}

impl FulfillmentError {
  pub fn storage(err: impl Into<AnyhowError>) -> Self {
    FulfillmentError::Storage { source: err.into() }
  }

  /// True for the locally detected outcomes that carry a caller-facing message.
  pub fn is_expected(&self) -> bool {
    matches!(
      self,
      FulfillmentError::Validation(_)
        | FulfillmentError::NotFound(_)
        | FulfillmentError::Forbidden(_)
        | FulfillmentError::Conflict(_)
    )
  }
}

pub type Result<T, E = FulfillmentError> = std::result::Result<T, E>;

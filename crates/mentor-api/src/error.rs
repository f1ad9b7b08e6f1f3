//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Caller identity headers are missing or malformed.
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// The caller's role may not perform this operation.
  #[error("forbidden: {0}")]
  Forbidden(String),

  /// A self-assessment link that has expired.
  #[error("gone: {0}")]
  Gone(String),

  /// Well-formed input that fails an analytics precondition.
  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

impl From<mentor_core::Error> for ApiError {
  fn from(e: mentor_core::Error) -> Self {
    use mentor_core::Error as E;
    match e {
      E::InsufficientHistory { .. } | E::TooFewSelected { .. } | E::TooManySelected { .. } => {
        Self::Unprocessable(e.to_string())
      }
      E::EmptyTaxonomy { .. } | E::Serialization(_) => Self::BadRequest(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Gone(m) => (StatusCode::GONE, m.clone()),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

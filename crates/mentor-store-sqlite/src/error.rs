//! Error type for `mentor-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum code or count that no longer decodes.
  #[error("invalid {column} value: {value:?}")]
  InvalidValue { column: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

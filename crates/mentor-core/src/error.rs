//! Error types for `mentor-core`.
//!
//! Scoring and template generation never fail; these errors cover the
//! preconditions of the analytics views.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("growth view needs at least 2 completed assessments, found {found}")]
  InsufficientHistory { found: usize },

  #[error("select at least 2 assessments to compare (got {selected})")]
  TooFewSelected { selected: usize },

  #[error("at most 4 assessments can be compared (got {selected})")]
  TooManySelected { selected: usize },

  #[error("taxonomy {version:?} has no domains")]
  EmptyTaxonomy { version: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

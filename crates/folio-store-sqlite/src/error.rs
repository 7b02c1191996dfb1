//! Error type for `folio-store-sqlite`.

use folio_core::ValidationErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] folio_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A create named an id that is already stored.
  #[error("edition already exists: {0}")]
  EditionExists(uuid::Uuid),
}

impl Error {
  /// The field-level failures, if the write was refused by validation.
  pub fn validation_errors(&self) -> Option<&ValidationErrors> {
    match self {
      Self::Core(e) => e.validation_errors(),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

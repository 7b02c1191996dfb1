//! Error types for `folio-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{edition::EditionKind, validation::ValidationErrors};

#[derive(Debug, Error)]
pub enum Error {
  /// The document failed validation and must not be persisted.
  #[error("validation failed: {0}")]
  Invalid(ValidationErrors),

  #[error("edition not found: {0}")]
  EditionNotFound(Uuid),

  /// The edition is already at the highest representable version.
  #[error("edition {0} has no next version number")]
  VersionOverflow(Uuid),

  #[error("node not found: {0}")]
  NodeNotFound(Uuid),

  #[error("option not found: {0}")]
  OptionNotFound(Uuid),

  #[error("{kind} editions have no {attribute:?} attribute")]
  UnknownAttribute {
    kind:      EditionKind,
    attribute: &'static str,
  },

  #[error("{0} editions do not embed nodes")]
  NodesUnsupported(EditionKind),

  #[error("cannot derive an environment from service url {0:?}")]
  Environment(String),

  #[error("url error: {0}")]
  Url(#[from] url::ParseError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// The field-level failures, if this error is a refused validation.
  pub fn validation_errors(&self) -> Option<&ValidationErrors> {
    match self {
      Self::Invalid(errors) => Some(errors),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

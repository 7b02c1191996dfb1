//! The `PublishingStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `folio-store-sqlite`).
//! Callers depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  artefact::{Artefact, NewArtefact},
  downtime::Downtime,
  edition::{Edition, EditionKind, EditionUpdate},
  validation::{Validate, ValidationContext, ValidationErrors},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// "Is `field == value` on any edition of `kind` whose artefact is not
/// `excluding_artefact`?"
///
/// The scope is the owning artefact, not the edition itself: every version
/// of one lineage may share an identifier, and two editions of the same
/// artefact are never compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierQuery {
  pub kind:               EditionKind,
  pub field:              &'static str,
  pub value:              String,
  pub excluding_artefact: Uuid,
  /// When `false`, archived editions do not count as holders.
  pub include_archived:   bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a document store holding artefacts, editions and
/// downtime notices.
///
/// Every write validates first and refuses to persist an invalid document.
/// Validation failures surface as the backend's error type wrapping
/// [`crate::Error::Invalid`].
pub trait PublishingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Artefacts ─────────────────────────────────────────────────────────

  fn add_artefact(
    &self,
    input: NewArtefact,
  ) -> impl Future<Output = Result<Artefact, Self::Error>> + Send + '_;

  fn get_artefact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Artefact>, Self::Error>> + Send + '_;

  // ── Editions ──────────────────────────────────────────────────────────

  /// Validate (on create) and insert a new edition with its nodes.
  fn create_edition(
    &self,
    edition: Edition,
  ) -> impl Future<Output = Result<Edition, Self::Error>> + Send + '_;

  /// Validate (on update) and replace a stored edition and all its nodes.
  fn update_edition(
    &self,
    edition: Edition,
  ) -> impl Future<Output = Result<Edition, Self::Error>> + Send + '_;

  /// Apply a batch update, including nested node mutations, as one logical
  /// operation: node writes are replayed one by one before a single write of
  /// the edition document.
  fn update_edition_attributes(
    &self,
    id: Uuid,
    update: EditionUpdate,
  ) -> impl Future<Output = Result<Edition, Self::Error>> + Send + '_;

  fn get_edition(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Edition>, Self::Error>> + Send + '_;

  /// Every edition of one artefact, ordered by version number.
  fn editions_for(
    &self,
    panopticon_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Edition>, Self::Error>> + Send + '_;

  /// Remove an edition and its nodes. Returns `false` if it did not exist.
  fn delete_edition(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn identifier_taken<'a>(
    &'a self,
    query: &'a IdentifierQuery,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Downtime ──────────────────────────────────────────────────────────

  /// Derive the message if blank, validate (on create when no record with
  /// this id exists yet, on update otherwise) and upsert.
  fn save_downtime(
    &self,
    downtime: Downtime,
  ) -> impl Future<Output = Result<Downtime, Self::Error>> + Send + '_;

  /// The downtime notice for an artefact, if any.
  fn downtime_for(
    &self,
    artefact_id: Uuid,
  ) -> impl Future<Output = Result<Option<Downtime>, Self::Error>> + Send + '_;

  fn delete_downtime(
    &self,
    artefact_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Run an edition's own checks followed by its store-backed uniqueness check.
///
/// The uniqueness check is a plain read; concurrent writers can both pass it.
pub async fn validate_edition<S: PublishingStore>(
  store: &S,
  edition: &Edition,
  ctx: &ValidationContext,
) -> Result<ValidationErrors, S::Error> {
  let mut errors = edition.validate(ctx);
  if let Some(query) = edition.identifier_query()
    && store.identifier_taken(&query).await?
  {
    errors.taken(query.field);
  }
  Ok(errors)
}

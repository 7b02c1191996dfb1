//! Artefacts: the external aggregate an edition lineage and its downtime
//! belong to.
//!
//! Folio does not own an artefact's lifecycle; it only stores enough of it to
//! scope uniqueness checks and to hang downtime notices off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  safe_html::SafeHtml,
  validation::{Validate, ValidationContext, ValidationErrors, require},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtefactState {
  #[default]
  Draft,
  Live,
  Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artefact {
  pub id:         Uuid,
  pub name:       String,
  pub slug:       String,
  /// The edition format this artefact publishes, e.g. `"answer"`.
  pub kind:       String,
  pub owning_app: String,
  #[serde(default)]
  pub state:      ArtefactState,
  pub created_at: DateTime<Utc>,
  /// Attributes without a declared field.
  #[serde(flatten)]
  pub extra:      Map<String, Value>,
}

/// Input to [`crate::store::PublishingStore::add_artefact`].
#[derive(Debug, Clone)]
pub struct NewArtefact {
  pub name:       String,
  pub slug:       String,
  pub kind:       String,
  pub owning_app: String,
  pub state:      ArtefactState,
}

impl NewArtefact {
  pub fn into_artefact(self, now: DateTime<Utc>) -> Artefact {
    Artefact {
      id:         Uuid::new_v4(),
      name:       self.name,
      slug:       self.slug,
      kind:       self.kind,
      owning_app: self.owning_app,
      state:      self.state,
      created_at: now,
      extra:      Map::new(),
    }
  }
}

impl SafeHtml for Artefact {}

impl Validate for Artefact {
  fn validate(&self, _ctx: &ValidationContext) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    require(&mut errors, "name", Some(&self.name));
    require(&mut errors, "slug", Some(&self.slug));
    require(&mut errors, "kind", Some(&self.kind));
    require(&mut errors, "owning_app", Some(&self.owning_app));
    self.check_safe_html(&mut errors);
    errors
  }
}

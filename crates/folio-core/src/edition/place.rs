//! Place editions: a guide to finding a kind of physical location.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceDetails {
  pub introduction:     Option<String>,
  pub more_information: Option<String>,
  pub need_to_know:     Option<String>,
  /// Identifier of the place dataset to search, e.g. `"register-offices"`.
  pub place_type:       Option<String>,
  /// References to the expectations a user should have before visiting.
  pub expectation_ids:  Vec<String>,
}

impl PlaceDetails {
  pub const FIELDS_TO_CLONE: &'static [&'static str] =
    &["introduction", "more_information", "place_type", "expectation_ids"];
}

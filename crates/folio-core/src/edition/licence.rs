//! Licence editions.

use serde::{Deserialize, Serialize};

use crate::validation::{ValidationErrors, check_http_url, require};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenceDetails {
  /// Required, and unique across non-archived editions of other artefacts.
  pub licence_identifier:        Option<String>,
  pub licence_short_description: Option<String>,
  pub licence_overview:          Option<String>,
  pub will_continue_on:          Option<String>,
  pub continuation_link:         Option<String>,
}

impl LicenceDetails {
  pub const IDENTIFIER_FIELD: &'static str = "licence_identifier";

  pub const FIELDS_TO_CLONE: &'static [&'static str] = &[
    "licence_identifier",
    "licence_short_description",
    "licence_overview",
    "will_continue_on",
    "continuation_link",
  ];

  pub fn whole_body(&self) -> String {
    [
      self.licence_short_description.as_deref().unwrap_or_default(),
      self.licence_overview.as_deref().unwrap_or_default(),
    ]
    .join("\n\n")
  }

  pub(super) fn validate(&self, errors: &mut ValidationErrors) {
    require(errors, Self::IDENTIFIER_FIELD, self.licence_identifier.as_deref());
    check_http_url(errors, "continuation_link", self.continuation_link.as_deref());
  }
}

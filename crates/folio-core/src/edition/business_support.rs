//! Business-support editions: a grant, loan or scheme offered to businesses.

use serde::{Deserialize, Serialize};

use crate::validation::{Category, ValidationErrors, check_http_url, require};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessSupportDetails {
  pub short_description:           Option<String>,
  pub body:                        Option<String>,
  pub min_value:                   Option<i64>,
  pub max_value:                   Option<i64>,
  pub max_employees:               Option<i64>,
  pub organiser:                   Option<String>,
  pub eligibility:                 Option<String>,
  pub evaluation:                  Option<String>,
  pub additional_information:      Option<String>,
  pub continuation_link:           Option<String>,
  pub will_continue_on:            Option<String>,
  pub contact_details:             Option<String>,
  /// Required, and unique across editions of other artefacts.
  pub business_support_identifier: Option<String>,
}

impl BusinessSupportDetails {
  pub const IDENTIFIER_FIELD: &'static str = "business_support_identifier";

  pub const FIELDS_TO_CLONE: &'static [&'static str] = &[
    "short_description",
    "body",
    "min_value",
    "max_value",
    "max_employees",
    "organiser",
    "eligibility",
    "evaluation",
    "additional_information",
    "continuation_link",
    "will_continue_on",
    "contact_details",
    "business_support_identifier",
  ];

  pub fn whole_body(&self) -> String {
    [
      self.short_description.as_deref().unwrap_or_default(),
      self.body.as_deref().unwrap_or_default(),
    ]
    .join("\n\n")
  }

  pub(super) fn validate(&self, errors: &mut ValidationErrors) {
    if let (Some(min), Some(max)) = (self.min_value, self.max_value)
      && min > max
    {
      errors.add(
        "min_value",
        Category::Relational,
        "Min value must be smaller than max value",
      );
      errors.add(
        "max_value",
        Category::Relational,
        "Max value must be larger than min value",
      );
    }
    require(
      errors,
      Self::IDENTIFIER_FIELD,
      self.business_support_identifier.as_deref(),
    );
    check_http_url(errors, "continuation_link", self.continuation_link.as_deref());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn valid() -> BusinessSupportDetails {
    BusinessSupportDetails {
      business_support_identifier: Some("123-4-5".into()),
      ..Default::default()
    }
  }

  fn errors(d: &BusinessSupportDetails) -> ValidationErrors {
    let mut e = ValidationErrors::new();
    d.validate(&mut e);
    e
  }

  #[test]
  fn min_above_max_flags_both_fields() {
    let d = BusinessSupportDetails {
      min_value: Some(100),
      max_value: Some(50),
      ..valid()
    };
    let e = errors(&d);
    assert_eq!(e.messages("min_value"), ["Min value must be smaller than max value"]);
    assert_eq!(e.messages("max_value"), ["Max value must be larger than min value"]);
  }

  #[test]
  fn equal_or_partial_range_is_fine() {
    for (min, max) in [(Some(50), Some(50)), (Some(10), None), (None, Some(10))] {
      let d = BusinessSupportDetails { min_value: min, max_value: max, ..valid() };
      assert!(errors(&d).is_empty());
    }
  }

  #[test]
  fn identifier_is_required() {
    let d = BusinessSupportDetails::default();
    assert_eq!(errors(&d).messages("business_support_identifier"), ["can't be blank"]);
  }

  #[test]
  fn continuation_link_format() {
    let with_link = |link: &str| BusinessSupportDetails {
      continuation_link: Some(link.into()),
      ..valid()
    };
    assert!(errors(&with_link("")).is_empty());
    assert!(errors(&with_link("http://example.org")).is_empty());
    assert!(errors(&with_link("not&a+valid_url")).contains("continuation_link"));
  }

  #[test]
  fn whole_body_joins_description_and_body() {
    let d = BusinessSupportDetails {
      short_description: Some("Short".into()),
      body: Some("Long".into()),
      ..valid()
    };
    assert_eq!(d.whole_body(), "Short\n\nLong");
  }
}

//! Validation outcomes.
//!
//! Validations never fail fatally. Each check appends a [`Violation`] to a
//! [`ValidationErrors`] collection keyed by the top-level field it concerns;
//! a store refuses to persist a document while that collection is non-empty.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Messages ────────────────────────────────────────────────────────────────

pub const BLANK: &str = "can't be blank";
pub const INVALID: &str = "is invalid";
pub const TAKEN: &str = "has already been taken";

// ─── Violation ───────────────────────────────────────────────────────────────

/// The three kinds of failure a validation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  /// A required value is missing, malformed, or carries unsafe markup.
  Content,
  /// A value conflicts with another field or another record (range,
  /// uniqueness, ordering).
  Relational,
  /// A value is wrong relative to the current time.
  Timing,
}

/// A single failed check on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
  pub category: Category,
  pub message:  String,
}

// ─── ValidationErrors ────────────────────────────────────────────────────────

/// Field-to-violations mapping, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
  fields: BTreeMap<String, Vec<Violation>>,
}

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn add(
    &mut self,
    field: impl Into<String>,
    category: Category,
    message: impl Into<String>,
  ) {
    self.fields.entry(field.into()).or_default().push(Violation {
      category,
      message: message.into(),
    });
  }

  /// Record a missing required value.
  pub fn blank(&mut self, field: &str) {
    self.add(field, Category::Content, BLANK);
  }

  /// Record a malformed value.
  pub fn invalid(&mut self, field: &str) {
    self.add(field, Category::Content, INVALID);
  }

  /// Record a value already held by another record.
  pub fn taken(&mut self, field: &str) {
    self.add(field, Category::Relational, TAKEN);
  }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn len(&self) -> usize { self.fields.values().map(Vec::len).sum() }

  pub fn contains(&self, field: &str) -> bool {
    self.fields.contains_key(field)
  }

  /// The messages recorded against `field`, in the order they were added.
  pub fn messages(&self, field: &str) -> Vec<&str> {
    self
      .fields
      .get(field)
      .map(|v| v.iter().map(|x| x.message.as_str()).collect())
      .unwrap_or_default()
  }

  pub fn violations(&self, field: &str) -> &[Violation] {
    self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
  }

  /// The names of all fields with at least one violation.
  pub fn fields(&self) -> impl Iterator<Item = &str> {
    self.fields.keys().map(String::as_str)
  }

  pub fn merge(&mut self, other: ValidationErrors) {
    for (field, violations) in other.fields {
      self.fields.entry(field).or_default().extend(violations);
    }
  }

  /// `Ok(())` when empty, otherwise the collection as an [`crate::Error`].
  pub fn into_result(self) -> crate::Result<()> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(crate::Error::Invalid(self))
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, violations) in &self.fields {
      for v in violations {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{field} {}", v.message)?;
        first = false;
      }
    }
    Ok(())
  }
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Whether a document is being validated for its first save or a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  Create,
  Update,
}

/// Everything a validation may depend on besides the document itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
  pub on:  Lifecycle,
  pub now: DateTime<Utc>,
}

impl ValidationContext {
  pub fn create(now: DateTime<Utc>) -> Self {
    Self { on: Lifecycle::Create, now }
  }

  pub fn update(now: DateTime<Utc>) -> Self {
    Self { on: Lifecycle::Update, now }
  }

  pub fn is_create(&self) -> bool { self.on == Lifecycle::Create }
}

/// A document that can check its own fields.
///
/// Checks that need other records (uniqueness) live with the store; see
/// [`crate::store::validate_edition`].
pub trait Validate {
  fn validate(&self, ctx: &ValidationContext) -> ValidationErrors;

  fn is_valid(&self, ctx: &ValidationContext) -> bool {
    self.validate(ctx).is_empty()
  }
}

// ─── Field helpers ───────────────────────────────────────────────────────────

/// True when the value is absent or only whitespace.
pub fn is_blank(value: Option<&str>) -> bool {
  value.is_none_or(|s| s.trim().is_empty())
}

/// Record a presence violation on `field` when `value` is blank.
pub fn require(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
  if is_blank(value) {
    errors.blank(field);
  }
}

/// Record a format violation unless `value` is blank or an http(s) URL with a
/// host.
pub fn check_http_url(
  errors: &mut ValidationErrors,
  field: &str,
  value: Option<&str>,
) {
  let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
    return;
  };
  let ok = url::Url::parse(raw)
    .ok()
    .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
    .is_some();
  if !ok {
    errors.invalid(field);
  }
}

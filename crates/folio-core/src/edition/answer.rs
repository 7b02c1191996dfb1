//! The default edition format: a single Markdown body.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerDetails {
  pub body: Option<String>,
}

impl AnswerDetails {
  pub const FIELDS_TO_CLONE: &'static [&'static str] = &["body"];
}

//! Safe-content validation shared by every document type.
//!
//! A document is serialised to a [`serde_json::Value`] and walked depth-first.
//! Every string leaf under a top-level field is tested against a set of
//! unsafe-markup patterns; a hit records a violation against that top-level
//! field, however deep the leaf sits. Undeclared attributes and embedded
//! child documents are part of the serialised form, so they are covered
//! without any per-type schema.

use std::sync::LazyLock;

use regex::RegexSet;
use serde::Serialize;
use serde_json::Value;

use crate::validation::{Category, ValidationErrors};

pub const UNSAFE_MESSAGE: &str = "cannot include invalid HTML or JavaScript";

static UNSAFE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
  RegexSet::new([
    // Executable or embedding elements, opening or closing.
    r"(?i)<\s*/?\s*(script|iframe|frame|frameset|object|embed|applet|style|link|meta|base|form|input|button|textarea|select|svg|math)\b",
    // Inline event handlers on any element.
    r"(?i)<[^>]*\son[a-z]+\s*=",
    // Script-bearing URL schemes inside an attribute.
    r#"(?i)<[^>]*=\s*["']?\s*(javascript|vbscript|data)\s*:"#,
  ])
  .expect("unsafe markup patterns are valid")
});

/// True when `text` contains markup that must never be published.
pub fn is_unsafe(text: &str) -> bool {
  text.contains('<') && UNSAFE_PATTERNS.is_match(text)
}

/// True when any string at any depth of `value` is unsafe.
pub fn contains_unsafe(value: &Value) -> bool {
  match value {
    Value::String(s) => is_unsafe(s),
    Value::Array(items) => items.iter().any(contains_unsafe),
    Value::Object(map) => map.values().any(contains_unsafe),
    Value::Null | Value::Bool(_) | Value::Number(_) => false,
  }
}

/// Walk the top-level fields of a serialised document.
///
/// Fields named in `payloads` are embedded payloads whose own fields are
/// reported as if they were top-level (the payload's `kind` tag is skipped).
pub fn check_value(value: &Value, payloads: &[&str], errors: &mut ValidationErrors) {
  let Value::Object(map) = value else {
    return;
  };
  for (field, v) in map {
    match v {
      Value::Object(inner) if payloads.contains(&field.as_str()) => {
        for (inner_field, inner_value) in inner {
          if inner_field != "kind" && contains_unsafe(inner_value) {
            flag(errors, inner_field);
          }
        }
      }
      _ if contains_unsafe(v) => flag(errors, field),
      _ => {}
    }
  }
}

fn flag(errors: &mut ValidationErrors, field: &str) {
  if !errors
    .violations(field)
    .iter()
    .any(|v| v.message == UNSAFE_MESSAGE)
  {
    errors.add(field, Category::Content, UNSAFE_MESSAGE);
  }
}

/// Any serialisable document can be checked for unsafe content.
///
/// Implementors only override [`SafeHtml::embedded_payloads`] when part of
/// their serialised form is a nested payload whose fields are reported as
/// top-level.
pub trait SafeHtml: Serialize {
  fn embedded_payloads(&self) -> &'static [&'static str] { &[] }

  fn check_safe_html(&self, errors: &mut ValidationErrors) {
    match serde_json::to_value(self) {
      Ok(value) => check_value(&value, self.embedded_payloads(), errors),
      Err(e) => errors.add("base", Category::Content, e.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[derive(Serialize)]
  struct Dummy {
    declared: Option<String>,
    #[serde(flatten)]
    extra:    serde_json::Map<String, Value>,
  }

  impl SafeHtml for Dummy {}

  fn dummy(declared: Option<&str>, extra: Value) -> Dummy {
    let extra = match extra {
      Value::Object(m) => m,
      _ => serde_json::Map::new(),
    };
    Dummy {
      declared: declared.map(str::to_owned),
      extra,
    }
  }

  fn errors_for(d: &Dummy) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    d.check_safe_html(&mut errors);
    errors
  }

  #[test]
  fn declared_fields_are_checked() {
    let errors = errors_for(&dummy(Some("<script>alert('XSS')</script>"), json!({})));
    assert_eq!(errors.messages("declared"), [UNSAFE_MESSAGE]);
  }

  #[test]
  fn undeclared_fields_are_checked() {
    let errors = errors_for(&dummy(None, json!({ "undeclared": "<script>" })));
    assert!(errors.contains("undeclared"));
  }

  #[test]
  fn clean_nested_content_is_allowed() {
    let errors =
      errors_for(&dummy(None, json!({ "undeclared": { "clean": ["plain text"] } })));
    assert!(errors.is_empty());
  }

  #[test]
  fn dirty_nested_content_is_attributed_to_top_level_field() {
    let errors = errors_for(&dummy(
      None,
      json!({ "undeclared": { "dirty": [{ "deeper": ["ok", "<script>"] }] } }),
    ));
    assert_eq!(errors.fields().collect::<Vec<_>>(), ["undeclared"]);
  }

  #[test]
  fn plain_text_and_harmless_markup_are_allowed() {
    for text in [
      "foo bar",
      "x < y and y > z",
      "<p>A <strong>bold</strong> <a href=\"https://www.gov.uk\">link</a></p>",
      "Read about javascript: the language",
    ] {
      assert!(!is_unsafe(text), "{text:?} should be safe");
    }
  }

  #[test]
  fn dangerous_markup_is_detected() {
    for text in [
      "<SCRIPT src=x>",
      "< iframe src=\"https://example.org\">",
      "<img src=x onerror=alert(1)>",
      "<a href=\"javascript:alert(1)\">x</a>",
      "</script>",
    ] {
      assert!(is_unsafe(text), "{text:?} should be unsafe");
    }
  }

  #[test]
  fn payload_fields_are_reported_by_their_own_name() {
    let value = json!({
      "title": "fine",
      "details": { "kind": "answer", "body": "<script>" },
    });
    let mut errors = ValidationErrors::new();
    check_value(&value, &["details"], &mut errors);
    assert_eq!(errors.fields().collect::<Vec<_>>(), ["body"]);
  }
}

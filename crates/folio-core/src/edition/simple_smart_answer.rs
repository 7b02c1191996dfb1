//! Simple smart answers: a body plus a branching tree of question and outcome
//! nodes, each question offering ordered options that point at the next node.
//!
//! Nodes and their options are owned by the edition. They are addressed by
//! stable ids so a batch of nested mutations can be planned against the
//! in-memory tree and replayed by a store one node at a time.

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error, Result,
  safe_html::SafeHtml,
  validation::{Category, Validate, ValidationContext, ValidationErrors, require},
};

static SLUG_FORMAT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("slug pattern is valid"));

// ─── Payload ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleSmartAnswerDetails {
  pub body:  Option<String>,
  /// The decision tree, in storage order.
  pub nodes: Vec<Node>,
}

impl SimpleSmartAnswerDetails {
  /// Nodes are deep-copied separately by [`super::Edition::build_clone`].
  pub const FIELDS_TO_CLONE: &'static [&'static str] = &["body"];

  /// The node a user starts from.
  pub fn initial_node(&self) -> Option<&Node> { self.nodes.first() }

  pub(super) fn validate(&self, errors: &mut ValidationErrors) {
    if self.nodes.iter().any(|n| !n.errors().is_empty()) {
      errors.invalid("nodes");
    }
  }

  /// Apply a batch of nested node mutations in ascending key order.
  ///
  /// An entry with an id targets the existing node with that id: flagged
  /// for destruction it is removed together with its options, otherwise its
  /// attributes are updated in place. An entry without an id appends a new
  /// node, unless it is itself flagged for destruction. Nodes not named by
  /// any entry are left alone.
  ///
  /// Returns the per-node writes a store must replay, in the same order.
  pub fn plan_node_batch(
    &mut self,
    batch: &BTreeMap<u32, NodeAttributes>,
  ) -> Result<Vec<NodeWrite>> {
    let mut writes = Vec::with_capacity(batch.len());

    for attrs in batch.values() {
      match attrs.id {
        Some(id) => {
          let pos = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(Error::NodeNotFound(id))?;
          if attrs.destroy {
            self.nodes.remove(pos);
            writes.push(NodeWrite::Delete(id));
          } else {
            let node = &mut self.nodes[pos];
            node.apply(attrs)?;
            writes.push(NodeWrite::Update(node.clone()));
          }
        }
        None if attrs.destroy => {}
        None => {
          let node = Node::from_attributes(attrs)?;
          self.nodes.push(node.clone());
          writes.push(NodeWrite::Insert(node));
        }
      }
    }

    Ok(writes)
  }
}

/// One planned write against a stored node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeWrite {
  Delete(Uuid),
  Update(Node),
  /// Appended after every existing node.
  Insert(Node),
}

// ─── Node ────────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
  Question,
  Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id:      Uuid,
  #[serde(default)]
  pub slug:    Option<String>,
  #[serde(default)]
  pub title:   Option<String>,
  #[serde(default)]
  pub body:    Option<String>,
  #[serde(default)]
  pub order:   Option<i32>,
  #[serde(default)]
  pub kind:    Option<NodeKind>,
  #[serde(default)]
  pub options: Vec<AnswerOption>,
  #[serde(flatten)]
  pub extra:   Map<String, Value>,
}

impl Node {
  pub fn new(kind: NodeKind, slug: &str, title: &str) -> Self {
    Self {
      id:      Uuid::new_v4(),
      slug:    Some(slug.to_owned()),
      title:   Some(title.to_owned()),
      body:    None,
      order:   None,
      kind:    Some(kind),
      options: Vec::new(),
      extra:   Map::new(),
    }
  }

  /// A copy of this node and its options under fresh ids.
  pub fn duplicate(&self) -> Self {
    Self {
      id: Uuid::new_v4(),
      options: self.options.iter().map(AnswerOption::duplicate).collect(),
      ..self.clone()
    }
  }

  fn from_attributes(attrs: &NodeAttributes) -> Result<Self> {
    let mut node = Self {
      id:      Uuid::new_v4(),
      slug:    None,
      title:   None,
      body:    None,
      order:   None,
      kind:    None,
      options: Vec::new(),
      extra:   Map::new(),
    };
    node.apply(attrs)?;
    Ok(node)
  }

  fn apply(&mut self, attrs: &NodeAttributes) -> Result<()> {
    if let Some(slug) = &attrs.slug {
      self.slug = Some(slug.clone());
    }
    if let Some(title) = &attrs.title {
      self.title = Some(title.clone());
    }
    if let Some(body) = &attrs.body {
      self.body = Some(body.clone());
    }
    if let Some(order) = attrs.order {
      self.order = Some(order);
    }
    if let Some(kind) = attrs.kind {
      self.kind = Some(kind);
    }
    if let Some(batch) = &attrs.options_attributes {
      self.apply_option_batch(batch)?;
    }
    Ok(())
  }

  /// Options follow the same id / destroy / append rules as nodes. They are
  /// embedded in the node document, so no per-option write is planned.
  fn apply_option_batch(&mut self, batch: &BTreeMap<u32, OptionAttributes>) -> Result<()> {
    for attrs in batch.values() {
      match attrs.id {
        Some(id) => {
          let pos = self
            .options
            .iter()
            .position(|o| o.id == id)
            .ok_or(Error::OptionNotFound(id))?;
          if attrs.destroy {
            self.options.remove(pos);
          } else {
            self.options[pos].apply(attrs);
          }
        }
        None if attrs.destroy => {}
        None => {
          let mut option = AnswerOption::blank();
          option.apply(attrs);
          self.options.push(option);
        }
      }
    }
    Ok(())
  }

  fn errors(&self) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    require(&mut errors, "title", self.title.as_deref());
    require(&mut errors, "slug", self.slug.as_deref());
    if self.kind.is_none() {
      errors.blank("kind");
    }
    if let Some(slug) = self.slug.as_deref()
      && !slug.trim().is_empty()
      && !SLUG_FORMAT.is_match(slug)
    {
      errors.invalid("slug");
    }
    if self.kind == Some(NodeKind::Outcome) && !self.options.is_empty() {
      errors.add("options", Category::Relational, "cannot be added for an outcome");
    }
    if self.options.iter().any(|o| !o.errors().is_empty()) {
      errors.invalid("options");
    }

    self.check_safe_html(&mut errors);
    errors
  }
}

impl SafeHtml for Node {}

impl Validate for Node {
  fn validate(&self, _ctx: &ValidationContext) -> ValidationErrors { self.errors() }
}

// ─── Option ──────────────────────────────────────────────────────────────────

/// One answer to a question node, pointing at the node it leads to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
  pub id:        Uuid,
  #[serde(default)]
  pub label:     Option<String>,
  /// Derived from `label` whenever the label is set.
  #[serde(default)]
  pub slug:      Option<String>,
  /// Slug of the node this option leads to.
  #[serde(default)]
  pub next_node: Option<String>,
  #[serde(default)]
  pub order:     Option<i32>,
  #[serde(flatten)]
  pub extra:     Map<String, Value>,
}

impl AnswerOption {
  pub fn new(label: &str, next_node: &str) -> Self {
    let mut option = Self::blank();
    option.set_label(label);
    option.next_node = Some(next_node.to_owned());
    option
  }

  fn blank() -> Self {
    Self {
      id:        Uuid::new_v4(),
      label:     None,
      slug:      None,
      next_node: None,
      order:     None,
      extra:     Map::new(),
    }
  }

  pub fn set_label(&mut self, label: &str) {
    self.label = Some(label.to_owned());
    self.slug = Some(parameterize(label));
  }

  fn duplicate(&self) -> Self {
    Self { id: Uuid::new_v4(), ..self.clone() }
  }

  fn apply(&mut self, attrs: &OptionAttributes) {
    if let Some(label) = &attrs.label {
      self.set_label(label);
    }
    if let Some(next_node) = &attrs.next_node {
      self.next_node = Some(next_node.clone());
    }
    if let Some(order) = attrs.order {
      self.order = Some(order);
    }
  }

  fn errors(&self) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    require(&mut errors, "label", self.label.as_deref());
    require(&mut errors, "next_node", self.next_node.as_deref());
    if !self.slug.as_deref().is_some_and(|s| SLUG_FORMAT.is_match(s)) {
      errors.invalid("slug");
    }
    self.check_safe_html(&mut errors);
    errors
  }
}

impl SafeHtml for AnswerOption {}

impl Validate for AnswerOption {
  fn validate(&self, _ctx: &ValidationContext) -> ValidationErrors { self.errors() }
}

/// Lower-case ASCII words joined by single hyphens.
pub fn parameterize(text: &str) -> String {
  let ascii = deunicode::deunicode(text).to_ascii_lowercase();
  ascii
    .split(|c: char| !c.is_ascii_alphanumeric())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("-")
}

// ─── Nested attributes ───────────────────────────────────────────────────────

/// One entry of a nested node batch. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeAttributes {
  pub id:                 Option<Uuid>,
  #[serde(rename = "_destroy", default, deserialize_with = "destroy_flag")]
  pub destroy:            bool,
  pub slug:               Option<String>,
  pub title:              Option<String>,
  pub body:               Option<String>,
  pub order:              Option<i32>,
  pub kind:               Option<NodeKind>,
  pub options_attributes: Option<BTreeMap<u32, OptionAttributes>>,
}

/// One entry of a nested option batch inside a [`NodeAttributes`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionAttributes {
  pub id:        Option<Uuid>,
  #[serde(rename = "_destroy", default, deserialize_with = "destroy_flag")]
  pub destroy:   bool,
  pub label:     Option<String>,
  pub next_node: Option<String>,
  pub order:     Option<i32>,
}

/// Form submissions send the destroy flag as `"1"`; JSON callers send a bool.
fn destroy_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
  Ok(match Value::deserialize(deserializer)? {
    Value::Bool(b) => b,
    Value::String(s) => matches!(s.trim(), "1" | "true"),
    Value::Number(n) => n.as_i64() == Some(1),
    _ => false,
  })
}

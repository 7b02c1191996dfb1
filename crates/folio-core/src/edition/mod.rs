//! Editions: versioned instances of a piece of publishable content.
//!
//! An [`Edition`] carries the fields every format shares plus an
//! [`EditionDetails`] payload holding the format-specific fields. Validation,
//! cloning and body extraction dispatch on the payload's tag.

pub mod answer;
pub mod business_support;
pub mod licence;
pub mod place;
pub mod simple_smart_answer;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pulldown_cmark::{Event, Parser, TagEnd};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

pub use answer::AnswerDetails;
pub use business_support::BusinessSupportDetails;
pub use licence::LicenceDetails;
pub use place::PlaceDetails;
pub use simple_smart_answer::{
  AnswerOption, Node, NodeAttributes, NodeKind, NodeWrite, OptionAttributes,
  SimpleSmartAnswerDetails,
};

use crate::{
  Error, Result,
  safe_html::SafeHtml,
  store::IdentifierQuery,
  validation::{Category, Validate, ValidationContext, ValidationErrors, require},
};

// ─── State and kind ──────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EditionState {
  #[default]
  Draft,
  ScheduledForPublishing,
  Published,
  Archived,
}

/// The edition format; matches the `kind` tag of [`EditionDetails`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EditionKind {
  Answer,
  BusinessSupport,
  Licence,
  Place,
  SimpleSmartAnswer,
}

// ─── Details ─────────────────────────────────────────────────────────────────

/// The format-specific payload of an edition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditionDetails {
  Answer(AnswerDetails),
  BusinessSupport(BusinessSupportDetails),
  Licence(LicenceDetails),
  Place(PlaceDetails),
  SimpleSmartAnswer(SimpleSmartAnswerDetails),
}

impl EditionDetails {
  pub fn kind(&self) -> EditionKind {
    match self {
      Self::Answer(_) => EditionKind::Answer,
      Self::BusinessSupport(_) => EditionKind::BusinessSupport,
      Self::Licence(_) => EditionKind::Licence,
      Self::Place(_) => EditionKind::Place,
      Self::SimpleSmartAnswer(_) => EditionKind::SimpleSmartAnswer,
    }
  }

  /// An empty payload of the given kind.
  pub fn empty(kind: EditionKind) -> Self {
    match kind {
      EditionKind::Answer => Self::Answer(AnswerDetails::default()),
      EditionKind::BusinessSupport => {
        Self::BusinessSupport(BusinessSupportDetails::default())
      }
      EditionKind::Licence => Self::Licence(LicenceDetails::default()),
      EditionKind::Place => Self::Place(PlaceDetails::default()),
      EditionKind::SimpleSmartAnswer => {
        Self::SimpleSmartAnswer(SimpleSmartAnswerDetails::default())
      }
    }
  }

  /// The payload fields a new version inherits from its predecessor.
  pub fn fields_to_clone(kind: EditionKind) -> &'static [&'static str] {
    match kind {
      EditionKind::Answer => AnswerDetails::FIELDS_TO_CLONE,
      EditionKind::BusinessSupport => BusinessSupportDetails::FIELDS_TO_CLONE,
      EditionKind::Licence => LicenceDetails::FIELDS_TO_CLONE,
      EditionKind::Place => PlaceDetails::FIELDS_TO_CLONE,
      EditionKind::SimpleSmartAnswer => SimpleSmartAnswerDetails::FIELDS_TO_CLONE,
    }
  }

  fn validate(&self, errors: &mut ValidationErrors) {
    match self {
      Self::Answer(_) | Self::Place(_) => {}
      Self::BusinessSupport(d) => d.validate(errors),
      Self::Licence(d) => d.validate(errors),
      Self::SimpleSmartAnswer(d) => d.validate(errors),
    }
  }

  /// All of the edition's principal text, as Markdown.
  pub fn whole_body(&self) -> String {
    match self {
      Self::Answer(d) => d.body.clone().unwrap_or_default(),
      Self::BusinessSupport(d) => d.whole_body(),
      Self::Licence(d) => d.whole_body(),
      Self::Place(d) => d.introduction.clone().unwrap_or_default(),
      Self::SimpleSmartAnswer(d) => d.body.clone().unwrap_or_default(),
    }
  }

  /// The field that receives another format's text when converting.
  fn primary_text_mut(&mut self) -> &mut Option<String> {
    match self {
      Self::Answer(d) => &mut d.body,
      Self::BusinessSupport(d) => &mut d.body,
      Self::Licence(d) => &mut d.licence_overview,
      Self::Place(d) => &mut d.introduction,
      Self::SimpleSmartAnswer(d) => &mut d.body,
    }
  }

  fn body_mut(&mut self) -> Option<&mut Option<String>> {
    match self {
      Self::Answer(d) => Some(&mut d.body),
      Self::BusinessSupport(d) => Some(&mut d.body),
      Self::SimpleSmartAnswer(d) => Some(&mut d.body),
      Self::Licence(_) | Self::Place(_) => None,
    }
  }

  /// Embedded nodes, for formats that have them.
  pub fn nodes(&self) -> Option<&[Node]> {
    match self {
      Self::SimpleSmartAnswer(d) => Some(&d.nodes),
      _ => None,
    }
  }

  /// Copy the declared clonable subset of this payload.
  fn cloned_fields(&self) -> Result<Self> {
    let keep = Self::fields_to_clone(self.kind());
    let Value::Object(mut map) = serde_json::to_value(self)? else {
      return Ok(Self::empty(self.kind()));
    };
    map.retain(|k, _| k == "kind" || keep.contains(&k.as_str()));
    Ok(serde_json::from_value(Value::Object(map))?)
  }
}

// ─── Edition ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edition {
  pub id:             Uuid,
  /// The artefact this edition is a version of.
  pub panopticon_id:  Uuid,
  pub slug:           Option<String>,
  pub title:          Option<String>,
  pub version_number: u32,
  #[serde(default)]
  pub state:          EditionState,
  pub publish_at:     Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
  pub details:        EditionDetails,
  /// Attributes without a declared field.
  #[serde(flatten)]
  pub extra:          Map<String, Value>,
}

impl Edition {
  /// A first-version draft for `panopticon_id`.
  pub fn new(panopticon_id: Uuid, details: EditionDetails, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      panopticon_id,
      slug: None,
      title: None,
      version_number: 1,
      state: EditionState::Draft,
      publish_at: None,
      created_at: now,
      updated_at: now,
      details,
      extra: Map::new(),
    }
  }

  pub fn kind(&self) -> EditionKind { self.details.kind() }

  pub fn whole_body(&self) -> String { self.details.whole_body() }

  /// [`Self::whole_body`] rendered from Markdown to whitespace-normalised
  /// plain text, for search indexing.
  pub fn indexable_content(&self) -> String {
    markdown_text(&self.whole_body())
  }

  /// The uniqueness check this edition's identifier must pass, if its format
  /// has one and the identifier is present.
  pub fn identifier_query(&self) -> Option<IdentifierQuery> {
    let (field, value, include_archived) = match &self.details {
      EditionDetails::BusinessSupport(d) => (
        BusinessSupportDetails::IDENTIFIER_FIELD,
        d.business_support_identifier.as_deref(),
        true,
      ),
      EditionDetails::Licence(d) => (
        LicenceDetails::IDENTIFIER_FIELD,
        d.licence_identifier.as_deref(),
        false,
      ),
      _ => return None,
    };
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    Some(IdentifierQuery {
      kind: self.kind(),
      field,
      value: value.to_owned(),
      excluding_artefact: self.panopticon_id,
      include_archived,
    })
  }

  /// Build the next draft version of this edition.
  ///
  /// The clone gets a fresh id, the next version number, `draft` state and
  /// no publishing time; undeclared attributes are dropped. With `target`
  /// unset (or equal to this edition's kind) the payload's clonable fields
  /// are copied. Converting to another kind starts from that kind's empty
  /// payload and carries this edition's whole body into its primary text
  /// field. Nodes are deep-copied into simple smart answer targets only.
  pub fn build_clone(
    &self,
    target: Option<EditionKind>,
    now: DateTime<Utc>,
  ) -> Result<Edition> {
    let target = target.unwrap_or_else(|| self.kind());

    let mut details = if target == self.kind() {
      self.details.cloned_fields()?
    } else {
      let mut details = EditionDetails::empty(target);
      let text = match &self.details {
        EditionDetails::SimpleSmartAnswer(d) => d.body.clone(),
        other => Some(other.whole_body()).filter(|s| !s.trim().is_empty()),
      };
      *details.primary_text_mut() = text;
      details
    };

    if let (EditionDetails::SimpleSmartAnswer(from), EditionDetails::SimpleSmartAnswer(to)) =
      (&self.details, &mut details)
    {
      to.nodes = from.nodes.iter().map(Node::duplicate).collect();
    }

    let version_number = self
      .version_number
      .checked_add(1)
      .ok_or(Error::VersionOverflow(self.id))?;

    Ok(Edition {
      id: Uuid::new_v4(),
      panopticon_id: self.panopticon_id,
      slug: self.slug.clone(),
      title: self.title.clone(),
      version_number,
      state: EditionState::Draft,
      publish_at: None,
      created_at: now,
      updated_at: now,
      details,
      extra: Map::new(),
    })
  }

  /// Apply a batch update in memory and return the node writes a store must
  /// issue before writing the edition document itself.
  ///
  /// This is the first half of the two-phase update: nested node mutations
  /// are planned one entry at a time, in ascending entry-key order, and the
  /// edition-level fields are applied afterwards. The caller validates the
  /// resulting edition, then persists the returned writes in order followed
  /// by a single write of the edition document.
  pub fn apply_update(
    &mut self,
    update: EditionUpdate,
    now: DateTime<Utc>,
  ) -> Result<Vec<NodeWrite>> {
    let kind = self.kind();

    let writes = match (&update.nodes_attributes, &mut self.details) {
      (None, _) => Vec::new(),
      (Some(batch), EditionDetails::SimpleSmartAnswer(d)) => d.plan_node_batch(batch)?,
      (Some(_), _) => return Err(Error::NodesUnsupported(kind)),
    };

    if let Some(title) = update.title {
      self.title = Some(title);
    }
    if let Some(slug) = update.slug {
      self.slug = Some(slug);
    }
    if let Some(state) = update.state {
      self.state = state;
    }
    if let Some(publish_at) = update.publish_at {
      self.publish_at = Some(publish_at);
    }
    if let Some(body) = update.body {
      let slot = self.details.body_mut().ok_or(Error::UnknownAttribute {
        kind,
        attribute: "body",
      })?;
      *slot = Some(body);
    }
    self.updated_at = now;

    Ok(writes)
  }
}

impl SafeHtml for Edition {
  fn embedded_payloads(&self) -> &'static [&'static str] { &["details"] }
}

impl Validate for Edition {
  fn validate(&self, _ctx: &ValidationContext) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    require(&mut errors, "title", self.title.as_deref());

    if self.version_number < 1 {
      errors.add("version_number", Category::Relational, "must be greater than 0");
    }

    if self.state == EditionState::ScheduledForPublishing && self.publish_at.is_none() {
      errors.blank("publish_at");
    }

    self.details.validate(&mut errors);
    self.check_safe_html(&mut errors);
    errors
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// A batch of attribute changes to one edition, including nested node
/// mutations keyed by a caller-supplied index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditionUpdate {
  pub title:            Option<String>,
  pub slug:             Option<String>,
  pub state:            Option<EditionState>,
  pub publish_at:       Option<DateTime<Utc>>,
  pub body:             Option<String>,
  pub nodes_attributes: Option<BTreeMap<u32, NodeAttributes>>,
}

// ─── Markdown ────────────────────────────────────────────────────────────────

fn markdown_text(markdown: &str) -> String {
  let mut out = String::new();
  for event in Parser::new(markdown) {
    match event {
      Event::Text(t) | Event::Code(t) => out.push_str(&t),
      Event::SoftBreak | Event::HardBreak => out.push(' '),
      Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
        out.push(' ')
      }
      _ => {}
    }
  }
  out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::factories;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap() }

  #[test]
  fn kind_strings_match_serde_tags() {
    use strum::IntoEnumIterator;
    for kind in EditionKind::iter() {
      let tagged = serde_json::to_value(EditionDetails::empty(kind)).unwrap();
      assert_eq!(tagged["kind"], kind.to_string());
      assert_eq!(kind.to_string().parse::<EditionKind>().unwrap(), kind);
    }
  }

  #[test]
  fn title_is_required() {
    let mut e = factories::answer_edition(Uuid::new_v4());
    e.title = Some("  ".into());
    let errors = e.validate(&ValidationContext::create(now()));
    assert_eq!(errors.messages("title"), ["can't be blank"]);
  }

  #[test]
  fn scheduled_editions_need_a_publish_time() {
    let mut e = factories::answer_edition(Uuid::new_v4());
    e.state = EditionState::ScheduledForPublishing;
    assert!(e.validate(&ValidationContext::create(now())).contains("publish_at"));

    e.publish_at = Some(now());
    assert!(e.is_valid(&ValidationContext::create(now())));
  }

  #[test]
  fn unsafe_payload_field_is_reported_by_name() {
    let mut e = factories::answer_edition(Uuid::new_v4());
    e.details = EditionDetails::Answer(AnswerDetails {
      body: Some("<script>alert(1)</script>".into()),
    });
    let errors = e.validate(&ValidationContext::create(now()));
    assert_eq!(errors.fields().collect::<Vec<_>>(), ["body"]);
  }

  #[test]
  fn unsafe_undeclared_attribute_is_reported() {
    let mut e = factories::answer_edition(Uuid::new_v4());
    e.extra
      .insert("undeclared".into(), serde_json::json!({ "dirty": ["<script>"] }));
    let errors = e.validate(&ValidationContext::create(now()));
    assert!(errors.contains("undeclared"));
  }

  #[test]
  fn undeclared_attributes_round_trip_through_serde() {
    let mut e = factories::answer_edition(Uuid::new_v4());
    e.extra.insert("colour".into(), Value::String("blue".into()));
    let json = serde_json::to_value(&e).unwrap();
    assert_eq!(json["colour"], "blue");
    let back: Edition = serde_json::from_value(json).unwrap();
    assert_eq!(back, e);
  }

  #[test]
  fn clone_resets_version_bookkeeping() {
    let mut e = factories::answer_edition(Uuid::new_v4());
    e.state = EditionState::Published;
    e.publish_at = Some(now());
    e.extra.insert("note".into(), Value::String("x".into()));

    let c = e.build_clone(None, now()).unwrap();
    assert_ne!(c.id, e.id);
    assert_eq!(c.version_number, e.version_number + 1);
    assert_eq!(c.state, EditionState::Draft);
    assert_eq!(c.publish_at, None);
    assert!(c.extra.is_empty());
    assert_eq!(c.panopticon_id, e.panopticon_id);
    assert_eq!(c.slug, e.slug);
    assert_eq!(c.title, e.title);
    assert_eq!(c.details, e.details);
  }

  #[test]
  fn clone_at_highest_version_is_refused() {
    let mut e = factories::answer_edition(Uuid::new_v4());
    e.version_number = u32::MAX;
    assert!(matches!(
      e.build_clone(None, now()),
      Err(Error::VersionOverflow(id)) if id == e.id
    ));
  }

  #[test]
  fn place_clone_copies_only_declared_fields() {
    let mut e = factories::place_edition(Uuid::new_v4());
    if let EditionDetails::Place(d) = &mut e.details {
      d.expectation_ids = vec!["e1".into(), "e2".into()];
    }
    let c = e.build_clone(None, now()).unwrap();
    let (EditionDetails::Place(from), EditionDetails::Place(to)) = (&e.details, &c.details)
    else {
      panic!("expected place payloads");
    };
    assert_eq!(to.introduction, from.introduction);
    assert_eq!(to.more_information, from.more_information);
    assert_eq!(to.place_type, from.place_type);
    assert_eq!(to.expectation_ids, from.expectation_ids);
    assert_eq!(to.need_to_know, None);
  }

  #[test]
  fn converting_clone_carries_whole_body() {
    let e = factories::business_support_edition(Uuid::new_v4());
    let c = e.build_clone(Some(EditionKind::Answer), now()).unwrap();
    assert_eq!(c.kind(), EditionKind::Answer);
    assert_eq!(c.whole_body(), e.whole_body());
  }

  #[test]
  fn converting_smart_answer_clone_carries_body_but_not_nodes() {
    let e = factories::simple_smart_answer_edition_with_nodes(Uuid::new_v4());
    let c = e.build_clone(Some(EditionKind::Place), now()).unwrap();
    let EditionDetails::Place(d) = &c.details else {
      panic!("expected place payload");
    };
    assert_eq!(d.introduction.as_deref(), Some("Introduction to the smart answer"));
    assert!(c.details.nodes().is_none());
  }

  #[test]
  fn indexable_content_strips_markdown() {
    let mut e = factories::licence_edition(Uuid::new_v4());
    e.details = EditionDetails::Licence(LicenceDetails {
      licence_identifier: Some("AB1234".into()),
      licence_overview: Some("## Overview".into()),
      ..Default::default()
    });
    assert_eq!(e.indexable_content(), "Overview");

    e.details = EditionDetails::Licence(LicenceDetails {
      licence_identifier: Some("AB1234".into()),
      licence_short_description: Some("Short desc".into()),
      ..Default::default()
    });
    assert_eq!(e.indexable_content(), "Short desc");
  }

  #[test]
  fn body_update_on_format_without_body_is_refused() {
    let mut e = factories::place_edition(Uuid::new_v4());
    let err = e
      .apply_update(
        EditionUpdate { body: Some("x".into()), ..Default::default() },
        now(),
      )
      .unwrap_err();
    assert!(matches!(err, Error::UnknownAttribute { attribute: "body", .. }));
  }

  #[test]
  fn node_batch_on_format_without_nodes_is_refused() {
    let mut e = factories::answer_edition(Uuid::new_v4());
    let update = EditionUpdate {
      nodes_attributes: Some(BTreeMap::new()),
      ..Default::default()
    };
    assert!(matches!(
      e.apply_update(update, now()),
      Err(Error::NodesUnsupported(EditionKind::Answer))
    ));
  }

  #[test]
  fn identifier_query_scopes_by_artefact() {
    let artefact = Uuid::new_v4();
    let e = factories::business_support_edition(artefact);
    let q = e.identifier_query().unwrap();
    assert_eq!(q.kind, EditionKind::BusinessSupport);
    assert_eq!(q.field, "business_support_identifier");
    assert_eq!(q.excluding_artefact, artefact);
    assert!(q.include_archived);

    let l = factories::licence_edition(artefact);
    assert!(!l.identifier_query().unwrap().include_archived);

    assert!(factories::answer_edition(artefact).identifier_query().is_none());
  }
}

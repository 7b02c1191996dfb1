//! Builder functions for test fixtures.
//!
//! Each builder returns a valid, unsaved document. Unique-looking values come
//! from a process-wide sequence so fixtures built in one test never collide
//! on slugs or identifiers. Adjust the returned value with ordinary field
//! assignment or struct-update syntax.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
  artefact::{ArtefactState, NewArtefact},
  downtime::Downtime,
  edition::{
    AnswerDetails, AnswerOption, BusinessSupportDetails, Edition, EditionDetails, LicenceDetails,
    Node, NodeKind, PlaceDetails, SimpleSmartAnswerDetails,
  },
};

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// The next value of the shared fixture sequence.
pub fn sequence() -> u64 { SEQUENCE.fetch_add(1, Ordering::Relaxed) }

// ─── Artefacts ───────────────────────────────────────────────────────────────

pub fn new_artefact() -> NewArtefact {
  let n = sequence();
  NewArtefact {
    name:       format!("Artefact {n}"),
    slug:       format!("slug-{n}"),
    kind:       "answer".into(),
    owning_app: "publisher".into(),
    state:      ArtefactState::Draft,
  }
}

// ─── Editions ────────────────────────────────────────────────────────────────

/// A first-version draft of any format for `panopticon_id`.
pub fn edition(panopticon_id: Uuid, details: EditionDetails) -> Edition {
  let n = sequence();
  let mut e = Edition::new(panopticon_id, details, Utc::now());
  e.slug = Some(format!("slug-{n}"));
  e.title = Some(format!("A key answer to your question {n}"));
  e
}

pub fn answer_edition(panopticon_id: Uuid) -> Edition {
  edition(
    panopticon_id,
    EditionDetails::Answer(AnswerDetails { body: Some("An answer".into()) }),
  )
}

pub fn business_support_edition(panopticon_id: Uuid) -> Edition {
  edition(
    panopticon_id,
    EditionDetails::BusinessSupport(BusinessSupportDetails {
      short_description: Some("Support for small businesses".into()),
      body: Some("Details of the scheme".into()),
      business_support_identifier: Some(format!("bs-{}", sequence())),
      ..Default::default()
    }),
  )
}

pub fn licence_edition(panopticon_id: Uuid) -> Edition {
  edition(
    panopticon_id,
    EditionDetails::Licence(LicenceDetails {
      licence_identifier: Some(format!("AB{}", sequence())),
      ..Default::default()
    }),
  )
}

pub fn place_edition(panopticon_id: Uuid) -> Edition {
  let mut e = edition(
    panopticon_id,
    EditionDetails::Place(PlaceDetails {
      introduction: Some("Test introduction".into()),
      more_information: Some("More information".into()),
      need_to_know: Some("This service is only available in England and Wales".into()),
      place_type: Some("Location location location".into()),
      expectation_ids: Vec::new(),
    }),
  );
  e.title = Some("Far far away".into());
  e
}

pub fn simple_smart_answer_edition(panopticon_id: Uuid) -> Edition {
  let mut e = edition(
    panopticon_id,
    EditionDetails::SimpleSmartAnswer(SimpleSmartAnswerDetails {
      body:  Some("Introduction to the smart answer".into()),
      nodes: Vec::new(),
    }),
  );
  e.title = Some("Simple smart answer".into());
  e
}

/// A smart answer with one question leading to two outcomes.
pub fn simple_smart_answer_edition_with_nodes(panopticon_id: Uuid) -> Edition {
  let mut e = simple_smart_answer_edition(panopticon_id);
  let mut question = Node::new(NodeKind::Question, "question-1", "Do you like chocolate?");
  question.options = vec![
    AnswerOption::new("Yes", "outcome-1"),
    AnswerOption::new("No", "outcome-2"),
  ];
  if let EditionDetails::SimpleSmartAnswer(d) = &mut e.details {
    d.nodes = vec![
      question,
      Node::new(NodeKind::Outcome, "outcome-1", "Go and get some chocolate"),
      Node::new(NodeKind::Outcome, "outcome-2", "Have an apple instead"),
    ];
  }
  e
}

// ─── Downtime ────────────────────────────────────────────────────────────────

/// 3pm to 6pm (UTC) on the day after `now`.
pub fn downtime(artefact_id: Uuid, now: DateTime<Utc>) -> Downtime {
  let tomorrow = (now + Duration::days(1)).date_naive();
  let at = |hour| tomorrow.and_time(NaiveTime::MIN).and_utc() + Duration::hours(hour);
  let mut d = Downtime::new(artefact_id, at(15), at(18), now);
  d.message = Some("This service will be unavailable between 3:00pm and 6:00pm tomorrow".into());
  d
}

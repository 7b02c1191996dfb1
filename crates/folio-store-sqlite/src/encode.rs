//! Encoding and decoding helpers between domain documents and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings and
//! documents compact JSON. A simple smart answer's nodes are split out of its
//! edition document on write and stitched back in on read.

use chrono::{DateTime, Utc};
use folio_core::edition::{Edition, EditionDetails, Node, NodeWrite};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::Result;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_document<T: Serialize>(doc: &T) -> Result<String> {
  Ok(serde_json::to_string(doc)?)
}

pub fn decode_document<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Editions ────────────────────────────────────────────────────────────────

/// Column values for one `editions` row plus its `nodes` rows.
pub struct EncodedEdition {
  pub id:             String,
  pub panopticon_id:  String,
  pub kind:           String,
  pub state:          String,
  pub version_number: u32,
  pub updated_at:     String,
  pub document:       String,
  /// `(node_id, document)` in storage order.
  pub nodes:          Vec<(String, String)>,
}

pub fn encode_edition(edition: &Edition) -> Result<EncodedEdition> {
  let mut doc = edition.clone();
  let nodes = match &mut doc.details {
    EditionDetails::SimpleSmartAnswer(d) => std::mem::take(&mut d.nodes),
    _ => Vec::new(),
  };
  Ok(EncodedEdition {
    id:             encode_uuid(edition.id),
    panopticon_id:  encode_uuid(edition.panopticon_id),
    kind:           edition.kind().to_string(),
    state:          edition.state.to_string(),
    version_number: edition.version_number,
    updated_at:     encode_dt(edition.updated_at),
    document:       encode_document(&doc)?,
    nodes:          nodes
      .iter()
      .map(|n| Ok((encode_uuid(n.id), encode_document(n)?)))
      .collect::<Result<_>>()?,
  })
}

/// Raw strings read from an `editions` row and its `nodes` rows.
pub struct RawEdition {
  pub document: String,
  pub nodes:    Vec<String>,
}

impl RawEdition {
  pub fn decode(self) -> Result<Edition> {
    let mut edition: Edition = decode_document(&self.document)?;
    if let EditionDetails::SimpleSmartAnswer(d) = &mut edition.details {
      d.nodes = self
        .nodes
        .iter()
        .map(|n| decode_document::<Node>(n))
        .collect::<Result<_>>()?;
    }
    Ok(edition)
  }
}

// ─── Node writes ─────────────────────────────────────────────────────────────

/// A [`NodeWrite`] with its node already serialised.
pub enum EncodedNodeWrite {
  Delete(String),
  Update { node_id: String, document: String },
  Insert { node_id: String, document: String },
}

pub fn encode_node_write(write: &NodeWrite) -> Result<EncodedNodeWrite> {
  Ok(match write {
    NodeWrite::Delete(id) => EncodedNodeWrite::Delete(encode_uuid(*id)),
    NodeWrite::Update(node) => EncodedNodeWrite::Update {
      node_id:  encode_uuid(node.id),
      document: encode_document(node)?,
    },
    NodeWrite::Insert(node) => EncodedNodeWrite::Insert {
      node_id:  encode_uuid(node.id),
      document: encode_document(node)?,
    },
  })
}

//! [`SqliteStore`], the SQLite implementation of [`PublishingStore`].

use std::{path::Path, sync::Arc};

use chrono::Local;
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use folio_core::{
  ValidationContext,
  artefact::{Artefact, NewArtefact},
  clock::{Clock, SystemClock},
  downtime::Downtime,
  edition::{Edition, EditionState, EditionUpdate},
  store::{IdentifierQuery, PublishingStore, validate_edition},
  validation::Validate,
};

use crate::{
  Error, Result,
  encode::{
    EncodedEdition, EncodedNodeWrite, RawEdition, decode_document, encode_document,
    encode_dt, encode_edition, encode_node_write, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Folio publishing store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  clock: Arc<dyn Clock>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Replace the source of "now" used for timestamps and temporal checks.
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, clock: Arc::new(SystemClock) })
  }

  async fn edition_exists(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM editions WHERE id = ?1",
              rusqlite::params![id_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(exists)
  }

  /// Write an edition row and all of its nodes in one transaction.
  ///
  /// `Insert` fails on an existing id; `Replace` overwrites the row and
  /// every node.
  async fn write_edition(&self, encoded: EncodedEdition, mode: WriteMode) -> Result<()> {
    let sql = match mode {
      WriteMode::Insert => INSERT_EDITION.to_owned(),
      WriteMode::Replace => format!("{INSERT_EDITION} {REPLACE_EDITION}"),
    };
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &sql,
          rusqlite::params![
            encoded.id,
            encoded.panopticon_id,
            encoded.kind,
            encoded.state,
            encoded.version_number,
            encoded.updated_at,
            encoded.document,
          ],
        )?;
        tx.execute("DELETE FROM nodes WHERE edition_id = ?1", rusqlite::params![encoded.id])?;
        for (position, (node_id, document)) in encoded.nodes.iter().enumerate() {
          tx.execute(
            "INSERT INTO nodes (node_id, edition_id, position, document)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![node_id, encoded.id, position as i64, document],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

#[derive(Debug, Clone, Copy)]
enum WriteMode {
  Insert,
  Replace,
}

const INSERT_EDITION: &str = "
  INSERT INTO editions (
    id, panopticon_id, kind, state, version_number, updated_at, document
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const REPLACE_EDITION: &str = "
  ON CONFLICT(id) DO UPDATE SET
    panopticon_id  = excluded.panopticon_id,
    kind           = excluded.kind,
    state          = excluded.state,
    version_number = excluded.version_number,
    updated_at     = excluded.updated_at,
    document       = excluded.document";

fn load_nodes(conn: &rusqlite::Connection, edition_id: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt =
    conn.prepare("SELECT document FROM nodes WHERE edition_id = ?1 ORDER BY position")?;
  stmt
    .query_map(rusqlite::params![edition_id], |r| r.get(0))?
    .collect()
}

// ─── PublishingStore impl ────────────────────────────────────────────────────

impl PublishingStore for SqliteStore {
  type Error = Error;

  // ── Artefacts ─────────────────────────────────────────────────────────────

  async fn add_artefact(&self, input: NewArtefact) -> Result<Artefact> {
    let now = self.clock.now();
    let artefact = input.into_artefact(now);
    artefact.validate(&ValidationContext::create(now)).into_result()?;

    let id_str     = encode_uuid(artefact.id);
    let slug       = artefact.slug.clone();
    let kind       = artefact.kind.clone();
    let owning_app = artefact.owning_app.clone();
    let state      = artefact.state.to_string();
    let at_str     = encode_dt(artefact.created_at);
    let document   = encode_document(&artefact)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO artefacts (id, slug, kind, owning_app, state, created_at, document)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, slug, kind, owning_app, state, at_str, document],
        )?;
        Ok(())
      })
      .await?;

    debug!(artefact = %artefact.id, slug = %artefact.slug, "added artefact");
    Ok(artefact)
  }

  async fn get_artefact(&self, id: Uuid) -> Result<Option<Artefact>> {
    let id_str = encode_uuid(id);
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT document FROM artefacts WHERE id = ?1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(|doc| decode_document(&doc)).transpose()
  }

  // ── Editions ──────────────────────────────────────────────────────────────

  async fn create_edition(&self, edition: Edition) -> Result<Edition> {
    if self.edition_exists(edition.id).await? {
      return Err(Error::EditionExists(edition.id));
    }
    let ctx = ValidationContext::create(self.clock.now());
    validate_edition(self, &edition, &ctx).await?.into_result()?;

    self.write_edition(encode_edition(&edition)?, WriteMode::Insert).await?;
    debug!(
      edition = %edition.id,
      kind = %edition.kind(),
      version = edition.version_number,
      "created edition"
    );
    Ok(edition)
  }

  async fn update_edition(&self, mut edition: Edition) -> Result<Edition> {
    if !self.edition_exists(edition.id).await? {
      return Err(folio_core::Error::EditionNotFound(edition.id).into());
    }
    let now = self.clock.now();
    edition.updated_at = now;
    validate_edition(self, &edition, &ValidationContext::update(now))
      .await?
      .into_result()?;

    self.write_edition(encode_edition(&edition)?, WriteMode::Replace).await?;
    debug!(edition = %edition.id, "updated edition");
    Ok(edition)
  }

  async fn update_edition_attributes(&self, id: Uuid, update: EditionUpdate) -> Result<Edition> {
    let mut edition = self
      .get_edition(id)
      .await?
      .ok_or(folio_core::Error::EditionNotFound(id))?;
    let now = self.clock.now();

    // Phase one: plan node writes and apply edition fields in memory.
    let writes = edition.apply_update(update, now)?;
    validate_edition(self, &edition, &ValidationContext::update(now))
      .await?
      .into_result()?;

    let encoded_writes = writes
      .iter()
      .map(encode_node_write)
      .collect::<Result<Vec<_>>>()?;
    let parent = encode_edition(&edition)?;
    let node_count = encoded_writes.len();

    // Phase two: replay each node write, then the parent document alone.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for write in &encoded_writes {
          match write {
            EncodedNodeWrite::Delete(node_id) => {
              tx.execute("DELETE FROM nodes WHERE node_id = ?1", rusqlite::params![node_id])?;
            }
            EncodedNodeWrite::Update { node_id, document } => {
              tx.execute(
                "UPDATE nodes SET document = ?2 WHERE node_id = ?1",
                rusqlite::params![node_id, document],
              )?;
            }
            EncodedNodeWrite::Insert { node_id, document } => {
              tx.execute(
                "INSERT INTO nodes (node_id, edition_id, position, document)
                 VALUES (?1, ?2,
                   (SELECT COALESCE(MAX(position) + 1, 0) FROM nodes WHERE edition_id = ?2),
                   ?3)",
                rusqlite::params![node_id, parent.id, document],
              )?;
            }
          }
        }
        tx.execute(
          "UPDATE editions
              SET state = ?2, version_number = ?3, updated_at = ?4, document = ?5
            WHERE id = ?1",
          rusqlite::params![
            parent.id,
            parent.state,
            parent.version_number,
            parent.updated_at,
            parent.document,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(edition = %id, node_writes = node_count, "applied edition update");
    Ok(edition)
  }

  async fn get_edition(&self, id: Uuid) -> Result<Option<Edition>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawEdition> = self
      .conn
      .call(move |conn| {
        let Some(document) = conn
          .query_row(
            "SELECT document FROM editions WHERE id = ?1",
            rusqlite::params![id_str],
            |r| r.get::<_, String>(0),
          )
          .optional()?
        else {
          return Ok(None);
        };
        let nodes = load_nodes(conn, &id_str)?;
        Ok(Some(RawEdition { document, nodes }))
      })
      .await?;
    raw.map(RawEdition::decode).transpose()
  }

  async fn editions_for(&self, panopticon_id: Uuid) -> Result<Vec<Edition>> {
    let id_str = encode_uuid(panopticon_id);
    let raws: Vec<RawEdition> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, document FROM editions
            WHERE panopticon_id = ?1
            ORDER BY version_number",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut raws = Vec::with_capacity(rows.len());
        for (id, document) in rows {
          let nodes = load_nodes(conn, &id)?;
          raws.push(RawEdition { document, nodes });
        }
        Ok(raws)
      })
      .await?;
    raws.into_iter().map(RawEdition::decode).collect()
  }

  async fn delete_edition(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM editions WHERE id = ?1", rusqlite::params![id_str])? > 0)
      })
      .await?;
    if removed {
      debug!(edition = %id, "deleted edition");
    }
    Ok(removed)
  }

  async fn identifier_taken<'a>(&'a self, query: &'a IdentifierQuery) -> Result<bool> {
    let kind     = query.kind.to_string();
    let path     = format!("$.details.{}", query.field);
    let value    = query.value.clone();
    let excluded = encode_uuid(query.excluding_artefact);
    let archived = EditionState::Archived.to_string();
    let include_archived = query.include_archived;

    let taken = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM editions
                WHERE kind = ?1
                  AND trim(json_extract(document, ?2)) = ?3
                  AND panopticon_id != ?4
                  AND (?5 OR state != ?6)
                LIMIT 1",
              rusqlite::params![kind, path, value, excluded, include_archived, archived],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(taken)
  }

  // ── Downtime ──────────────────────────────────────────────────────────────

  async fn save_downtime(&self, mut downtime: Downtime) -> Result<Downtime> {
    let now    = self.clock.now();
    let id_str = encode_uuid(downtime.id);
    let artefact_str = downtime.artefact_id.map(encode_uuid);

    let (exists, artefact_known, artefact_taken) = {
      let id_str = id_str.clone();
      let artefact_str = artefact_str.clone();
      self
        .conn
        .call(move |conn| {
          let exists = conn
            .query_row(
              "SELECT 1 FROM downtimes WHERE id = ?1",
              rusqlite::params![id_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          let known = conn
            .query_row(
              "SELECT 1 FROM artefacts WHERE id = ?1",
              rusqlite::params![artefact_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          let taken = conn
            .query_row(
              "SELECT 1 FROM downtimes WHERE artefact_id = ?1 AND id != ?2",
              rusqlite::params![artefact_str, id_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          Ok((exists, known, taken))
        })
        .await?
    };

    let ctx = if exists {
      downtime.updated_at = now;
      ValidationContext::update(now)
    } else {
      ValidationContext::create(now)
    };
    let mut errors = downtime.prepare_and_validate(&ctx, &Local);
    if downtime.artefact_id.is_some() && !artefact_known {
      errors.blank("artefact");
    }
    if artefact_taken {
      errors.taken("artefact");
    }
    errors.into_result()?;

    let document = encode_document(&downtime)?;
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO downtimes (id, artefact_id, document) VALUES (?1, ?2, ?3)
           ON CONFLICT(id) DO UPDATE SET
             artefact_id = excluded.artefact_id,
             document    = excluded.document",
          rusqlite::params![id_str, artefact_str, document],
        )?;
        Ok(())
      })
      .await?;

    debug!(downtime = %downtime.id, created = !exists, "saved downtime");
    Ok(downtime)
  }

  async fn downtime_for(&self, artefact_id: Uuid) -> Result<Option<Downtime>> {
    let artefact_str = encode_uuid(artefact_id);
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT document FROM downtimes WHERE artefact_id = ?1",
              rusqlite::params![artefact_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(|doc| decode_document(&doc)).transpose()
  }

  async fn delete_downtime(&self, artefact_id: Uuid) -> Result<bool> {
    let artefact_str = encode_uuid(artefact_id);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(
          conn.execute(
            "DELETE FROM downtimes WHERE artefact_id = ?1",
            rusqlite::params![artefact_str],
          )? > 0,
        )
      })
      .await?;
    if removed {
      debug!(artefact = %artefact_id, "cleared downtime");
    }
    Ok(removed)
  }
}

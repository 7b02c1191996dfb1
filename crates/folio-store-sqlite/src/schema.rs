//! SQL schema for the Folio SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS artefacts (
    id          TEXT PRIMARY KEY,
    slug        TEXT NOT NULL,
    kind        TEXT NOT NULL,
    owning_app  TEXT NOT NULL,
    state       TEXT NOT NULL,   -- 'draft' | 'live' | 'archived'
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC
    document    TEXT NOT NULL    -- full JSON document
);

-- The document column holds the edition without its nodes.
CREATE TABLE IF NOT EXISTS editions (
    id              TEXT PRIMARY KEY,
    panopticon_id   TEXT NOT NULL,
    kind            TEXT NOT NULL,
    state           TEXT NOT NULL,
    version_number  INTEGER NOT NULL,
    updated_at      TEXT NOT NULL,
    document        TEXT NOT NULL
);

-- Nodes embedded in a simple smart answer, in storage order.
CREATE TABLE IF NOT EXISTS nodes (
    node_id     TEXT PRIMARY KEY,
    edition_id  TEXT NOT NULL REFERENCES editions(id) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    document    TEXT NOT NULL    -- node JSON including its options
);

-- At most one notice per artefact.
CREATE TABLE IF NOT EXISTS downtimes (
    id           TEXT PRIMARY KEY,
    artefact_id  TEXT NOT NULL UNIQUE,
    document     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS editions_panopticon_idx ON editions(panopticon_id);
CREATE INDEX IF NOT EXISTS editions_kind_idx       ON editions(kind);
CREATE INDEX IF NOT EXISTS nodes_edition_idx       ON nodes(edition_id, position);

PRAGMA user_version = 1;
";

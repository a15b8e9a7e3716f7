//! SQL schema for the Herald SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS content (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    section         TEXT NOT NULL,   -- 'banner' | 'stygian' | 'spiral_abyss' | 'events'
    title           TEXT,
    name            TEXT,
    description     TEXT,
    expires_asia    TEXT,            -- 'YYYY-MM-DD HH:MM:SS' UTC; lexicographically ordered
    expires_europe  TEXT,
    expires_america TEXT,
    image_ref       TEXT
);

-- The alert ledger. One row per delivered notification; the composite
-- uniqueness key is the sole duplicate-suppression mechanism. Rows are
-- never updated, only inserted and cascade-deleted with their record.
CREATE TABLE IF NOT EXISTS sent_alerts (
    content_id INTEGER NOT NULL REFERENCES content(id) ON DELETE CASCADE,
    region     TEXT NOT NULL,       -- 'asia' | 'europe' | 'america'
    kind       TEXT NOT NULL,       -- 'one_hour' | 'expired'
    UNIQUE (content_id, region, kind)
);

CREATE TABLE IF NOT EXISTS server_offsets (
    region       TEXT PRIMARY KEY,
    offset_hours INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS admins (
    user_id INTEGER PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS content_section_idx ON content(section);

PRAGMA user_version = 1;
";

//! SQL schema for the Raksha SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS emergencies (
    alert_id    TEXT PRIMARY KEY,   -- externally supplied, opaque
    user_id     TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'resolved'
    started_at  TEXT NOT NULL,      -- ISO 8601 UTC
    ended_at    TEXT,
    resolved_by TEXT,
    notes       TEXT,
    CHECK ((status = 'resolved') = (ended_at IS NOT NULL))
);

-- The one-active-per-user invariant, enforced at the storage layer so a
-- concurrent double-trigger cannot slip past the application check.
CREATE UNIQUE INDEX IF NOT EXISTS emergencies_one_active_idx
    ON emergencies(user_id) WHERE status = 'active';

CREATE INDEX IF NOT EXISTS emergencies_user_idx    ON emergencies(user_id);
CREATE INDEX IF NOT EXISTS emergencies_status_idx  ON emergencies(status);
CREATE INDEX IF NOT EXISTS emergencies_started_idx ON emergencies(started_at);

-- Location samples are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS locations (
    sample_id   TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    alert_id    TEXT REFERENCES emergencies(alert_id),
    latitude    REAL NOT NULL,
    longitude   REAL NOT NULL,
    accuracy    REAL,
    captured_at TEXT NOT NULL,      -- ISO 8601 UTC
    update_type TEXT NOT NULL DEFAULT 'manual',  -- 'sos' | 'manual' | 'periodic'
    CHECK (update_type != 'sos' OR alert_id IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS locations_user_idx  ON locations(user_id, captured_at);
CREATE INDEX IF NOT EXISTS locations_alert_idx ON locations(alert_id, captured_at);

PRAGMA user_version = 1;
";

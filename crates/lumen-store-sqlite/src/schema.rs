//! SQL schema for the Lumen SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Cached results are append-only.
-- No UPDATE is ever issued against this table; DELETE only via clear.
CREATE TABLE IF NOT EXISTS cached_results (
    result_id        TEXT PRIMARY KEY,
    subject_key      TEXT NOT NULL,
    result_category  TEXT NOT NULL,   -- ResultCategory::as_str
    source_endpoint  TEXT NOT NULL,
    request_payload  TEXT NOT NULL,   -- JSON
    raw_response     TEXT,            -- JSON or NULL
    processed_result TEXT,            -- JSON or NULL
    state            TEXT NOT NULL,   -- 'pending' | 'completed' | 'failed'
    failure_reason   TEXT,
    attributes       TEXT NOT NULL DEFAULT '{}',
    generated_at     TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    expires_at       TEXT
);

-- Denormalized copies of cached results, one per subject slot.
CREATE TABLE IF NOT EXISTS subject_patches (
    subject_kind     TEXT NOT NULL,   -- 'assessment' | 'module' | 'student'
    subject_key      TEXT NOT NULL,
    result_category  TEXT NOT NULL,
    payload          TEXT NOT NULL,   -- JSON
    cached_result_id TEXT NOT NULL,
    generated_at     TEXT NOT NULL,
    PRIMARY KEY (subject_kind, subject_key, result_category)
);

CREATE INDEX IF NOT EXISTS cached_results_lookup_idx
    ON cached_results(subject_key, result_category, generated_at);
CREATE INDEX IF NOT EXISTS cached_results_state_idx
    ON cached_results(state);

PRAGMA user_version = 1;
";

//! SQL schema for the MedBuddy SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    timezone      TEXT NOT NULL,   -- IANA zone identifier
    created_at    TEXT NOT NULL
);

-- Bearer sessions. Only the SHA-256 digest of a token is kept.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS medications (
    medication_id TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    dose          TEXT,
    active_from   TEXT NOT NULL,   -- YYYY-MM-DD
    active_until  TEXT,            -- YYYY-MM-DD or NULL (open-ended)
    quantity      INTEGER,
    created_at    TEXT NOT NULL,
    CHECK (active_until IS NULL OR active_until >= active_from)
);

-- Fixed daily dose times; replaced wholesale on edit.
CREATE TABLE IF NOT EXISTS schedule_times (
    medication_id TEXT NOT NULL REFERENCES medications(medication_id) ON DELETE CASCADE,
    time          TEXT NOT NULL,   -- HH:MM, 24-hour
    PRIMARY KEY (medication_id, time)
);

-- The adherence ledger. (medication_id, scheduled_for) is the natural key;
-- the UNIQUE constraint is what keeps concurrent takes from duplicating.
CREATE TABLE IF NOT EXISTS taken_records (
    taken_id      TEXT PRIMARY KEY,
    medication_id TEXT NOT NULL REFERENCES medications(medication_id) ON DELETE CASCADE,
    scheduled_for TEXT NOT NULL,   -- RFC 3339 UTC, whole minutes
    taken_at      TEXT,            -- RFC 3339 UTC or NULL
    UNIQUE (medication_id, scheduled_for)
);

CREATE TABLE IF NOT EXISTS vitals (
    vitals_id   TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    systolic    INTEGER,
    diastolic   INTEGER,
    heart_rate  INTEGER,
    temperature REAL,
    record_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS medications_user_idx   ON medications(user_id);
CREATE INDEX IF NOT EXISTS taken_scheduled_idx    ON taken_records(scheduled_for);
CREATE INDEX IF NOT EXISTS vitals_user_time_idx   ON vitals(user_id, record_time);
CREATE INDEX IF NOT EXISTS sessions_user_idx      ON sessions(user_id);

PRAGMA user_version = 1;
";

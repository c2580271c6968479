//! Database schema

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    identity TEXT PRIMARY KEY,
    state TEXT NOT NULL DEFAULT 'START',
    data TEXT NOT NULL,
    started_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_state ON sessions(state);
CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at DESC);
";

/// Insert or replace a full session row
pub const UPSERT_SESSION: &str = "
INSERT INTO sessions (identity, state, data, started_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(identity) DO UPDATE SET
    state = excluded.state,
    data = excluded.data,
    updated_at = excluded.updated_at
";

pub const SELECT_SESSION: &str = "SELECT data FROM sessions WHERE identity = ?1";

pub const SELECT_ALL_SESSIONS: &str = "SELECT identity, data FROM sessions ORDER BY identity";

pub const DELETE_SESSION: &str = "DELETE FROM sessions WHERE identity = ?1";

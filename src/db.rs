//! SQLite-backed session persistence
//!
//! Each guest is one row; the full session is stored as JSON alongside a
//! plain `state` column for quick inspection.

mod schema;

use schema::{DELETE_SESSION, SCHEMA, SELECT_ALL_SESSIONS, SELECT_SESSION, UPSERT_SESSION};

use crate::session::{apply_mutation, Mutator, Session, SessionStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe database handle
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn decode(identity: &str, data: &str) -> Result<Session, StoreError> {
    serde_json::from_str(data).map_err(|source| StoreError::Corrupt {
        identity: identity.to_string(),
        source,
    })
}

/// Load one session. An undecodable row is replaced by a fresh START session.
fn load(conn: &Connection, identity: &str) -> Result<Option<Session>, StoreError> {
    let data: Option<String> = conn
        .query_row(SELECT_SESSION, params![identity], |row| row.get(0))
        .optional()?;
    let Some(data) = data else {
        return Ok(None);
    };

    match decode(identity, &data) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            tracing::warn!(identity = %identity, error = %e, "Resetting undecodable session");
            let session = Session::new(identity, Utc::now());
            save(conn, &session)?;
            Ok(Some(session))
        }
    }
}

fn save(conn: &Connection, session: &Session) -> Result<(), StoreError> {
    let data = serde_json::to_string(session).map_err(|source| StoreError::Corrupt {
        identity: session.identity.clone(),
        source,
    })?;
    conn.execute(
        UPSERT_SESSION,
        params![
            session.identity,
            session.state.as_str(),
            data,
            session.timestamps.started_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_or_create(&self, identity: &str) -> Result<Session, StoreError> {
        let conn = self.lock()?;
        if let Some(session) = load(&conn, identity)? {
            return Ok(session);
        }

        let session = Session::new(identity, Utc::now());
        save(&conn, &session)?;
        tracing::info!(identity = %identity, "Created new session");
        Ok(session)
    }

    async fn get(&self, identity: &str) -> Result<Option<Session>, StoreError> {
        let conn = self.lock()?;
        load(&conn, identity)
    }

    async fn update(&self, identity: &str, mutate: &mut Mutator<'_>) -> Result<Session, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut session =
            load(&tx, identity)?.ok_or_else(|| StoreError::NotFound(identity.to_string()))?;
        apply_mutation(&mut session, mutate);
        save(&tx, &session)?;

        tx.commit()?;
        Ok(session)
    }

    async fn list_all(&self) -> Result<Vec<Session>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(SELECT_ALL_SESSIONS)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        // Corrupt rows are skipped here and healed on the guest's next message
        Ok(rows
            .iter()
            .filter_map(|(identity, data)| match decode(identity, data) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!(identity = %identity, error = %e, "Skipping undecodable session");
                    None
                }
            })
            .collect())
    }

    async fn reset(&self, identity: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(DELETE_SESSION, params![identity])?;
        Ok(removed > 0)
    }
}

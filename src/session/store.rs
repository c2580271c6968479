//! Session storage abstraction
//!
//! Every mutation goes through [`SessionStore::update`], which runs the
//! mutator while holding that session's slot exclusively. Two inbound
//! messages from the same guest therefore never interleave their
//! read-transition-write steps.

use super::Session;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

/// Whether a mutation counts as guest activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Refreshes `last_activity_at`
    Active,
    /// Bookkeeping only (reminder counters, bot log entries)
    Quiet,
}

/// Mutation applied under the session's exclusive slot
pub type Mutator<'a> = dyn FnMut(&mut Session) -> Activity + Send + 'a;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session store lock poisoned")]
    Poisoned,
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Corrupt session record for {identity}: {source}")]
    Corrupt {
        identity: String,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session, creating a fresh one at START if absent
    async fn get_or_create(&self, identity: &str) -> Result<Session, StoreError>;

    async fn get(&self, identity: &str) -> Result<Option<Session>, StoreError>;

    /// Run `mutate` with exclusive access and return the stored result.
    ///
    /// Fails with [`StoreError::NotFound`] if the session was reset before the
    /// slot was acquired.
    async fn update(&self, identity: &str, mutate: &mut Mutator<'_>) -> Result<Session, StoreError>;

    async fn list_all(&self) -> Result<Vec<Session>, StoreError>;

    /// Drop the session. Returns whether one existed.
    async fn reset(&self, identity: &str) -> Result<bool, StoreError>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get_or_create(&self, identity: &str) -> Result<Session, StoreError> {
        (**self).get_or_create(identity).await
    }

    async fn get(&self, identity: &str) -> Result<Option<Session>, StoreError> {
        (**self).get(identity).await
    }

    async fn update(&self, identity: &str, mutate: &mut Mutator<'_>) -> Result<Session, StoreError> {
        (**self).update(identity, mutate).await
    }

    async fn list_all(&self) -> Result<Vec<Session>, StoreError> {
        (**self).list_all().await
    }

    async fn reset(&self, identity: &str) -> Result<bool, StoreError> {
        (**self).reset(identity).await
    }
}

/// Apply a mutator and stamp activity. Shared by every store.
pub(crate) fn apply_mutation(session: &mut Session, mutate: &mut Mutator<'_>) {
    if mutate(session) == Activity::Active {
        session.timestamps.last_activity_at = Utc::now();
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Sessions held in process memory; lost on restart
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, identity: &str) -> Result<Option<Arc<Mutex<Session>>>, StoreError> {
        let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.get(identity).cloned())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create(&self, identity: &str) -> Result<Session, StoreError> {
        if let Some(slot) = self.slot(identity)? {
            let session = slot.lock().map_err(|_| StoreError::Poisoned)?;
            return Ok(session.clone());
        }

        let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        let slot = sessions.entry(identity.to_string()).or_insert_with(|| {
            tracing::info!(identity = %identity, "Created new session");
            Arc::new(Mutex::new(Session::new(identity, Utc::now())))
        });
        let session = slot.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(session.clone())
    }

    async fn get(&self, identity: &str) -> Result<Option<Session>, StoreError> {
        match self.slot(identity)? {
            Some(slot) => {
                let session = slot.lock().map_err(|_| StoreError::Poisoned)?;
                Ok(Some(session.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, identity: &str, mutate: &mut Mutator<'_>) -> Result<Session, StoreError> {
        // Holding the map read lock keeps a concurrent reset out until the
        // mutation lands
        let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        let slot = sessions
            .get(identity)
            .ok_or_else(|| StoreError::NotFound(identity.to_string()))?;
        let mut session = slot.lock().map_err(|_| StoreError::Poisoned)?;
        apply_mutation(&mut session, mutate);
        Ok(session.clone())
    }

    async fn list_all(&self) -> Result<Vec<Session>, StoreError> {
        let slots: Vec<Arc<Mutex<Session>>> = {
            let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
            sessions.values().cloned().collect()
        };

        let mut all = slots
            .iter()
            .map(|slot| {
                slot.lock()
                    .map(|s| s.clone())
                    .map_err(|_| StoreError::Poisoned)
            })
            .collect::<Result<Vec<_>, _>>()?;
        all.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(all)
    }

    async fn reset(&self, identity: &str) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.remove(identity).is_some())
    }
}

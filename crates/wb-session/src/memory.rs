// memory.rs — In-process SessionStore for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::SessionError;
use crate::session::Session;
use crate::store::{active_conflict, stale_conflict, SessionStore};

/// Sessions held in a map keyed by session id. Counts writes so tests can
/// assert how many times a lifecycle call touched storage.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    writes: RwLock<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `create` + `save` calls.
    pub fn write_count(&self) -> usize {
        self.writes.read().map(|w| *w).unwrap_or(0)
    }

    fn record_write(&self) -> Result<(), SessionError> {
        let mut writes = self
            .writes
            .write()
            .map_err(|_| SessionError::LockPoisoned("memory store".to_string()))?;
        *writes += 1;
        Ok(())
    }
}

impl SessionStore for MemorySessionStore {
    fn find_active(&self, truck_id: &str) -> Result<Option<Session>, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned("memory store".to_string()))?;
        Ok(sessions
            .values()
            .find(|s| s.truck_id == truck_id && s.is_active())
            .cloned())
    }

    fn find_all(&self) -> Result<Vec<Session>, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned("memory store".to_string()))?;
        let mut all: Vec<Session> = sessions.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }

    fn create(&self, session: Session) -> Result<Session, SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned("memory store".to_string()))?;
        if sessions
            .values()
            .any(|s| s.truck_id == session.truck_id && s.is_active())
        {
            return Err(active_conflict(&session.truck_id));
        }
        sessions.insert(session.session_id, session.clone());
        drop(sessions);
        self.record_write()?;
        Ok(session)
    }

    fn save(&self, mut session: Session) -> Result<Session, SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned("memory store".to_string()))?;
        let stored = sessions
            .get(&session.session_id)
            .ok_or_else(|| SessionError::NotFound {
                truck_id: session.truck_id.clone(),
            })?;
        if stored.version != session.version {
            return Err(stale_conflict(&session, stored.version));
        }
        session.version += 1;
        sessions.insert(session.session_id, session.clone());
        drop(sessions);
        self.record_write()?;
        Ok(session)
    }

    fn discard(&self, session: &Session) -> Result<(), SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned("memory store".to_string()))?;
        match sessions.get(&session.session_id) {
            None => Err(SessionError::NotFound {
                truck_id: session.truck_id.clone(),
            }),
            Some(stored) if stored.version != session.version => {
                Err(stale_conflict(session, stored.version))
            }
            Some(_) => {
                sessions.remove(&session.session_id);
                Ok(())
            }
        }
    }
}

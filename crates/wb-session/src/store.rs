// store.rs — SessionStore contract and its JSON file implementation.
//
// Each session is stored as `<sessions_dir>/<session_id>.json`. A truck that
// visits several times leaves several files behind; at most one of them is
// active (state != EXITED).
//
// `save` is a compare-and-swap on `version`: the caller passes the session
// as it was loaded plus its changes, and the write is refused if the file on
// disk has moved on since.
//
// The daemon and the CLI may open the same directory at once, so every
// check-then-write runs under an exclusive OS lock on `<sessions_dir>/.lock`.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use uuid::Uuid;

use crate::error::SessionError;
use crate::session::Session;

const LOCK_FILE: &str = ".lock";

/// Durable keyed storage for truck sessions.
pub trait SessionStore: Send + Sync {
    /// The non-EXITED session for a truck, if any.
    fn find_active(&self, truck_id: &str) -> Result<Option<Session>, SessionError>;

    /// Every session, most recently updated first.
    fn find_all(&self) -> Result<Vec<Session>, SessionError>;

    /// Insert a new session. Fails with `Conflict` if the truck already has
    /// an active one.
    fn create(&self, session: Session) -> Result<Session, SessionError>;

    /// Persist changes to an existing session. Fails with `Conflict` if the
    /// stored version differs from `session.version`. Returns the stored
    /// record with its version bumped.
    fn save(&self, session: Session) -> Result<Session, SessionError>;

    /// Remove a session that was just created, if it is still at
    /// `session.version`. Used to undo a `create` whose audit record could
    /// not be written.
    fn discard(&self, session: &Session) -> Result<(), SessionError>;
}

/// Persistent store backed by one JSON file per session.
pub struct JsonFileSessionStore {
    sessions_dir: PathBuf,
}

/// Exclusive lock on the sessions directory, released on drop.
struct DirLock {
    file: File,
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, "failed to release session store lock");
        }
    }
}

impl JsonFileSessionStore {
    /// Create a store backed by the given directory, creating it if needed.
    pub fn new(sessions_dir: impl AsRef<Path>) -> Result<Self, SessionError> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir).map_err(|source| io_error(&sessions_dir, source))?;
        Ok(Self { sessions_dir })
    }

    /// Load one session by id.
    pub fn get(&self, session_id: Uuid) -> Result<Option<Session>, SessionError> {
        let path = self.session_file(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn lock(&self) -> Result<DirLock, SessionError> {
        let path = self.sessions_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| io_error(&path, source))?;
        FileExt::lock_exclusive(&file).map_err(|source| io_error(&path, source))?;
        Ok(DirLock { file })
    }

    /// Every session on disk. A `.json` file that does not parse is an
    /// error: skipping it could hide an active or locked session.
    fn load_all(&self) -> Result<Vec<Session>, SessionError> {
        let mut sessions = Vec::new();

        let entries =
            fs::read_dir(&self.sessions_dir).map_err(|source| io_error(&self.sessions_dir, source))?;

        for entry in entries {
            let entry = entry.map_err(|source| io_error(&self.sessions_dir, source))?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                let json = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
                let session = serde_json::from_str::<Session>(&json).inspect_err(|e| {
                    tracing::error!(path = %path.display(), error = %e, "unreadable session file")
                })?;
                sessions.push(session);
            }
        }

        Ok(sessions)
    }

    /// Write via a synced temp file and rename so readers never see a
    /// partial record and the rename survives a crash.
    fn write(&self, session: &Session) -> Result<(), SessionError> {
        let path = self.session_file(session.session_id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(session)?;

        let mut file = File::create(&tmp).map_err(|source| io_error(&tmp, source))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|source| io_error(&tmp, source))?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|source| io_error(&path, source))?;
        self.sync_dir()?;

        tracing::debug!(
            truck_id = %session.truck_id,
            session_id = %session.session_id,
            version = session.version,
            "session written"
        );
        Ok(())
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> Result<(), SessionError> {
        File::open(&self.sessions_dir)
            .and_then(|dir| dir.sync_all())
            .map_err(|source| io_error(&self.sessions_dir, source))
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> Result<(), SessionError> {
        Ok(())
    }

    fn session_file(&self, session_id: Uuid) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", session_id))
    }

    /// The stored copy of `session`, checked against its version.
    fn current(&self, session: &Session) -> Result<Session, SessionError> {
        let stored = self
            .get(session.session_id)?
            .ok_or_else(|| SessionError::NotFound {
                truck_id: session.truck_id.clone(),
            })?;
        if stored.version != session.version {
            return Err(stale_conflict(session, stored.version));
        }
        Ok(stored)
    }
}

impl SessionStore for JsonFileSessionStore {
    fn find_active(&self, truck_id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|s| s.truck_id == truck_id && s.is_active())
            .max_by_key(|s| s.updated_at))
    }

    fn find_all(&self) -> Result<Vec<Session>, SessionError> {
        let mut sessions = self.load_all()?;
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    fn create(&self, session: Session) -> Result<Session, SessionError> {
        let _lock = self.lock()?;

        if self.find_active(&session.truck_id)?.is_some() {
            return Err(active_conflict(&session.truck_id));
        }
        self.write(&session)?;
        Ok(session)
    }

    fn save(&self, mut session: Session) -> Result<Session, SessionError> {
        let _lock = self.lock()?;

        self.current(&session)?;
        session.version += 1;
        self.write(&session)?;
        Ok(session)
    }

    fn discard(&self, session: &Session) -> Result<(), SessionError> {
        let _lock = self.lock()?;

        self.current(session)?;
        let path = self.session_file(session.session_id);
        fs::remove_file(&path).map_err(|source| io_error(&path, source))?;
        self.sync_dir()?;
        tracing::debug!(
            truck_id = %session.truck_id,
            session_id = %session.session_id,
            "session discarded"
        );
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SessionError {
    SessionError::IoError {
        path: path.display().to_string(),
        source,
    }
}

pub(crate) fn active_conflict(truck_id: &str) -> SessionError {
    SessionError::Conflict(format!(
        "Truck '{}' already has an active session",
        truck_id
    ))
}

pub(crate) fn stale_conflict(session: &Session, stored_version: u64) -> SessionError {
    SessionError::Conflict(format!(
        "session for truck '{}' was modified concurrently (expected version {}, found {})",
        session.truck_id, session.version, stored_version
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionState;
    use tempfile::tempdir;
    use wb_policy::Action;

    #[test]
    fn create_and_find_active_round_trip() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("sessions")).unwrap();

        let created = store.create(Session::new("T1")).unwrap();
        let found = store.find_active("T1").unwrap().unwrap();
        assert_eq!(found.session_id, created.session_id);
        assert_eq!(found.state, SessionState::Entry);
        assert!(store.find_active("T2").unwrap().is_none());
    }

    #[test]
    fn create_refuses_second_active_session() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();

        store.create(Session::new("T1")).unwrap();
        let result = store.create(Session::new("T1"));
        assert!(matches!(result, Err(SessionError::Conflict(_))));
    }

    #[test]
    fn exited_session_is_not_active() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();

        let mut s = store.create(Session::new("T1")).unwrap();
        s.advance(Action::Exit);
        store.save(s).unwrap();

        assert!(store.find_active("T1").unwrap().is_none());
        // A fresh visit can start once the old one is closed.
        store.create(Session::new("T1")).unwrap();
        assert_eq!(store.find_all().unwrap().len(), 2);
    }

    #[test]
    fn save_bumps_version_and_persists() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();

        let mut s = store.create(Session::new("T1")).unwrap();
        s.tare_weight = Some(12000.0);
        s.advance(Action::Tare);
        let saved = store.save(s).unwrap();
        assert_eq!(saved.version, 1);

        let reloaded = store.get(saved.session_id).unwrap().unwrap();
        assert_eq!(reloaded.state, SessionState::TareDone);
        assert_eq!(reloaded.tare_weight, Some(12000.0));
        assert_eq!(reloaded.version, 1);
    }

    #[test]
    fn save_with_stale_version_conflicts() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();

        let base = store.create(Session::new("T1")).unwrap();
        let mut first = base.clone();
        let mut second = base;

        first.advance(Action::Tare);
        store.save(first).unwrap();

        second.advance(Action::Tare);
        let result = store.save(second);
        assert!(matches!(result, Err(SessionError::Conflict(_))));
    }

    #[test]
    fn find_all_is_most_recently_updated_first() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();

        store.create(Session::new("T1")).unwrap();
        store.create(Session::new("T2")).unwrap();
        let mut t1 = store.find_active("T1").unwrap().unwrap();
        t1.advance(Action::Tare);
        store.save(t1).unwrap();

        let all = store.find_all().unwrap();
        assert_eq!(all[0].truck_id, "T1");
        assert_eq!(all[1].truck_id, "T2");
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions");

        {
            let store = JsonFileSessionStore::new(&path).unwrap();
            store.create(Session::new("Persistent")).unwrap();
        }
        {
            let store = JsonFileSessionStore::new(&path).unwrap();
            assert!(store.find_active("Persistent").unwrap().is_some());
        }
    }

    #[test]
    fn corrupt_session_file_is_an_error_not_a_gap() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();

        let s = store.create(Session::new("T1")).unwrap();
        fs::write(store.session_file(s.session_id), "{ not json").unwrap();

        assert!(matches!(
            store.find_active("T1"),
            Err(SessionError::SerializationError(_))
        ));
        assert!(matches!(
            store.create(Session::new("T1")),
            Err(SessionError::SerializationError(_))
        ));
    }

    #[test]
    fn lock_and_temp_files_are_not_sessions() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();

        store.create(Session::new("T1")).unwrap();
        fs::write(dir.path().join("stray.json.tmp"), "partial").unwrap();

        assert!(dir.path().join(LOCK_FILE).exists());
        assert_eq!(store.find_all().unwrap().len(), 1);
    }

    #[test]
    fn discard_removes_the_file_at_its_current_version() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path()).unwrap();

        let created = store.create(Session::new("T1")).unwrap();
        let saved = store.save(created.clone()).unwrap();

        assert!(matches!(
            store.discard(&created),
            Err(SessionError::Conflict(_))
        ));
        store.discard(&saved).unwrap();
        assert!(store.get(saved.session_id).unwrap().is_none());
    }

    #[test]
    fn two_handles_on_one_directory_allow_one_active_session() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let dir = tempdir().unwrap();
        let stores = [
            Arc::new(JsonFileSessionStore::new(dir.path()).unwrap()),
            Arc::new(JsonFileSessionStore::new(dir.path()).unwrap()),
        ];
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = stores[i % 2].clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store.create(Session::new("T1")).is_ok()
                })
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(created, 1);
        assert_eq!(stores[0].find_all().unwrap().len(), 1);
    }
}

// log.rs — The audit log contract and its JSONL file implementation.
//
// The file log stores one JSON object per line. Each line carries the
// SHA-256 of the line before it in `previousHash`, so inserting, deleting,
// or editing a line breaks the chain and `verify_chain` reports where.
//
// Several processes may append to the same file (the daemon and the CLI).
// Each append takes an exclusive OS lock on the log, picks up the chain tip
// from disk if another writer has grown the file, writes one line, and syncs
// before returning: callers acknowledge a request only after its audit
// record is durable.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use sha2::{Digest, Sha256};

use crate::error::AuditError;
use crate::event::{AuditEvent, EventType};

/// Append-only storage for truck audit events.
///
/// Implementations assign the event id and timestamp. `append` must not
/// return until the event is durable.
pub trait EventAuditLog: Send + Sync {
    /// Record what happened to a truck.
    fn append(
        &self,
        truck_id: &str,
        event_type: EventType,
        message: &str,
    ) -> Result<AuditEvent, AuditError>;

    /// All events for one truck, newest first.
    fn events_for(&self, truck_id: &str) -> Result<Vec<AuditEvent>, AuditError>;
}

/// Last known end of the chain. Valid while the file is still `len` bytes.
struct ChainTip {
    len: u64,
    last_hash: Option<String>,
}

/// An append-only audit log backed by a hash-chained JSONL file.
pub struct JsonlAuditLog {
    path: PathBuf,
    file: File,
    tip: Mutex<ChainTip>,
}

impl JsonlAuditLog {
    /// Open (or create) an audit log at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        // Length 0 never matches a non-empty file, so the first append
        // rescans whatever is on disk by then.
        Ok(Self {
            path,
            file,
            tip: Mutex::new(ChainTip {
                len: 0,
                last_hash: None,
            }),
        })
    }

    /// Read all events from a log file, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>, AuditError> {
        let file = Self::open_shared(path.as_ref())?;
        let mut events = Vec::new();

        for line in BufReader::new(&file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Verify a log file's hash chain.
    ///
    /// Returns `Ok(n)` with the number of events checked, or
    /// `IntegrityViolation` naming the first line whose link does not match.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let file = Self::open_shared(path.as_ref())?;
        let mut previous_hash: Option<String> = None;
        let mut checked = 0;

        for (line_num, line) in BufReader::new(&file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let event: AuditEvent = serde_json::from_str(&line)?;
            if event.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: event.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }

            // Hash the raw line; re-serializing could reorder fields.
            previous_hash = Some(line_hash(&line));
            checked += 1;
        }

        Ok(checked)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open for reading under a shared lock, so no append is half visible.
    /// The lock is released when the file is dropped.
    fn open_shared(path: &Path) -> Result<File, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        FileExt::lock_shared(&file)?;
        Ok(file)
    }

    /// Hash of the last non-blank line. Caller holds the exclusive lock.
    fn read_last_hash(&self) -> Result<Option<String>, AuditError> {
        let file = File::open(&self.path).map_err(|source| AuditError::OpenFailed {
            path: self.path.clone(),
            source,
        })?;
        let mut last_line: Option<String> = None;

        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                last_line = Some(line);
            }
        }

        Ok(last_line.map(|line| line_hash(&line)))
    }

    fn append_locked(
        &self,
        tip: &mut ChainTip,
        truck_id: &str,
        event_type: EventType,
        message: &str,
    ) -> Result<AuditEvent, AuditError> {
        let len = self.file.metadata()?.len();
        if len != tip.len {
            tip.last_hash = self.read_last_hash()?;
            tip.len = len;
        }

        let mut event = AuditEvent::new(truck_id, event_type, message);
        event.previous_hash = tip.last_hash.clone();

        let json = serde_json::to_string(&event)?;
        let line = format!("{}\n", json);
        (&self.file).write_all(line.as_bytes())?;
        self.file.sync_data()?;

        // Only advance the chain once the line is on disk.
        tip.len = len + line.len() as u64;
        tip.last_hash = Some(line_hash(&json));
        Ok(event)
    }
}

impl EventAuditLog for JsonlAuditLog {
    fn append(
        &self,
        truck_id: &str,
        event_type: EventType,
        message: &str,
    ) -> Result<AuditEvent, AuditError> {
        let mut tip = self.tip.lock().map_err(|_| AuditError::LockPoisoned)?;

        FileExt::lock_exclusive(&self.file)?;
        let result = self.append_locked(&mut tip, truck_id, event_type, message);
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release audit log lock");
        }

        let event = result?;
        tracing::debug!(
            truck_id = %event.truck_id,
            event_type = %event.event_type,
            "audit event appended"
        );
        Ok(event)
    }

    fn events_for(&self, truck_id: &str) -> Result<Vec<AuditEvent>, AuditError> {
        let mut events: Vec<AuditEvent> = Self::read_all(&self.path)?
            .into_iter()
            .filter(|e| e.truck_id == truck_id)
            .collect();
        events.reverse();
        Ok(events)
    }
}

/// Lowercase hex SHA-256 of one log line.
fn line_hash(line: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(line.as_bytes());
    format!("{:x}", hasher.finalize())
}

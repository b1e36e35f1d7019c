// error.rs — Error types for the audit subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while appending to or reading the audit trail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the audit log file.
    #[error("failed to open audit log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an event to the log.
    #[error("failed to append event: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Failed to serialize or deserialize an event (malformed JSON).
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The hash chain is broken; the log was edited after it was written.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },

    /// A writer panicked while holding the log lock.
    #[error("audit log lock poisoned")]
    LockPoisoned,
}

// error.rs — Error types for the session lifecycle.
//
// The first five variants are outcomes a caller is expected to handle and
// show to a user. The rest are infrastructure failures.

use thiserror::Error;
use wb_audit::AuditError;
use wb_policy::Action;

use crate::session::Session;

/// Errors returned by session lifecycle and store operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed truck id or weight. Nothing was written or audited.
    #[error("{0}")]
    InvalidArgument(String),

    /// No active session exists for the truck.
    #[error("No active session found for truck '{truck_id}'")]
    NotFound { truck_id: String },

    /// An active session already exists, or the stored record changed
    /// between load and save.
    #[error("{0}")]
    Conflict(String),

    /// The transition policy rejected the action. A REJECTED event was
    /// appended.
    #[error("{reason}")]
    PolicyDenied { action: Action, reason: String },

    /// Dock access attempted after invoicing. A VIOLATION event was appended;
    /// `session` is the unmodified session at the time of the attempt.
    #[error("{reason}")]
    MovementViolation {
        reason: String,
        session: Box<Session>,
    },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize session data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The audit log could not record an event.
    #[error("audit log error: {0}")]
    Audit(#[from] AuditError),

    /// A thread panicked while holding a lock.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl SessionError {
    /// True for outcomes caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidArgument(_)
                | SessionError::NotFound { .. }
                | SessionError::Conflict(_)
                | SessionError::PolicyDenied { .. }
                | SessionError::MovementViolation { .. }
        )
    }
}

//! # wb-audit
//!
//! Append-only audit trail for the Weighbridge session core.
//!
//! Every accepted transition, rejected attempt, and movement violation on a
//! truck session is recorded as an [`AuditEvent`]. Events are never mutated
//! or deleted once written. The file-backed [`JsonlAuditLog`] links each line
//! to the SHA-256 hash of the previous one so tampering can be detected with
//! [`JsonlAuditLog::verify_chain`].
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use wb_audit::{EventAuditLog, EventType, JsonlAuditLog};
//!
//! let log = JsonlAuditLog::open("/tmp/audit.jsonl").unwrap();
//! log.append("T1", EventType::SessionStart, "Session started for truck T1")
//!     .unwrap();
//! let recent = log.events_for("T1").unwrap();
//! assert_eq!(recent[0].event_type, EventType::SessionStart);
//! ```

pub mod error;
pub mod event;
pub mod log;
pub mod memory;

pub use error::AuditError;
pub use event::{AuditEvent, EventType};
pub use log::{EventAuditLog, JsonlAuditLog};
pub use memory::MemoryAuditLog;

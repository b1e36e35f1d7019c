// guard.rs — DockGuard: post-invoice movement lock enforcement.
//
// Runs before the transition policy on every dock request. Once a session is
// invoiced the policy table would also refuse a dock request, but only as an
// ordinary out-of-order REJECTED. The guard turns that case into a VIOLATION
// so the audit trail and the caller can tell "wrong order" apart from
// "tried to move a locked truck".

use std::sync::Arc;

use wb_audit::{EventAuditLog, EventType};
use wb_policy::InvoiceStatus;

use crate::error::SessionError;
use crate::session::Session;

/// Fixed denial reason for dock access after invoicing.
pub const MOVEMENT_RESTRICTED: &str =
    "movement restricted: invoice already generated; dock re-entry not permitted";

/// Outcome of a dock guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockCheck {
    Allowed,
    Denied { reason: String },
}

/// Dock-specific enforcement layer.
pub struct DockGuard {
    audit: Arc<dyn EventAuditLog>,
}

impl DockGuard {
    pub fn new(audit: Arc<dyn EventAuditLog>) -> Self {
        Self { audit }
    }

    /// Whether the session is past the point of no return.
    pub fn is_locked(session: &Session) -> bool {
        session.invoice_status == InvoiceStatus::Generated || session.movement_lock
    }

    /// Check a dock request. On denial a VIOLATION event is appended before
    /// returning; on approval nothing happens.
    pub fn check(&self, session: &Session) -> Result<DockCheck, SessionError> {
        if !Self::is_locked(session) {
            return Ok(DockCheck::Allowed);
        }

        self.audit
            .append(&session.truck_id, EventType::Violation, MOVEMENT_RESTRICTED)?;
        tracing::warn!(
            truck_id = %session.truck_id,
            state = %session.state,
            "dock re-entry blocked by movement lock"
        );
        Ok(DockCheck::Denied {
            reason: MOVEMENT_RESTRICTED.to_string(),
        })
    }
}

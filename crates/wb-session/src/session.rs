// session.rs — Session: one truck's pass through the facility.
//
// The session moves forward along
//   ENTRY → TARE_DONE → (DOCK → GROSS_DONE)* → INVOICE_GENERATED → EXITED
// and is kept after EXITED for history. Fields are public for reading and
// serialization; only the lifecycle in this crate mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wb_policy::{Action, InvoiceStatus, SessionState, TransitionPolicy};

use crate::error::SessionError;

/// A truck session.
///
/// Serializes with camelCase keys to match the HTTP wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Storage key. A truck accumulates one session per visit.
    pub session_id: Uuid,

    /// Trimmed, non-empty truck identifier.
    pub truck_id: String,

    pub state: SessionState,

    /// Empty weight in kg, recorded at ENTRY → TARE_DONE.
    pub tare_weight: Option<f64>,

    /// Loaded weight in kg, recorded at DOCK → GROSS_DONE.
    pub gross_weight: Option<f64>,

    pub invoice_status: InvoiceStatus,

    /// Set with the invoice and never cleared. Blocks further dock access.
    pub movement_lock: bool,

    /// Accepted dock entries so far.
    pub visit_count: u32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Write counter for optimistic concurrency; bumped by every store save.
    #[serde(default)]
    pub version: u64,
}

impl Session {
    /// Create a session in ENTRY for an already-validated truck id.
    pub(crate) fn new(truck_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            truck_id: truck_id.into(),
            state: SessionState::Entry,
            tare_weight: None,
            gross_weight: None,
            invoice_status: InvoiceStatus::None,
            movement_lock: false,
            visit_count: 0,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// True until the session reaches EXITED.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Gross minus tare, once both weights are known.
    pub fn net_weight(&self) -> Option<f64> {
        match (self.gross_weight, self.tare_weight) {
            (Some(gross), Some(tare)) => Some(gross - tare),
            _ => None,
        }
    }

    /// Apply an accepted action: move to its target state and run its
    /// side effects. The caller must already hold a policy `Allow`.
    pub(crate) fn advance(&mut self, action: Action) {
        self.state = TransitionPolicy::target_state(action);
        match action {
            Action::Dock => self.visit_count = self.visit_count.saturating_add(1),
            Action::Invoice => {
                self.invoice_status = InvoiceStatus::Generated;
                self.movement_lock = true;
            }
            Action::Tare | Action::Gross | Action::Exit => {}
        }
        self.updated_at = Utc::now();
    }
}

/// Trim a truck id and reject it if nothing is left.
pub(crate) fn normalize_truck_id(truck_id: &str) -> Result<&str, SessionError> {
    let trimmed = truck_id.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidArgument(
            "truckId is required".to_string(),
        ));
    }
    Ok(trimmed)
}

/// A weight must be a finite number above zero.
pub(crate) fn validate_weight(kind: &str, weight: f64) -> Result<f64, SessionError> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(SessionError::InvalidArgument(format!(
            "Valid {} weight is required (positive number)",
            kind
        )));
    }
    Ok(weight)
}

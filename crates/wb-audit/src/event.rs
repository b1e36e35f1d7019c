// event.rs — Audit event data model.
//
// One AuditEvent per accepted transition, rejected attempt, or movement
// violation. Field names and event type tokens match the wire format the
// HTTP layer exposes (`truckId`, `"DOCK_ENTRY"`, ...).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to the truck.
///
/// The six lifecycle variants report accepted transitions. `Rejected` is an
/// out-of-order request; `Violation` is a dock request after invoicing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    SessionStart,
    TareRecorded,
    DockEntry,
    GrossRecorded,
    InvoiceGenerated,
    SessionExit,
    Rejected,
    Violation,
}

impl EventType {
    /// The wire token for this event type (e.g. `"GROSS_RECORDED"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SessionStart => "SESSION_START",
            EventType::TareRecorded => "TARE_RECORDED",
            EventType::DockEntry => "DOCK_ENTRY",
            EventType::GrossRecorded => "GROSS_RECORDED",
            EventType::InvoiceGenerated => "INVOICE_GENERATED",
            EventType::SessionExit => "SESSION_EXIT",
            EventType::Rejected => "REJECTED",
            EventType::Violation => "VIOLATION",
        }
    }

    /// True for events that report a denied action rather than a transition.
    pub fn is_denial(&self) -> bool {
        matches!(self, EventType::Rejected | EventType::Violation)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit record: one line in the JSONL audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Identifier assigned by the log when the event is appended.
    pub event_id: Uuid,

    /// The truck this event belongs to.
    pub truck_id: String,

    pub event_type: EventType,

    /// Human-readable detail, including recorded weights where relevant.
    pub message: String,

    /// When the event was appended (UTC).
    pub timestamp: DateTime<Utc>,

    /// Hash of the previous line in the file log. `None` for the first event
    /// and for logs that do not chain (in-memory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
}

impl AuditEvent {
    /// Create a new event stamped with the current time and a fresh id.
    pub fn new(
        truck_id: impl Into<String>,
        event_type: EventType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            truck_id: truck_id.into(),
            event_type,
            message: message.into(),
            timestamp: Utc::now(),
            previous_hash: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_serializes_as_wire_token() {
        let json = serde_json::to_string(&EventType::InvoiceGenerated).unwrap();
        assert_eq!(json, "\"INVOICE_GENERATED\"");
        let restored: EventType = serde_json::from_str("\"VIOLATION\"").unwrap();
        assert_eq!(restored, EventType::Violation);
    }

    #[test]
    fn display_matches_serde_token() {
        for ty in [
            EventType::SessionStart,
            EventType::TareRecorded,
            EventType::DockEntry,
            EventType::GrossRecorded,
            EventType::InvoiceGenerated,
            EventType::SessionExit,
            EventType::Rejected,
            EventType::Violation,
        ] {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty));
        }
    }

    #[test]
    fn event_uses_camel_case_fields() {
        let event = AuditEvent::new("T1", EventType::DockEntry, "Entered loading dock (visit #1)");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["truckId"], "T1");
        assert_eq!(json["eventType"], "DOCK_ENTRY");
        assert!(json.get("previousHash").is_none());
    }

    #[test]
    fn only_rejected_and_violation_are_denials() {
        assert!(EventType::Rejected.is_denial());
        assert!(EventType::Violation.is_denial());
        assert!(!EventType::DockEntry.is_denial());
    }
}

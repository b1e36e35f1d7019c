// memory.rs — In-process audit log for tests and ephemeral runs.

use std::sync::RwLock;

use crate::error::AuditError;
use crate::event::{AuditEvent, EventType};
use crate::log::EventAuditLog;

/// Keeps events in a vector. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryAuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event in append order, oldest first.
    pub fn all(&self) -> Result<Vec<AuditEvent>, AuditError> {
        let events = self.events.read().map_err(|_| AuditError::LockPoisoned)?;
        Ok(events.clone())
    }

    /// Count of events of one type for one truck.
    pub fn count(&self, truck_id: &str, event_type: EventType) -> Result<usize, AuditError> {
        let events = self.events.read().map_err(|_| AuditError::LockPoisoned)?;
        Ok(events
            .iter()
            .filter(|e| e.truck_id == truck_id && e.event_type == event_type)
            .count())
    }
}

impl EventAuditLog for MemoryAuditLog {
    fn append(
        &self,
        truck_id: &str,
        event_type: EventType,
        message: &str,
    ) -> Result<AuditEvent, AuditError> {
        let event = AuditEvent::new(truck_id, event_type, message);
        let mut events = self.events.write().map_err(|_| AuditError::LockPoisoned)?;
        events.push(event.clone());
        Ok(event)
    }

    fn events_for(&self, truck_id: &str) -> Result<Vec<AuditEvent>, AuditError> {
        let events = self.events.read().map_err(|_| AuditError::LockPoisoned)?;
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.truck_id == truck_id)
            .cloned()
            .collect())
    }
}

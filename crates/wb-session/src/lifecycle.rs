// lifecycle.rs — SessionLifecycle: the public operation surface.
//
// Every state-advancing call runs the same sequence under its truck's lock:
//
//   1. Validate the truck id (InvalidArgument, nothing written)
//   2. Load the active session (NotFound)
//   3. Dock only: DockGuard → VIOLATION + MovementViolation
//   4. TransitionPolicy → REJECTED + PolicyDenied
//   5. Validate the weight, if any (InvalidArgument, nothing written)
//   6. Mutate, save, append the success event
//
// An accepted call performs exactly one session write and one audit append.
// A denied call performs one audit append and no write. If the success event
// cannot be appended, the write is undone before the error is returned, so
// the store never holds a state change the trail does not record.

use std::sync::Arc;

use wb_audit::{AuditEvent, EventAuditLog, EventType};
use wb_policy::{Action, PolicyDecision, TransitionPolicy};

use crate::error::SessionError;
use crate::guard::{DockCheck, DockGuard};
use crate::locks::TruckLocks;
use crate::session::{normalize_truck_id, validate_weight, Session};
use crate::store::SessionStore;

/// Orchestrates policy, guard, storage, and audit for truck sessions.
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    audit: Arc<dyn EventAuditLog>,
    guard: DockGuard,
    locks: TruckLocks,
}

impl SessionLifecycle {
    pub fn new(store: Arc<dyn SessionStore>, audit: Arc<dyn EventAuditLog>) -> Self {
        Self {
            guard: DockGuard::new(audit.clone()),
            store,
            audit,
            locks: TruckLocks::new(),
        }
    }

    /// Open a new session in ENTRY for a truck with no active session.
    pub fn start(&self, truck_id: &str) -> Result<Session, SessionError> {
        let truck_id = normalize_truck_id(truck_id)?;
        let lock = self.locks.lock_for(truck_id)?;
        let _held = lock
            .lock()
            .map_err(|_| SessionError::LockPoisoned(truck_id.to_string()))?;

        if self.store.find_active(truck_id)?.is_some() {
            tracing::warn!(truck_id, "start refused: session already active");
            return Err(SessionError::Conflict(format!(
                "Truck '{}' already has an active session",
                truck_id
            )));
        }

        let session = self.store.create(Session::new(truck_id))?;
        if let Err(e) = self.record(
            &session,
            EventType::SessionStart,
            &format!("Session started for truck {}", truck_id),
        ) {
            self.roll_back(truck_id, self.store.discard(&session));
            return Err(e);
        }
        tracing::info!(truck_id, session_id = %session.session_id, "session started");
        Ok(session)
    }

    /// Record the empty weight. Requires ENTRY.
    pub fn record_tare(&self, truck_id: &str, weight: f64) -> Result<Session, SessionError> {
        self.advance(
            truck_id,
            Action::Tare,
            |session| {
                session.tare_weight = Some(validate_weight("tare", weight)?);
                Ok(())
            },
            |session| {
                (
                    EventType::TareRecorded,
                    format!("Tare weight recorded: {} kg", weight_of(session.tare_weight)),
                )
            },
        )
    }

    /// Enter the loading dock. Requires TARE_DONE or GROSS_DONE and no
    /// movement lock.
    pub fn enter_dock(&self, truck_id: &str) -> Result<Session, SessionError> {
        self.advance(
            truck_id,
            Action::Dock,
            |_| Ok(()),
            |session| {
                (
                    EventType::DockEntry,
                    format!("Entered loading dock (visit #{})", session.visit_count),
                )
            },
        )
    }

    /// Record the loaded weight. Requires DOCK.
    pub fn record_gross(&self, truck_id: &str, weight: f64) -> Result<Session, SessionError> {
        self.advance(
            truck_id,
            Action::Gross,
            |session| {
                session.gross_weight = Some(validate_weight("gross", weight)?);
                Ok(())
            },
            |session| {
                (
                    EventType::GrossRecorded,
                    format!(
                        "Gross weight recorded: {} kg (Net: {} kg)",
                        weight_of(session.gross_weight),
                        weight_of(session.net_weight())
                    ),
                )
            },
        )
    }

    /// Issue the invoice and lock movement. Requires GROSS_DONE.
    pub fn generate_invoice(&self, truck_id: &str) -> Result<Session, SessionError> {
        self.advance(
            truck_id,
            Action::Invoice,
            |_| Ok(()),
            |session| {
                (
                    EventType::InvoiceGenerated,
                    format!(
                        "Invoice generated. Net weight: {} kg. Movement locked.",
                        weight_of(session.net_weight())
                    ),
                )
            },
        )
    }

    /// Close the session. Requires INVOICE_GENERATED.
    pub fn exit(&self, truck_id: &str) -> Result<Session, SessionError> {
        self.advance(
            truck_id,
            Action::Exit,
            |_| Ok(()),
            |session| {
                (
                    EventType::SessionExit,
                    format!(
                        "Truck {} exited the facility. Session complete.",
                        session.truck_id
                    ),
                )
            },
        )
    }

    /// The truck's active session.
    pub fn get_active(&self, truck_id: &str) -> Result<Session, SessionError> {
        let truck_id = normalize_truck_id(truck_id)?;
        self.store
            .find_active(truck_id)?
            .ok_or_else(|| SessionError::NotFound {
                truck_id: truck_id.to_string(),
            })
    }

    /// Every session, including closed ones, most recently updated first.
    pub fn list_all(&self) -> Result<Vec<Session>, SessionError> {
        self.store.find_all()
    }

    /// The truck's audit trail, newest first.
    pub fn events(&self, truck_id: &str) -> Result<Vec<AuditEvent>, SessionError> {
        let truck_id = normalize_truck_id(truck_id)?;
        Ok(self.audit.events_for(truck_id)?)
    }

    /// Shared read-decide-write path for every state-advancing action.
    ///
    /// `prepare` runs after the policy allows the action and before the state
    /// changes; it records inputs and may reject them. `describe` builds the
    /// success event from the updated session.
    fn advance<P, D>(
        &self,
        truck_id: &str,
        action: Action,
        prepare: P,
        describe: D,
    ) -> Result<Session, SessionError>
    where
        P: FnOnce(&mut Session) -> Result<(), SessionError>,
        D: FnOnce(&Session) -> (EventType, String),
    {
        let truck_id = normalize_truck_id(truck_id)?;
        let lock = self.locks.lock_for(truck_id)?;
        let _held = lock
            .lock()
            .map_err(|_| SessionError::LockPoisoned(truck_id.to_string()))?;

        let mut session =
            self.store
                .find_active(truck_id)?
                .ok_or_else(|| SessionError::NotFound {
                    truck_id: truck_id.to_string(),
                })?;

        if action == Action::Dock {
            if let DockCheck::Denied { reason } = self.guard.check(&session)? {
                return Err(SessionError::MovementViolation {
                    reason,
                    session: Box::new(session),
                });
            }
        }

        if let PolicyDecision::Deny { reason } = TransitionPolicy::decide(session.state, action) {
            self.record(
                &session,
                EventType::Rejected,
                &format!("Action '{}' rejected: {}", action, reason),
            )?;
            tracing::warn!(truck_id, %action, state = %session.state, "transition rejected");
            return Err(SessionError::PolicyDenied { action, reason });
        }

        let loaded = session.clone();
        prepare(&mut session)?;
        session.advance(action);

        let saved = self.store.save(session)?;
        let (event_type, message) = describe(&saved);
        if let Err(e) = self.record(&saved, event_type, &message) {
            let restore = Session {
                version: saved.version,
                ..loaded
            };
            self.roll_back(truck_id, self.store.save(restore).map(|_| ()));
            return Err(e);
        }

        tracing::info!(
            truck_id,
            %action,
            from = %loaded.state,
            to = %saved.state,
            visit_count = saved.visit_count,
            "transition accepted"
        );
        Ok(saved)
    }

    /// Report the outcome of undoing a write whose audit event was lost.
    fn roll_back(&self, truck_id: &str, undo: Result<(), SessionError>) {
        match undo {
            Ok(()) => tracing::warn!(truck_id, "session write undone after audit failure"),
            Err(e) => tracing::error!(
                truck_id,
                error = %e,
                "failed to undo session write after audit failure"
            ),
        }
    }

    fn record(
        &self,
        session: &Session,
        event_type: EventType,
        message: &str,
    ) -> Result<(), SessionError> {
        self.audit
            .append(&session.truck_id, event_type, message)
            .map(|_| ())
            .map_err(|e| {
                tracing::error!(
                    truck_id = %session.truck_id,
                    %event_type,
                    error = %e,
                    "failed to append audit event"
                );
                e.into()
            })
    }
}

/// Format an optional weight for an audit message.
fn weight_of(weight: Option<f64>) -> String {
    weight.map_or_else(|| "unknown".to_string(), |w| w.to_string())
}

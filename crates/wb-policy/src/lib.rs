//! # wb-policy
//!
//! Session state model and table-driven transition policy for the
//! Weighbridge session core.
//!
//! [`TransitionPolicy::decide`] answers one question: may `action` run while
//! the session is in `state`? It performs no I/O and has no side effects.
//!
//! ## Key invariants
//!
//! - **Single source of ordering**: the table in [`engine`] is the only place
//!   that knows which states permit which actions.
//! - **Forward only**: every allowed action moves a session forward along
//!   ENTRY → TARE_DONE → (DOCK → GROSS_DONE)* → INVOICE_GENERATED → EXITED.
//! - **Explainable denials**: a deny reason names the action, the current
//!   state, and every state that would have been accepted.

pub mod engine;
pub mod error;
pub mod state;

pub use engine::{PolicyDecision, TransitionPolicy};
pub use error::PolicyError;
pub use state::{Action, InvoiceStatus, SessionState};

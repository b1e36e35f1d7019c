//! # wb-session
//!
//! Truck session lifecycle for the Weighbridge session core.
//!
//! A [`Session`] follows one truck through the facility:
//! entry, tare weighing, one or more dock visits with gross weighing,
//! invoicing, and exit. [`SessionLifecycle`] is the only way to move a
//! session forward. Every call is serialized per truck, checked by the
//! [`DockGuard`] and the transition policy, persisted through a
//! [`SessionStore`], and recorded in the audit log.
//!
//! ## Key components
//!
//! - [`SessionLifecycle`] — start, tare, dock, gross, invoice, exit, query
//! - [`DockGuard`] — blocks dock re-entry once an invoice exists
//! - [`SessionStore`] — storage contract, with [`JsonFileSessionStore`] and
//!   [`MemorySessionStore`] implementations
//! - [`WeighbridgeConfig`] — the `.weighbridge/` on-disk layout

pub mod config;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod locks;
pub mod memory;
pub mod session;
pub mod store;

pub use config::WeighbridgeConfig;
pub use error::SessionError;
pub use guard::{DockCheck, DockGuard};
pub use lifecycle::SessionLifecycle;
pub use locks::TruckLocks;
pub use memory::MemorySessionStore;
pub use session::Session;
pub use store::{JsonFileSessionStore, SessionStore};

pub use wb_policy::{Action, InvoiceStatus, SessionState};

// error.rs — Error types for the policy subsystem.

use thiserror::Error;

/// Errors raised when parsing wire tokens into the closed state model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The action name is not one of tare, dock, gross, invoice, exit.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The state token is not one of the six session states.
    #[error("Unknown state: {0}")]
    UnknownState(String),
}

// state.rs — The closed session state model.
//
// States serialize as the upper-case tokens the wire format uses
// ("TARE_DONE"); actions as the lower-case verbs ("dock").

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Where a truck is in the weighbridge workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Admitted at the gate, not yet weighed.
    Entry,
    /// Empty weight recorded.
    TareDone,
    /// Inside the loading dock.
    Dock,
    /// Loaded weight recorded; may return to the dock or be invoiced.
    GrossDone,
    /// Invoice issued. Movement is locked from here on.
    InvoiceGenerated,
    /// Left the facility. The session is closed but kept for history.
    Exited,
}

impl SessionState {
    pub const ALL: [SessionState; 6] = [
        SessionState::Entry,
        SessionState::TareDone,
        SessionState::Dock,
        SessionState::GrossDone,
        SessionState::InvoiceGenerated,
        SessionState::Exited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Entry => "ENTRY",
            SessionState::TareDone => "TARE_DONE",
            SessionState::Dock => "DOCK",
            SessionState::GrossDone => "GROSS_DONE",
            SessionState::InvoiceGenerated => "INVOICE_GENERATED",
            SessionState::Exited => "EXITED",
        }
    }

    /// Every state except `Exited` counts as an active session.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Exited)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownState(s.to_string()))
    }
}

/// Whether the session has been invoiced.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[default]
    None,
    Generated,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::None => write!(f, "NONE"),
            InvoiceStatus::Generated => write!(f, "GENERATED"),
        }
    }
}

/// A state-advancing request on an existing session.
///
/// Starting a session is not an action: it is a creation precondition
/// checked by the lifecycle, not a transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Tare,
    Dock,
    Gross,
    Invoice,
    Exit,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Tare,
        Action::Dock,
        Action::Gross,
        Action::Invoice,
        Action::Exit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Tare => "tare",
            Action::Dock => "dock",
            Action::Gross => "gross",
            Action::Invoice => "invoice",
            Action::Exit => "exit",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tokens_round_trip_through_from_str() {
        for state in SessionState::ALL {
            assert_eq!(state.as_str().parse::<SessionState>().unwrap(), state);
        }
        assert_eq!(
            "PARKED".parse::<SessionState>(),
            Err(PolicyError::UnknownState("PARKED".to_string()))
        );
    }

    #[test]
    fn state_serializes_as_upper_case_token() {
        let json = serde_json::to_string(&SessionState::InvoiceGenerated).unwrap();
        assert_eq!(json, "\"INVOICE_GENERATED\"");
        assert_eq!(SessionState::TareDone.to_string(), "TARE_DONE");
    }

    #[test]
    fn only_exited_is_inactive() {
        let inactive: Vec<_> = SessionState::ALL
            .into_iter()
            .filter(|s| !s.is_active())
            .collect();
        assert_eq!(inactive, vec![SessionState::Exited]);
    }

    #[test]
    fn action_parses_lower_case_verbs() {
        assert_eq!("dock".parse::<Action>().unwrap(), Action::Dock);
        assert!("DOCK".parse::<Action>().is_err());
        assert_eq!(serde_json::to_string(&Action::Invoice).unwrap(), "\"invoice\"");
    }

    #[test]
    fn invoice_status_defaults_to_none() {
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::None);
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Generated).unwrap(),
            "\"GENERATED\""
        );
    }
}

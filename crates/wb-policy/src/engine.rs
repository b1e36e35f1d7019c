// engine.rs — Transition policy evaluation.
//
// Each action lists the states it may run from:
//
//   tare    ← ENTRY
//   dock    ← TARE_DONE, GROSS_DONE
//   gross   ← DOCK
//   invoice ← GROSS_DONE
//   exit    ← INVOICE_GENERATED
//
// Anything else is denied. The match in `required_states` is exhaustive over
// `Action`, so adding an action without a row fails to compile.

use serde::{Deserialize, Serialize};

use crate::state::{Action, SessionState};

/// The result of a policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    /// The action may proceed.
    Allow,
    /// The action is out of order for the current state.
    Deny { reason: String },
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

/// Table-driven decision of whether an action is valid from a state.
///
/// Stateless; every method is a pure function of its arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionPolicy;

impl TransitionPolicy {
    /// The states from which `action` is accepted.
    pub fn required_states(action: Action) -> &'static [SessionState] {
        match action {
            Action::Tare => &[SessionState::Entry],
            Action::Dock => &[SessionState::TareDone, SessionState::GrossDone],
            Action::Gross => &[SessionState::Dock],
            Action::Invoice => &[SessionState::GrossDone],
            Action::Exit => &[SessionState::InvoiceGenerated],
        }
    }

    /// The state a session lands in once `action` is accepted.
    pub fn target_state(action: Action) -> SessionState {
        match action {
            Action::Tare => SessionState::TareDone,
            Action::Dock => SessionState::Dock,
            Action::Gross => SessionState::GrossDone,
            Action::Invoice => SessionState::InvoiceGenerated,
            Action::Exit => SessionState::Exited,
        }
    }

    /// Decide whether `action` may run while the session is in `current`.
    pub fn decide(current: SessionState, action: Action) -> PolicyDecision {
        let allowed = Self::required_states(action);
        if allowed.contains(&current) {
            return PolicyDecision::Allow;
        }

        let required = allowed
            .iter()
            .map(SessionState::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        PolicyDecision::Deny {
            reason: format!(
                "Cannot perform '{}' from state '{}'. Required state(s): {}",
                action, current, required
            ),
        }
    }

    /// Like [`decide`](Self::decide), but takes the action as a wire token.
    ///
    /// Unrecognised names are denied with `Unknown action: <name>`.
    pub fn decide_named(current: SessionState, action: &str) -> PolicyDecision {
        match action.parse::<Action>() {
            Ok(action) => Self::decide(current, action),
            Err(e) => PolicyDecision::Deny {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_allows_exactly_the_listed_pairs() {
        let allowed = [
            (SessionState::Entry, Action::Tare),
            (SessionState::TareDone, Action::Dock),
            (SessionState::GrossDone, Action::Dock),
            (SessionState::Dock, Action::Gross),
            (SessionState::GrossDone, Action::Invoice),
            (SessionState::InvoiceGenerated, Action::Exit),
        ];

        for state in SessionState::ALL {
            for action in Action::ALL {
                let decision = TransitionPolicy::decide(state, action);
                let expected = allowed.contains(&(state, action));
                assert_eq!(
                    decision.is_allowed(),
                    expected,
                    "{} from {} should be {}",
                    action,
                    state,
                    if expected { "allowed" } else { "denied" }
                );
            }
        }
    }

    #[test]
    fn deny_reason_names_action_state_and_required_states() {
        let decision = TransitionPolicy::decide(SessionState::Entry, Action::Dock);
        assert_eq!(
            decision,
            PolicyDecision::Deny {
                reason: "Cannot perform 'dock' from state 'ENTRY'. Required state(s): TARE_DONE, GROSS_DONE"
                    .to_string()
            }
        );
    }

    #[test]
    fn exited_session_permits_nothing() {
        for action in Action::ALL {
            assert!(!TransitionPolicy::decide(SessionState::Exited, action).is_allowed());
        }
    }

    #[test]
    fn unknown_action_name_is_denied() {
        let decision = TransitionPolicy::decide_named(SessionState::Entry, "teleport");
        assert_eq!(
            decision,
            PolicyDecision::Deny {
                reason: "Unknown action: teleport".to_string()
            }
        );
    }

    #[test]
    fn known_action_name_defers_to_table() {
        assert!(TransitionPolicy::decide_named(SessionState::Entry, "tare").is_allowed());
        assert!(!TransitionPolicy::decide_named(SessionState::Entry, "exit").is_allowed());
    }

    #[test]
    fn every_target_is_a_required_state_of_some_later_action_or_exited() {
        for action in Action::ALL {
            let target = TransitionPolicy::target_state(action);
            let reachable = Action::ALL
                .into_iter()
                .any(|next| TransitionPolicy::required_states(next).contains(&target));
            assert!(reachable || target == SessionState::Exited);
        }
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_string(&PolicyDecision::Allow).unwrap();
        assert_eq!(json, "{\"decision\":\"allow\"}");
    }
}

//! crates/lesson_deck_core/src/state.rs
//!
//! The workflow states of a session and the rules for moving between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The stage a session is currently in. Ordered from first to last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionState {
    #[serde(rename = "confirmFiles")]
    ConfirmFiles,
    #[serde(rename = "confirmTarget")]
    ConfirmTarget,
    #[serde(rename = "confirmOutline")]
    ConfirmOutline,
    #[serde(rename = "generatePPT")]
    GeneratePpt,
    #[serde(rename = "completeGeneration")]
    CompleteGeneration,
}

/// A rejected state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move a session from {from} to {to}")]
    Illegal { from: SessionState, to: SessionState },
    #[error("unknown session state: {0}")]
    Unknown(String),
}

impl SessionState {
    pub const ALL: [SessionState; 5] = [
        SessionState::ConfirmFiles,
        SessionState::ConfirmTarget,
        SessionState::ConfirmOutline,
        SessionState::GeneratePpt,
        SessionState::CompleteGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::ConfirmFiles => "confirmFiles",
            SessionState::ConfirmTarget => "confirmTarget",
            SessionState::ConfirmOutline => "confirmOutline",
            SessionState::GeneratePpt => "generatePPT",
            SessionState::CompleteGeneration => "completeGeneration",
        }
    }

    /// The state that follows this one, if any.
    pub fn next(self) -> Option<SessionState> {
        match self {
            SessionState::ConfirmFiles => Some(SessionState::ConfirmTarget),
            SessionState::ConfirmTarget => Some(SessionState::ConfirmOutline),
            SessionState::ConfirmOutline => Some(SessionState::GeneratePpt),
            SessionState::GeneratePpt => Some(SessionState::CompleteGeneration),
            SessionState::CompleteGeneration => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::CompleteGeneration
    }

    /// Forward by one step, back to any earlier stage, or stay put.
    /// Nothing leaves `CompleteGeneration`.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        if self == to {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        to < self || self.next() == Some(to)
    }

    /// Returns `to` if the move is legal.
    pub fn transition(self, to: SessionState) -> Result<SessionState, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError::Illegal { from: self, to })
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| TransitionError::Unknown(s.to_string()))
    }
}

//! Error taxonomy for the match core.
//!
//! Configuration problems abort a game start. Signal problems reject a single
//! request from the transport and leave the match untouched. A role with no living
//! holder is not an error at all: that action is simply skipped for the round.

use thiserror::Error;

use crate::types::{Phase, Role};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("participant count {count} is outside the allowed range {min}..={max}")]
    ParticipantCount { count: usize, min: usize, max: usize },

    #[error("a table of {participants} seats deals {mafia} mafia against {innocents} innocents")]
    UnbalancedDeck {
        participants: usize,
        mafia: usize,
        innocents: usize,
    },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// A request from outside that cannot be honoured in the current match state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("{action} is only allowed during the {expected} phase (current: {actual})")]
    WrongPhase {
        action: &'static str,
        expected: Phase,
        actual: Phase,
    },

    #[error("unknown participant '{0}'")]
    UnknownParticipant(String),

    #[error("only the human seat may submit {0}")]
    NotHuman(&'static str),

    #[error("participant '{0}' has been eliminated")]
    Eliminated(String),

    #[error("participant '{actor}' does not hold the {role} role")]
    RoleMismatch { actor: String, role: Role },

    #[error("the {0} role has no night action")]
    NoNightAction(Role),

    #[error("'{target}' is not a valid target: {reason}")]
    InvalidTarget { target: String, reason: &'static str },

    #[error("the {0} phase cannot be skipped")]
    CannotSkip(Phase),

    #[error("skip requested for {requested} but the active phase is {active}")]
    StaleSkip { requested: Phase, active: Phase },

    #[error("the lobby is closed while a match is running")]
    LobbyClosed,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

//! Rejections raised by the combat engine.

use thiserror::Error;

use crate::combat::Action;
use crate::session::PhaseKind;

/// Every variant except `LockPoisoned` is a recoverable rejection that leaves
/// session state untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CombatError {
    #[error("a battle is already running in this channel")]
    SessionAlreadyActive,

    #[error("invalid players: {0}")]
    InvalidPlayers(String),

    #[error("no battle is running in this channel")]
    NoActiveSession,

    #[error("{action} is not allowed during the {phase} phase")]
    IllegalAction { action: Action, phase: PhaseKind },

    #[error("session store lock was poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, CombatError>;

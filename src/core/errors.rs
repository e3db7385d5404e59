use crate::core::ids::{SessionId, UserId};
use thiserror::Error;

/// Failures surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown player: {0}")]
    UnknownPlayer(UserId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything a player-triggered operation can fail with.
///
/// None of these are fatal to the process: the connection layer turns each
/// into an outbound error event and keeps the session alive.
#[derive(Debug, Error)]
pub enum GameError {
    /// Action not legal in the current state or turn. Recovered locally by
    /// re-emitting the unchanged battle state.
    #[error("action not legal in the current state")]
    InvalidAction,
    /// Ability requested without a qualifying collectible, or already used.
    #[error("no eligible ability, or ability already spent")]
    NotEligible,
    #[error("not enough coins: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    /// Action references a battle that has already terminated.
    #[error("battle {0} has already ended")]
    StaleSession(SessionId),
    #[error("player is already in an active battle")]
    AlreadyInBattle,
    #[error("player is already waiting for a match")]
    AlreadyQueued,
    #[error("connection is not bound to a player")]
    NotRegistered,
    /// Retryable: the persisted side effect could not be confirmed, so the
    /// in-memory state was left untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// Stable machine-readable code for the wire protocol.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidAction => "invalid_action",
            GameError::NotEligible => "not_eligible",
            GameError::InsufficientFunds { .. } => "insufficient_funds",
            GameError::StaleSession(_) => "stale_session",
            GameError::AlreadyInBattle => "already_in_battle",
            GameError::AlreadyQueued => "already_queued",
            GameError::NotRegistered => "not_registered",
            GameError::Store(_) => "persistence_failure",
        }
    }
}

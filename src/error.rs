// Engine error taxonomy.
//
// Validation errors are returned synchronously to the caller that issued
// the offending request and never disturb other seats' state. `LockContended`
// is transient; callers retry a bounded number of times before surfacing it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("contest `{contest_id}` is not accepting entries")]
    ContestNotAcceptingEntries { contest_id: String },

    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: u32, required: u32 },

    #[error("entry limit reached for contest `{contest_id}` (max {max})")]
    EntryLimitExceeded { contest_id: String, max: u32 },

    #[error("room {room_id} not found")]
    RoomNotFound { room_id: u64 },

    #[error("`{id}` is not a participant in this room")]
    NotParticipant { id: String },

    #[error("it is not seat {seat}'s turn (turn index {turn_index})")]
    NotYourTurn { seat: usize, turn_index: usize },

    #[error("illegal pick: {reason}")]
    IllegalPick { reason: String },

    #[error("withdrawal not allowed: room is past the waiting phase")]
    WithdrawalNotAllowed,

    #[error("lock contended for `{key}`; retry")]
    LockContended { key: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the caller should retry the operation as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::LockContended { .. })
    }

    /// Stable machine-readable code for wire serialization.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ContestNotAcceptingEntries { .. } => "contest_not_accepting_entries",
            EngineError::InsufficientFunds { .. } => "insufficient_funds",
            EngineError::EntryLimitExceeded { .. } => "entry_limit_exceeded",
            EngineError::RoomNotFound { .. } => "room_not_found",
            EngineError::NotParticipant { .. } => "not_participant",
            EngineError::NotYourTurn { .. } => "not_your_turn",
            EngineError::IllegalPick { .. } => "illegal_pick",
            EngineError::WithdrawalNotAllowed => "withdrawal_not_allowed",
            EngineError::LockContended { .. } => "lock_contended",
            EngineError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_contended_is_transient() {
        let err = EngineError::LockContended {
            key: "entry:c1:u1".into(),
        };
        assert!(err.is_transient());
        assert!(!EngineError::WithdrawalNotAllowed.is_transient());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            EngineError::RoomNotFound { room_id: 3 }.code(),
            "room_not_found"
        );
        assert_eq!(
            EngineError::IllegalPick {
                reason: "over budget".into()
            }
            .code(),
            "illegal_pick"
        );
    }
}

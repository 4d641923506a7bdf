//! Rejection taxonomy for room actions.

use wordspy_protocol::{ErrorCode, Phase, PlayerId, RoomCode, ServerNotification};

/// Why an action was rejected.
///
/// Every variant maps to a wire [`ErrorCode`] via [`ActionError::code`];
/// the display string becomes the human-readable message. Rejections
/// never mutate room state and never bump the version.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActionError {
    #[error("room {0} does not exist")]
    RoomNotFound(RoomCode),

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("{0} is not the host")]
    NotHost(PlayerId),

    #[error("{0} is not a member of this room")]
    NotMember(PlayerId),

    #[error("cannot {action} during {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: Phase,
    },

    #[error("all members must be ready to start")]
    MembersNotReady,

    #[error("{0} already voted this round")]
    AlreadyVoted(PlayerId),

    #[error("invalid vote target {0}")]
    InvalidVoteTarget(PlayerId),

    #[error("need at least 3 players to start, have {have}")]
    InsufficientPlayers { have: usize },

    #[error("word catalog unavailable: {0}")]
    WordUnavailable(String),

    #[error("server is at room capacity")]
    ServerAtCapacity,

    #[error("server is draining, no new rooms or joins")]
    Draining,

    #[error("room {0} is shutting down")]
    Unavailable(RoomCode),
}

impl ActionError {
    /// The machine-readable code surfaced to the acting client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::NotHost(_) => ErrorCode::NotHost,
            Self::NotMember(_) => ErrorCode::NotMember,
            Self::InvalidPhase { .. } | Self::MembersNotReady => ErrorCode::InvalidPhaseForAction,
            Self::AlreadyVoted(_) => ErrorCode::AlreadyVoted,
            Self::InvalidVoteTarget(_) => ErrorCode::InvalidVoteTarget,
            Self::InsufficientPlayers { .. } => ErrorCode::InsufficientPlayers,
            Self::WordUnavailable(_)
            | Self::ServerAtCapacity
            | Self::Draining
            | Self::Unavailable(_) => ErrorCode::Internal,
        }
    }

    /// The error as a notification for the acting client.
    pub fn to_notification(&self) -> ServerNotification {
        ServerNotification::Error {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

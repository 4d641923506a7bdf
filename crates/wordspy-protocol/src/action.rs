//! Player-issued actions.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomCode};

/// Host-chosen settings applied when a round starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOptions {
    /// Deal a Detective this round.
    #[serde(default)]
    pub detective: bool,
    /// Deal a Joker this round.
    #[serde(default)]
    pub joker: bool,
    /// Draw the word from this category; `None` picks one at random.
    #[serde(default)]
    pub category: Option<String>,
}

/// An action a player can take inside a room.
///
/// Joining is not here - a join carries the player's outbound channel
/// and goes through the registry, not the per-room dispatch path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    /// Leave the room. The room closes if this empties it.
    LeaveRoom,
    /// Toggle the ready flag (Waiting phase only).
    Ready,
    /// Start the round (host only, all members ready, at least 3).
    StartGame {
        #[serde(default)]
        options: Option<StartOptions>,
    },
    /// Ask to end discussion early; voting begins once a quorum asks.
    RequestVoting,
    /// Cast a ballot against another member.
    Vote { target: PlayerId },
    /// Return the room to the lobby for another round (host only).
    PlayAgain,
}

impl ClientAction {
    /// Short name used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LeaveRoom => "leave_room",
            Self::Ready => "ready",
            Self::StartGame { .. } => "start_game",
            Self::RequestVoting => "request_voting",
            Self::Vote { .. } => "vote",
            Self::PlayAgain => "play_again",
        }
    }
}

/// A routed action as the gateway hands it to the registry.
///
/// `observed_version` is the room version the client had seen when it
/// acted. A mismatch is informational only - the owning state machine
/// is the single source of truth and stale-but-valid actions still
/// apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub room: RoomCode,
    pub action: ClientAction,
    #[serde(default)]
    pub observed_version: Option<u64>,
}

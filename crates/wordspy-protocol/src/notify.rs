//! Server-issued notifications.

use serde::{Deserialize, Serialize};

use crate::{ClientSnapshot, Phase, PlayerId, Role, Verdict, Winner};

/// Machine-readable error codes surfaced to the acting client.
///
/// `internal` covers everything that is retried server-side and only
/// reaches a client when retries are exhausted; it is always safe to
/// retry the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    NotHost,
    NotMember,
    InvalidPhaseForAction,
    AlreadyVoted,
    InvalidVoteTarget,
    InsufficientPlayers,
    Internal,
}

/// A notification pushed from the server to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerNotification {
    /// Full room state, already redacted for the recipient.
    RoomState { snapshot: ClientSnapshot },

    /// A player entered the room.
    PlayerJoined { player: PlayerId, name: String },

    /// A player left. `new_host` is set when host succession occurred.
    PlayerLeft {
        player: PlayerId,
        name: String,
        new_host: Option<PlayerId>,
    },

    /// A player's ready flag changed.
    PlayerReady { player: PlayerId, ready: bool },

    /// A round started; roles are in each recipient's next `RoomState`.
    GameStarted { round: u32 },

    /// The phase advanced. `deadline_ms` is the absolute expiry stamp
    /// (epoch milliseconds), absent in Waiting and Closed.
    PhaseChange {
        phase: Phase,
        deadline_ms: Option<u64>,
    },

    /// Ballot progress. Counts only - targets and voter identities stay
    /// hidden until Results.
    VoteUpdate { votes_cast: usize, members: usize },

    /// The round's verdict. `revealed_role` is the eliminated player's
    /// actual role, absent on a tie.
    GameResult {
        verdict: Verdict,
        revealed_role: Option<Role>,
        winner: Winner,
    },

    /// A rejected action, returned only to the acting client.
    Error { code: ErrorCode, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_notification_json_shape() {
        let n = ServerNotification::Error {
            code: ErrorCode::InvalidPhaseForAction,
            message: "cannot vote during playing".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "invalid_phase_for_action");
    }

    #[test]
    fn test_phase_change_json_shape() {
        let n = ServerNotification::PhaseChange {
            phase: Phase::Voting,
            deadline_ms: Some(1_000_030_000),
        };
        let json: serde_json::Value = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "phase_change");
        assert_eq!(json["phase"], "voting");
        assert_eq!(json["deadline_ms"], 1_000_030_000u64);
    }

    #[test]
    fn test_game_result_round_trip() {
        let n = ServerNotification::GameResult {
            verdict: Verdict::Eliminated { player: PlayerId(1) },
            revealed_role: Some(Role::Impostor),
            winner: Winner::Civilians,
        };
        let bytes = serde_json::to_vec(&n).unwrap();
        let decoded: ServerNotification = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(n, decoded);
    }

    #[test]
    fn test_unknown_notification_type_fails_to_decode() {
        let unknown = r#"{"type": "teleport", "x": 1}"#;
        let result: Result<ServerNotification, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}

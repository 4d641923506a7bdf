//! Core identity and game-domain types.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player, stable across reconnects.
///
/// Newtype over `u64` so a `PlayerId` can never be confused with a
/// version counter or any other number. `#[serde(transparent)]` keeps
/// the JSON representation a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A short, human-shareable room code like `"AB12"`.
///
/// Codes are stored uppercase; [`RoomCode::new`] normalizes, so lookups
/// are effectively case-insensitive no matter how the client typed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Creates a room code, normalizing to uppercase.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// One stage of the per-room state machine.
///
/// Transitions are strictly ordered; the only shortcut is
/// `Playing → Voting` via a quorum of vote requests, which is still the
/// next phase in line:
///
/// ```text
/// Waiting → RoleReveal → Playing → Voting → Results → Waiting
///    └──────────────────────(empty room)──────────────→ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    RoleReveal,
    Playing,
    Voting,
    Results,
    Closed,
}

impl Phase {
    /// Returns `true` if new players may join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if a round is underway (roles are assigned).
    pub fn in_round(&self) -> bool {
        matches!(self, Self::RoleReveal | Self::Playing | Self::Voting | Self::Results)
    }

    /// Returns `true` once the room is gone for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "waiting",
            Self::RoleReveal => "role_reveal",
            Self::Playing => "playing",
            Self::Voting => "voting",
            Self::Results => "results",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// A player's secret role for one round.
///
/// Modeled as a tagged variant, not a hierarchy; what a player may see
/// is a pure function of this tag, computed at serialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Civilian,
    Impostor,
    Detective,
    Joker,
}

impl Role {
    /// Whether this role is shown the secret word. The Impostor sees
    /// only the category name.
    pub fn holds_word(&self) -> bool {
        !matches!(self, Self::Impostor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Civilian => "civilian",
            Self::Impostor => "impostor",
            Self::Detective => "detective",
            Self::Joker => "joker",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Verdict and winner
// ---------------------------------------------------------------------------

/// The outcome of a vote tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Verdict {
    /// One candidate held a strict plurality and is eliminated.
    Eliminated { player: PlayerId },
    /// The top vote-getters tied; nobody is eliminated.
    Tie { candidates: Vec<PlayerId> },
}

/// Which side won the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// Civilians (plus Detective/Joker) caught the Impostor.
    Civilians,
    /// The Impostor survived the vote - including every tie.
    Impostor,
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Specifies who should receive a server notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every member of the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except the specified player.
    AllExcept(PlayerId),
}

// =========================================================================
// Tests
// =========================================================================

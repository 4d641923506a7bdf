//! Versioned room snapshots and per-recipient redaction.
//!
//! A [`StateSnapshot`] is the full authoritative state of one room -
//! including every secret - and is the unit of cross-process
//! propagation. It never goes to a client directly: each recipient gets
//! a [`ClientSnapshot`] produced by [`StateSnapshot::redacted_for`],
//! which computes visibility from the viewer's role at serialization
//! time. Nothing pre-redacted is ever stored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Phase, PlayerId, Role, RoomCode, Verdict, Winner};

// ---------------------------------------------------------------------------
// Role assignment
// ---------------------------------------------------------------------------

/// One round's secret role deal.
///
/// Invariants (enforced by the assigner, relied upon everywhere):
/// exactly one Impostor; Detective and Joker at most once each and only
/// when enabled; everyone else Civilian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// The secret word, visible to every role except the Impostor.
    pub word: String,
    /// The category name, visible to everyone including the Impostor.
    pub category: String,
    /// Role per member.
    pub roles: HashMap<PlayerId, Role>,
}

impl RoleAssignment {
    /// The Impostor's id. The one-Impostor invariant makes this total.
    pub fn impostor(&self) -> Option<PlayerId> {
        self.roles
            .iter()
            .find(|(_, role)| matches!(role, Role::Impostor))
            .map(|(id, _)| *id)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Public, per-member state. Safe for any viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberState {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub connected: bool,
    /// Whether this member asked to end discussion early.
    pub wants_voting: bool,
}

/// The revealed outcome of a finished vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub verdict: Verdict,
    /// The eliminated player's actual role; `None` on a tie.
    pub revealed_role: Option<Role>,
    pub winner: Winner,
}

/// The full authoritative state of a room at one version.
///
/// Members are kept in join order - the order drives host succession
/// and the deterministic role shuffle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub code: RoomCode,
    /// Strictly increasing; +1 per accepted mutation.
    pub version: u64,
    pub host: PlayerId,
    pub phase: Phase,
    /// Absolute phase expiry, epoch milliseconds. `None` in Waiting and
    /// Closed.
    pub deadline_ms: Option<u64>,
    pub round: u32,
    pub public: bool,
    pub max_players: usize,
    pub members: Vec<MemberState>,
    /// Present while a round is underway. Contains secrets.
    pub assignment: Option<RoleAssignment>,
    /// Ballots cast this voting phase, voter → target. Secret until
    /// Results.
    pub votes: HashMap<PlayerId, PlayerId>,
    /// Present in the Results phase.
    pub outcome: Option<RoundOutcome>,
}

impl StateSnapshot {
    /// Produces what `viewer` is allowed to see.
    ///
    /// - Own role always; other roles never (before Results the
    ///   assignment is secret, and even in Results only the eliminated
    ///   player's role is revealed, via `outcome`).
    /// - The word only for word-holding roles; the Impostor gets the
    ///   category alone.
    /// - Ballots as a count; targets and voter identities are dropped.
    pub fn redacted_for(&self, viewer: PlayerId) -> ClientSnapshot {
        let you = self.assignment.as_ref().and_then(|assignment| {
            let role = *assignment.roles.get(&viewer)?;
            Some(YourRole {
                role,
                category: assignment.category.clone(),
                word: role.holds_word().then(|| assignment.word.clone()),
            })
        });

        ClientSnapshot {
            code: self.code.clone(),
            version: self.version,
            host: self.host,
            phase: self.phase,
            deadline_ms: self.deadline_ms,
            round: self.round,
            max_players: self.max_players,
            members: self.members.clone(),
            you,
            votes_cast: self.votes.len(),
            you_voted: self.votes.contains_key(&viewer),
            outcome: self.outcome.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client view
// ---------------------------------------------------------------------------

/// The recipient's private slice of the assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YourRole {
    pub role: Role,
    pub category: String,
    /// `None` exactly when the role does not hold the word.
    pub word: Option<String>,
}

/// A snapshot as one specific client sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub code: RoomCode,
    pub version: u64,
    pub host: PlayerId,
    pub phase: Phase,
    pub deadline_ms: Option<u64>,
    pub round: u32,
    pub max_players: usize,
    pub members: Vec<MemberState>,
    /// The viewer's role and word, if a round is underway and the
    /// viewer is part of it.
    pub you: Option<YourRole>,
    pub votes_cast: usize,
    pub you_voted: bool,
    pub outcome: Option<RoundOutcome>,
}

// ---------------------------------------------------------------------------
// Propagation unit
// ---------------------------------------------------------------------------

/// A state change as the room layer hands it to the sync layer,
/// after the in-memory mutation has committed.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomUpdate {
    /// The room reached a new version.
    Changed(StateSnapshot),
    /// The room closed and should disappear from the shared store.
    Closed(RoomCode),
}

// =========================================================================
// Tests
// =========================================================================

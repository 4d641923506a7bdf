//! The per-room session state machine.
//!
//! [`RoomSession`] is pure state: no channels, no clocks, no spawns.
//! Every mutation takes the current wall-clock time as a parameter and
//! returns [`Effects`] describing what the caller (the room actor) must
//! do next - which notifications to fan out and how to re-arm the phase
//! timer. That split keeps every transition unit-testable without a
//! runtime.
//!
//! # Versioning
//!
//! The version starts at 1 and increases by exactly one per accepted
//! mutation. Rejected actions and no-op actions (a repeated vote
//! request, a connection flag set to its current value) leave the
//! version untouched.

use std::collections::HashMap;
use std::time::Duration;

use wordspy_game::{tally, winner_for, RoleOptions, MIN_PLAYERS};
use wordspy_protocol::{
    MemberState, Phase, PlayerId, Recipient, RoleAssignment, RoomCode, RoundOutcome,
    ServerNotification, StartOptions, StateSnapshot, Verdict, Winner,
};

use crate::{ActionError, PhaseSchedule, RoomOptions};

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// What the caller must do to the phase timer after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    /// Leave the timer as it is.
    Keep,
    /// Schedule an expiry after the given delay, replacing any pending
    /// one.
    Arm(Duration),
    /// Drop any pending expiry.
    Cancel,
}

/// The outward consequences of one accepted mutation.
#[derive(Debug)]
pub struct Effects {
    /// Notifications to fan out, in order.
    pub events: Vec<(Recipient, ServerNotification)>,
    pub timer: TimerOp,
    /// Whether state actually changed (and the version was bumped).
    /// When `true` the caller re-broadcasts snapshots and propagates
    /// the new version.
    pub changed: bool,
}

impl Effects {
    fn unchanged() -> Self {
        Self { events: Vec::new(), timer: TimerOp::Keep, changed: false }
    }

    fn mutated() -> Self {
        Self { events: Vec::new(), timer: TimerOp::Keep, changed: true }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Member {
    id: PlayerId,
    name: String,
    ready: bool,
    connected: bool,
    wants_voting: bool,
    vote: Option<PlayerId>,
}

impl Member {
    fn new(id: PlayerId, name: String) -> Self {
        Self { id, name, ready: false, connected: true, wants_voting: false, vote: None }
    }
}

/// One room's authoritative state.
///
/// Members are kept in join order; the first member is always the host,
/// and host succession on departure promotes the next in line.
pub struct RoomSession {
    code: RoomCode,
    options: RoomOptions,
    schedule: PhaseSchedule,
    version: u64,
    host: PlayerId,
    phase: Phase,
    deadline_ms: Option<u64>,
    round: u32,
    members: Vec<Member>,
    assignment: Option<RoleAssignment>,
    outcome: Option<RoundOutcome>,
    last_word: Option<String>,
    last_impostor: Option<PlayerId>,
}

impl RoomSession {
    /// Creates a room in Waiting with the creator as host and sole
    /// member. The initial state is version 1.
    pub fn new(
        code: RoomCode,
        host: PlayerId,
        host_name: impl Into<String>,
        options: RoomOptions,
        schedule: PhaseSchedule,
    ) -> Self {
        Self {
            code,
            options,
            schedule,
            version: 1,
            host,
            phase: Phase::Waiting,
            deadline_ms: None,
            round: 0,
            members: vec![Member::new(host, host_name.into())],
            assignment: None,
            outcome: None,
            last_word: None,
            last_impostor: None,
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn host(&self) -> PlayerId {
        self.host
    }

    pub fn is_closed(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn is_public(&self) -> bool {
        self.options.public
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn max_players(&self) -> usize {
        self.options.max_players
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.members.iter().any(|m| m.id == player)
    }

    /// Member ids in join order.
    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// The word dealt last round, used to avoid an immediate repeat.
    pub fn last_word(&self) -> Option<&str> {
        self.last_word.as_deref()
    }

    /// Last round's Impostor, rotated away from on the next deal.
    pub fn last_impostor(&self) -> Option<PlayerId> {
        self.last_impostor
    }

    pub fn role_options(&self) -> RoleOptions {
        RoleOptions { detective: self.options.detective, joker: self.options.joker }
    }

    pub fn category(&self) -> Option<&str> {
        self.options.category.as_deref()
    }

    /// Overlays host-chosen options; part of the start mutation, so no
    /// version bump of its own.
    pub fn apply_start_options(&mut self, options: &StartOptions) {
        self.options.apply(options);
    }

    /// The full authoritative snapshot at the current version.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            code: self.code.clone(),
            version: self.version,
            host: self.host,
            phase: self.phase,
            deadline_ms: self.deadline_ms,
            round: self.round,
            public: self.options.public,
            max_players: self.options.max_players,
            members: self
                .members
                .iter()
                .map(|m| MemberState {
                    id: m.id,
                    name: m.name.clone(),
                    ready: m.ready,
                    connected: m.connected,
                    wants_voting: m.wants_voting,
                })
                .collect(),
            assignment: self.assignment.clone(),
            votes: self.votes(),
            outcome: self.outcome.clone(),
        }
    }

    // -- mutations ----------------------------------------------------------

    /// Adds a player, or re-attaches a returning member.
    ///
    /// A join from an existing member is a reconnect: the connection
    /// flag is raised and nothing else changes, whatever the phase. A
    /// genuinely new player is admitted only in Waiting and only below
    /// the member cap.
    pub fn join(&mut self, player: PlayerId, name: &str) -> Result<Effects, ActionError> {
        if let Some(member) = self.member_mut(player) {
            if member.connected {
                return Ok(Effects::unchanged());
            }
            member.connected = true;
            self.version += 1;
            return Ok(Effects::mutated());
        }

        if !self.phase.is_joinable() {
            return Err(ActionError::InvalidPhase { action: "join", phase: self.phase });
        }
        if self.members.len() >= self.options.max_players {
            return Err(ActionError::RoomFull(self.code.clone()));
        }

        self.members.push(Member::new(player, name.to_string()));
        self.version += 1;

        let mut effects = Effects::mutated();
        effects.events.push((
            Recipient::All,
            ServerNotification::PlayerJoined { player, name: name.to_string() },
        ));
        Ok(effects)
    }

    /// Removes a player, promoting a new host if needed and closing the
    /// room when it empties.
    ///
    /// A departure mid-phase can complete a pending transition: it can
    /// satisfy the voting quorum during Playing, or leave everyone
    /// voted during Voting.
    pub fn leave(&mut self, player: PlayerId, now_ms: u64) -> Result<Effects, ActionError> {
        let Some(pos) = self.members.iter().position(|m| m.id == player) else {
            return Err(ActionError::NotMember(player));
        };
        let removed = self.members.remove(pos);
        // Ballots cast by or against the departed player are void.
        for member in &mut self.members {
            if member.vote == Some(player) {
                member.vote = None;
            }
        }
        self.version += 1;

        if self.members.is_empty() {
            self.phase = Phase::Closed;
            self.deadline_ms = None;
            self.assignment = None;
            self.outcome = None;
            let mut effects = Effects::mutated();
            effects.timer = TimerOp::Cancel;
            return Ok(effects);
        }

        let new_host = (self.host == player).then(|| {
            self.host = self.members[0].id;
            self.host
        });

        let mut effects = Effects::mutated();
        effects.events.push((
            Recipient::All,
            ServerNotification::PlayerLeft { player, name: removed.name, new_host },
        ));

        match self.phase {
            Phase::Playing if self.voting_quorum_met() => self.enter_voting(now_ms, &mut effects),
            Phase::Voting if self.all_connected_voted() => self.finish_voting(now_ms, &mut effects),
            _ => {}
        }
        Ok(effects)
    }

    /// Toggles the ready flag. Waiting phase only.
    pub fn toggle_ready(&mut self, player: PlayerId) -> Result<Effects, ActionError> {
        if self.phase != Phase::Waiting {
            return Err(ActionError::InvalidPhase { action: "ready", phase: self.phase });
        }
        let member = self.member_mut(player).ok_or(ActionError::NotMember(player))?;
        member.ready = !member.ready;
        let ready = member.ready;
        self.version += 1;

        let mut effects = Effects::mutated();
        effects
            .events
            .push((Recipient::All, ServerNotification::PlayerReady { player, ready }));
        Ok(effects)
    }

    /// Checks every precondition for starting a round without mutating
    /// anything. The actor calls this before the (async) word draw,
    /// then [`begin_round`](Self::begin_round) with the finished deal.
    pub fn ensure_can_start(&self, player: PlayerId) -> Result<(), ActionError> {
        if !self.contains(player) {
            return Err(ActionError::NotMember(player));
        }
        if player != self.host {
            return Err(ActionError::NotHost(player));
        }
        if self.phase != Phase::Waiting {
            return Err(ActionError::InvalidPhase { action: "start_game", phase: self.phase });
        }
        if self.members.len() < MIN_PLAYERS {
            return Err(ActionError::InsufficientPlayers { have: self.members.len() });
        }
        if !self.members.iter().all(|m| m.ready) {
            return Err(ActionError::MembersNotReady);
        }
        Ok(())
    }

    /// Installs a finished role deal and enters RoleReveal.
    ///
    /// Preconditions are [`ensure_can_start`](Self::ensure_can_start)'s;
    /// the actor holds the room single-threaded between the check and
    /// this call, so they still hold.
    pub fn begin_round(&mut self, assignment: RoleAssignment, now_ms: u64) -> Effects {
        self.round += 1;
        self.last_word = Some(assignment.word.clone());
        self.last_impostor = assignment.impostor();
        for member in &mut self.members {
            member.wants_voting = false;
            member.vote = None;
        }
        self.outcome = None;
        self.assignment = Some(assignment);
        self.phase = Phase::RoleReveal;
        let deadline = now_ms + self.schedule.role_reveal.as_millis() as u64;
        self.deadline_ms = Some(deadline);
        self.version += 1;

        let mut effects = Effects::mutated();
        effects
            .events
            .push((Recipient::All, ServerNotification::GameStarted { round: self.round }));
        effects.events.push((
            Recipient::All,
            ServerNotification::PhaseChange {
                phase: Phase::RoleReveal,
                deadline_ms: Some(deadline),
            },
        ));
        effects.timer = TimerOp::Arm(self.schedule.role_reveal);
        effects
    }

    /// Records a request to end discussion early. Once more than half
    /// the members have asked, Voting begins immediately.
    pub fn request_voting(&mut self, player: PlayerId, now_ms: u64) -> Result<Effects, ActionError> {
        if self.phase != Phase::Playing {
            return Err(ActionError::InvalidPhase { action: "request_voting", phase: self.phase });
        }
        let member = self.member_mut(player).ok_or(ActionError::NotMember(player))?;
        if member.wants_voting {
            return Ok(Effects::unchanged());
        }
        member.wants_voting = true;
        self.version += 1;

        let mut effects = Effects::mutated();
        if self.voting_quorum_met() {
            self.enter_voting(now_ms, &mut effects);
        }
        Ok(effects)
    }

    /// Casts a ballot. One per member per round; self-votes and votes
    /// for non-members are rejected. Voting finishes early once every
    /// connected member has voted.
    pub fn vote(
        &mut self,
        voter: PlayerId,
        target: PlayerId,
        now_ms: u64,
    ) -> Result<Effects, ActionError> {
        if self.phase != Phase::Voting {
            return Err(ActionError::InvalidPhase { action: "vote", phase: self.phase });
        }
        if !self.contains(voter) {
            return Err(ActionError::NotMember(voter));
        }
        if target == voter || !self.contains(target) {
            return Err(ActionError::InvalidVoteTarget(target));
        }
        let member = self.member_mut(voter).ok_or(ActionError::NotMember(voter))?;
        if member.vote.is_some() {
            return Err(ActionError::AlreadyVoted(voter));
        }
        member.vote = Some(target);
        self.version += 1;

        let mut effects = Effects::mutated();
        effects.events.push((
            Recipient::All,
            ServerNotification::VoteUpdate {
                votes_cast: self.votes().len(),
                members: self.members.len(),
            },
        ));
        if self.all_connected_voted() {
            self.finish_voting(now_ms, &mut effects);
        }
        Ok(effects)
    }

    /// Returns the room to the lobby for another round. Host only, from
    /// Results.
    pub fn play_again(&mut self, player: PlayerId) -> Result<Effects, ActionError> {
        if !self.contains(player) {
            return Err(ActionError::NotMember(player));
        }
        if player != self.host {
            return Err(ActionError::NotHost(player));
        }
        if self.phase != Phase::Results {
            return Err(ActionError::InvalidPhase { action: "play_again", phase: self.phase });
        }
        self.reset_to_waiting();
        self.version += 1;

        let mut effects = Effects::mutated();
        effects.events.push((
            Recipient::All,
            ServerNotification::PhaseChange { phase: Phase::Waiting, deadline_ms: None },
        ));
        effects.timer = TimerOp::Cancel;
        Ok(effects)
    }

    /// Advances the phase on timer expiry. The actor has already
    /// discarded stale generations; an expiry in an untimed phase is a
    /// benign no-op.
    pub fn timer_expired(&mut self, now_ms: u64) -> Effects {
        let mut effects = Effects::mutated();
        match self.phase {
            Phase::RoleReveal => self.enter_playing(now_ms, &mut effects),
            Phase::Playing => self.enter_voting(now_ms, &mut effects),
            Phase::Voting => self.finish_voting(now_ms, &mut effects),
            Phase::Results => {
                self.reset_to_waiting();
                effects.events.push((
                    Recipient::All,
                    ServerNotification::PhaseChange { phase: Phase::Waiting, deadline_ms: None },
                ));
            }
            Phase::Waiting | Phase::Closed => return Effects::unchanged(),
        }
        self.version += 1;
        effects
    }

    /// Flags a member as connected or not. During Voting a disconnect
    /// can complete the everyone-voted early finish.
    pub fn set_connected(
        &mut self,
        player: PlayerId,
        connected: bool,
        now_ms: u64,
    ) -> Result<Effects, ActionError> {
        let member = self.member_mut(player).ok_or(ActionError::NotMember(player))?;
        if member.connected == connected {
            return Ok(Effects::unchanged());
        }
        member.connected = connected;
        self.version += 1;

        let mut effects = Effects::mutated();
        if self.phase == Phase::Voting && self.all_connected_voted() {
            self.finish_voting(now_ms, &mut effects);
        }
        Ok(effects)
    }

    // -- transitions --------------------------------------------------------

    fn enter_playing(&mut self, now_ms: u64, effects: &mut Effects) {
        self.phase = Phase::Playing;
        let deadline = now_ms + self.schedule.playing.as_millis() as u64;
        self.deadline_ms = Some(deadline);
        effects.events.push((
            Recipient::All,
            ServerNotification::PhaseChange { phase: Phase::Playing, deadline_ms: Some(deadline) },
        ));
        effects.timer = TimerOp::Arm(self.schedule.playing);
    }

    fn enter_voting(&mut self, now_ms: u64, effects: &mut Effects) {
        self.phase = Phase::Voting;
        let deadline = now_ms + self.schedule.voting.as_millis() as u64;
        self.deadline_ms = Some(deadline);
        for member in &mut self.members {
            member.vote = None;
        }
        effects.events.push((
            Recipient::All,
            ServerNotification::PhaseChange { phase: Phase::Voting, deadline_ms: Some(deadline) },
        ));
        effects.timer = TimerOp::Arm(self.schedule.voting);
    }

    fn finish_voting(&mut self, now_ms: u64, effects: &mut Effects) {
        let verdict = tally(&self.votes());
        let (revealed_role, winner) = match &self.assignment {
            Some(assignment) => {
                let revealed = match &verdict {
                    Verdict::Eliminated { player } => assignment.roles.get(player).copied(),
                    Verdict::Tie { .. } => None,
                };
                let winner = assignment
                    .impostor()
                    .map_or(Winner::Impostor, |impostor| winner_for(&verdict, impostor));
                (revealed, winner)
            }
            None => (None, Winner::Impostor),
        };

        self.outcome = Some(RoundOutcome { verdict: verdict.clone(), revealed_role, winner });
        self.phase = Phase::Results;
        let deadline = now_ms + self.schedule.results.as_millis() as u64;
        self.deadline_ms = Some(deadline);

        effects.events.push((
            Recipient::All,
            ServerNotification::GameResult { verdict, revealed_role, winner },
        ));
        effects.events.push((
            Recipient::All,
            ServerNotification::PhaseChange { phase: Phase::Results, deadline_ms: Some(deadline) },
        ));
        effects.timer = TimerOp::Arm(self.schedule.results);
    }

    fn reset_to_waiting(&mut self) {
        self.phase = Phase::Waiting;
        self.deadline_ms = None;
        self.assignment = None;
        self.outcome = None;
        for member in &mut self.members {
            member.ready = false;
            member.wants_voting = false;
            member.vote = None;
        }
    }

    // -- helpers ------------------------------------------------------------

    fn member_mut(&mut self, player: PlayerId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == player)
    }

    fn votes(&self) -> HashMap<PlayerId, PlayerId> {
        self.members
            .iter()
            .filter_map(|m| m.vote.map(|target| (m.id, target)))
            .collect()
    }

    /// More than half the members asked to vote.
    fn voting_quorum_met(&self) -> bool {
        let wants = self.members.iter().filter(|m| m.wants_voting).count();
        wants > self.members.len() / 2
    }

    fn all_connected_voted(&self) -> bool {
        let connected = self.members.iter().filter(|m| m.connected);
        let mut any = false;
        for member in connected {
            if member.vote.is_none() {
                return false;
            }
            any = true;
        }
        any
    }
}

// =========================================================================
// Tests
// =========================================================================

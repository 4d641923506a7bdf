//! The room actor: one task per room, owning its session exclusively.
//!
//! All mutation flows through the room's command channel, so player
//! actions, timer expiries, and connection changes are applied strictly
//! one at a time. Replies are sent only after the mutation's effects
//! (notifications, timer re-arm, snapshot propagation) have been
//! applied, which makes ordering observable in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};
use wordspy_game::{assign_roles, GameError, WordCatalog};
use wordspy_protocol::{
    ClientAction, Phase, PlayerId, Recipient, RoomCode, RoomUpdate, ServerNotification,
};
use wordspy_timer::PhaseTimer;

use crate::session::{Effects, RoomSession, TimerOp};
use crate::{ActionError, PhaseSchedule, RoomOptions};

/// Per-player outbound notification channel.
pub type PlayerSender = mpsc::UnboundedSender<ServerNotification>;

/// Commands the actor accepts.
#[derive(Debug)]
pub enum RoomCommand {
    /// Add (or re-attach) a player with their outbound channel.
    Join {
        player: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    /// Apply a player action.
    Act {
        player: PlayerId,
        action: ClientAction,
        observed_version: Option<u64>,
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    /// Flag a member's connection state.
    SetConnected { player: PlayerId, connected: bool },
    /// A phase timer fired. Stale generations are discarded.
    TimerExpired { generation: u64 },
    /// Report current room metadata.
    Info { reply: oneshot::Sender<RoomInfo> },
    /// Stop the actor, closing the room.
    Shutdown,
}

/// Room metadata for listings and admin surfaces.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: Phase,
    pub players: usize,
    pub max_players: usize,
    pub public: bool,
    pub version: u64,
}

/// A cheap handle to a running room actor.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Whether the actor has stopped. Used by the registry's reaper.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn join(
        &self,
        player: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), ActionError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join { player, name, sender, reply }).await?;
        rx.await.map_err(|_| ActionError::Unavailable(self.code.clone()))?
    }

    pub async fn act(
        &self,
        player: PlayerId,
        action: ClientAction,
        observed_version: Option<u64>,
    ) -> Result<(), ActionError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Act { player, action, observed_version, reply }).await?;
        rx.await.map_err(|_| ActionError::Unavailable(self.code.clone()))?
    }

    pub async fn set_connected(&self, player: PlayerId, connected: bool) -> Result<(), ActionError> {
        self.send(RoomCommand::SetConnected { player, connected }).await
    }

    pub async fn info(&self) -> Result<RoomInfo, ActionError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Info { reply }).await?;
        rx.await.map_err(|_| ActionError::Unavailable(self.code.clone()))
    }

    pub async fn shutdown(&self) -> Result<(), ActionError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, command: RoomCommand) -> Result<(), ActionError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ActionError::Unavailable(self.code.clone()))
    }
}

/// Spawns a room actor with `host` as its first member.
///
/// The host's initial `RoomState` is delivered and the version-1
/// snapshot is handed to `updates` before any command is processed.
pub fn spawn_room<W: WordCatalog>(
    code: RoomCode,
    host: PlayerId,
    host_name: String,
    host_sender: PlayerSender,
    options: RoomOptions,
    schedule: PhaseSchedule,
    catalog: Arc<W>,
    updates: mpsc::UnboundedSender<RoomUpdate>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let session = RoomSession::new(code.clone(), host, host_name, options, schedule);
    let timer = PhaseTimer::new(tx.clone(), |generation| RoomCommand::TimerExpired { generation });

    let mut actor = RoomActor {
        session,
        timer,
        senders: HashMap::from([(host, host_sender)]),
        catalog,
        updates,
        receiver: rx,
    };
    let handle = RoomHandle { code: code.clone(), sender: tx };

    tokio::spawn(async move {
        info!(room = %code, "room opened");
        actor.publish_state();
        actor.run().await;
        info!(room = %code, "room closed");
    });

    handle
}

struct RoomActor<W: WordCatalog> {
    session: RoomSession,
    timer: PhaseTimer<RoomCommand>,
    senders: HashMap<PlayerId, PlayerSender>,
    catalog: Arc<W>,
    updates: mpsc::UnboundedSender<RoomUpdate>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<W: WordCatalog> RoomActor<W> {
    async fn run(&mut self) {
        while let Some(command) = self.receiver.recv().await {
            match command {
                RoomCommand::Join { player, name, sender, reply } => {
                    let result = self.session.join(player, &name);
                    let result = match result {
                        Ok(effects) => {
                            self.senders.insert(player, sender);
                            let replay = !effects.changed;
                            self.apply(effects);
                            if replay {
                                // Rejoin over a fresh channel with no state
                                // change: still hand the joiner the current
                                // state.
                                let snapshot = self.session.snapshot();
                                if let Some(sender) = self.senders.get(&player) {
                                    let _ = sender.send(ServerNotification::RoomState {
                                        snapshot: snapshot.redacted_for(player),
                                    });
                                }
                            }
                            Ok(())
                        }
                        Err(error) => Err(error),
                    };
                    let _ = reply.send(result);
                }
                RoomCommand::Act { player, action, observed_version, reply } => {
                    let name = action.name();
                    let result = self.handle_action(player, action, observed_version).await;
                    if let Err(error) = &result {
                        debug!(
                            room = %self.session.code(),
                            %player,
                            action = name,
                            %error,
                            "action rejected"
                        );
                    }
                    let _ = reply.send(result);
                }
                RoomCommand::SetConnected { player, connected } => {
                    match self.session.set_connected(player, connected, now_ms()) {
                        Ok(effects) => self.apply(effects),
                        Err(error) => {
                            trace!(room = %self.session.code(), %player, %error, "stale connection update");
                        }
                    }
                }
                RoomCommand::TimerExpired { generation } => {
                    if generation != self.timer.generation() {
                        trace!(
                            room = %self.session.code(),
                            generation,
                            current = self.timer.generation(),
                            "stale timer fire discarded"
                        );
                        continue;
                    }
                    let effects = self.session.timer_expired(now_ms());
                    self.apply(effects);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(RoomInfo {
                        code: self.session.code().clone(),
                        phase: self.session.phase(),
                        players: self.session.member_count(),
                        max_players: self.session.max_players(),
                        public: self.session.is_public(),
                        version: self.session.version(),
                    });
                }
                RoomCommand::Shutdown => {
                    self.timer.cancel();
                    let _ = self.updates.send(RoomUpdate::Closed(self.session.code().clone()));
                    return;
                }
            }

            if self.session.is_closed() {
                let _ = self.updates.send(RoomUpdate::Closed(self.session.code().clone()));
                return;
            }
        }
    }

    async fn handle_action(
        &mut self,
        player: PlayerId,
        action: ClientAction,
        observed_version: Option<u64>,
    ) -> Result<(), ActionError> {
        if let Some(observed) = observed_version {
            if observed != self.session.version() {
                // Informational only; the session is the source of truth.
                debug!(
                    room = %self.session.code(),
                    %player,
                    observed,
                    current = self.session.version(),
                    "action carried a stale version"
                );
            }
        }

        let effects = match action {
            ClientAction::LeaveRoom => {
                let effects = self.session.leave(player, now_ms())?;
                self.senders.remove(&player);
                effects
            }
            ClientAction::Ready => self.session.toggle_ready(player)?,
            ClientAction::StartGame { options } => {
                self.session.ensure_can_start(player)?;
                if let Some(options) = &options {
                    self.session.apply_start_options(options);
                }

                let card = self
                    .catalog
                    .random_word(self.session.category(), self.session.last_word())
                    .await
                    .map_err(|error| {
                        warn!(room = %self.session.code(), %error, "word draw failed");
                        ActionError::WordUnavailable(error.to_string())
                    })?;

                let seed = rand::random::<u64>();
                let assignment = assign_roles(
                    &self.session.member_ids(),
                    self.session.role_options(),
                    self.session.last_impostor(),
                    seed,
                    card,
                )
                .map_err(|error| match error {
                    GameError::InsufficientPlayers { have, .. } => {
                        ActionError::InsufficientPlayers { have }
                    }
                })?;

                info!(
                    room = %self.session.code(),
                    round = self.session.round() + 1,
                    players = self.session.member_count(),
                    "round starting"
                );
                self.session.begin_round(assignment, now_ms())
            }
            ClientAction::RequestVoting => self.session.request_voting(player, now_ms())?,
            ClientAction::Vote { target } => self.session.vote(player, target, now_ms())?,
            ClientAction::PlayAgain => self.session.play_again(player)?,
        };

        self.apply(effects);
        Ok(())
    }

    /// Applies one mutation's effects: timer op, ordered notifications,
    /// then the personalized snapshot broadcast and sync propagation.
    fn apply(&mut self, effects: Effects) {
        match effects.timer {
            TimerOp::Keep => {}
            TimerOp::Arm(delay) => {
                let generation = self.timer.arm(delay);
                trace!(room = %self.session.code(), ?delay, generation, "phase timer armed");
            }
            TimerOp::Cancel => self.timer.cancel(),
        }

        for (recipient, notification) in effects.events {
            self.dispatch(&recipient, &notification);
        }

        if effects.changed {
            self.publish_state();
        }
    }

    /// Sends every member their own redacted view of the new state and
    /// hands the authoritative snapshot to the sync layer.
    fn publish_state(&mut self) {
        let snapshot = self.session.snapshot();
        self.senders.retain(|player, sender| {
            sender
                .send(ServerNotification::RoomState { snapshot: snapshot.redacted_for(*player) })
                .is_ok()
        });
        let _ = self.updates.send(RoomUpdate::Changed(snapshot));
    }

    fn dispatch(&mut self, recipient: &Recipient, notification: &ServerNotification) {
        match recipient {
            Recipient::All => {
                self.senders.retain(|_, sender| sender.send(notification.clone()).is_ok());
            }
            Recipient::Player(player) => {
                let dead = self
                    .senders
                    .get(player)
                    .is_some_and(|sender| sender.send(notification.clone()).is_err());
                if dead {
                    self.senders.remove(player);
                }
            }
            Recipient::AllExcept(player) => {
                let excluded = *player;
                self.senders.retain(|id, sender| {
                    *id == excluded || sender.send(notification.clone()).is_ok()
                });
            }
        }
    }
}

/// Wall-clock epoch milliseconds.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

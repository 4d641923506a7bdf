//! The orchestrator: one instance's front door.
//!
//! Wires the room registry, the interest registry, and the sync bridge
//! together behind a single object a gateway can call. The registry
//! mutex guards only code allocation and handle lookup; all game state
//! mutation stays inside the per-room actors.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::info;
use wordspy_game::WordCatalog;
use wordspy_protocol::{ActionEnvelope, PlayerId, RoomCode, ServerNotification};
use wordspy_room::{
    ActionError, PhaseSchedule, PlayerSender, RegistryConfig, RoomInfo, RoomOptions, RoomRegistry,
};
use wordspy_sync::{
    spawn_bridge, ChangeBus, InterestRegistry, SnapshotStore, SyncBridgeConfig, SyncBridgeHandle,
};

use crate::{Authenticator, WordspyError};

/// Everything tunable about one instance.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub registry: RegistryConfig,
    pub schedule: PhaseSchedule,
    pub sync: SyncBridgeConfig,
}

/// One instance of the room service.
pub struct Orchestrator<W, S, A>
where
    W: WordCatalog,
    S: SnapshotStore,
    A: Authenticator,
{
    registry: Mutex<RoomRegistry<W>>,
    interest: Arc<InterestRegistry>,
    store: Arc<S>,
    auth: A,
    bridge: SyncBridgeHandle,
}

impl<W, S, A> Orchestrator<W, S, A>
where
    W: WordCatalog,
    S: SnapshotStore,
    A: Authenticator,
{
    /// Builds an instance and spawns its sync bridge.
    pub fn new<B: ChangeBus>(
        catalog: Arc<W>,
        store: Arc<S>,
        bus: Arc<B>,
        auth: A,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let interest = Arc::new(InterestRegistry::new());
        let bridge = spawn_bridge(
            Arc::clone(&store),
            bus,
            Arc::clone(&interest),
            updates_rx,
            config.sync,
        );
        let registry = RoomRegistry::new(config.registry, config.schedule, catalog, updates_tx);

        info!(instance_id = bridge.instance_id(), "orchestrator up");
        Arc::new(Self { registry: Mutex::new(registry), interest, store, auth, bridge })
    }

    /// This process's sync identity.
    pub fn instance_id(&self) -> u64 {
        self.bridge.instance_id()
    }

    /// Resolves a client token to a player identity.
    pub async fn connect(&self, token: &str) -> Result<PlayerId, WordspyError> {
        Ok(self.auth.validate(token).await?)
    }

    /// Opens a room hosted on this instance.
    pub async fn create_room(
        &self,
        host: PlayerId,
        name: String,
        sender: PlayerSender,
        options: RoomOptions,
    ) -> Result<RoomCode, WordspyError> {
        let code = self.registry.lock().await.create_room(host, name, sender, options)?;
        Ok(code)
    }

    /// Joins a room hosted on this instance.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        player: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), WordspyError> {
        self.registry.lock().await.join_room(code, player, name, sender).await?;
        Ok(())
    }

    /// Routes a player action to its room.
    pub async fn dispatch(
        &self,
        player: PlayerId,
        envelope: ActionEnvelope,
    ) -> Result<(), WordspyError> {
        let handle = self.registry.lock().await.get(&envelope.room)?.clone();
        handle.act(player, envelope.action, envelope.observed_version).await?;
        Ok(())
    }

    /// Subscribes `player` to pushes for a room, wherever it is hosted,
    /// delivering the latest known state immediately.
    pub async fn watch_room(
        &self,
        code: &RoomCode,
        player: PlayerId,
        sender: PlayerSender,
    ) -> Result<(), WordspyError> {
        match self.store.get(code).await? {
            Some(snapshot) => {
                let _ = sender.send(ServerNotification::RoomState {
                    snapshot: snapshot.redacted_for(player),
                });
                self.interest.watch(code.clone(), player, sender);
                Ok(())
            }
            None => {
                // A freshly created local room may not have hit the
                // store yet; its first persisted change will reach the
                // watcher through the bridge.
                let local = self.registry.lock().await.get(code).is_ok();
                if local {
                    self.interest.watch(code.clone(), player, sender);
                    Ok(())
                } else {
                    Err(ActionError::RoomNotFound(code.clone()).into())
                }
            }
        }
    }

    pub fn unwatch_room(&self, code: &RoomCode, player: PlayerId) {
        self.interest.unwatch(code, player);
    }

    /// Flags a member's transport connection state.
    pub async fn set_connected(
        &self,
        code: &RoomCode,
        player: PlayerId,
        connected: bool,
    ) -> Result<(), WordspyError> {
        let handle = self.registry.lock().await.get(code)?.clone();
        handle.set_connected(player, connected).await?;
        Ok(())
    }

    /// Public rooms hosted on this instance.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        self.registry.lock().await.list_public().await
    }

    /// Stops accepting new rooms and joins; live rooms play out.
    pub async fn begin_drain(&self) {
        self.registry.lock().await.begin_drain();
    }

    /// Hard stop: closes every room and the bridge.
    pub async fn shutdown(&self) {
        self.registry.lock().await.shutdown_all().await;
        self.bridge.shutdown();
    }
}

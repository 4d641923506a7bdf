//! The room registry: code allocation, lookup, and lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wordspy_game::{WordCatalog, MIN_PLAYERS};
use wordspy_protocol::{PlayerId, RoomCode, RoomUpdate};

use crate::room::{spawn_room, PlayerSender, RoomHandle, RoomInfo};
use crate::{ActionError, PhaseSchedule, RoomOptions};

/// Characters used in room codes. Skips 0/O/1/I to keep codes readable
/// over voice chat.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 4;
const CODE_ATTEMPTS: usize = 16;

/// Registry-level limits.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Hard cap on simultaneously open rooms.
    pub max_rooms: usize,
    /// Upper bound any room's `max_players` is clamped to.
    pub max_players_cap: usize,
    /// Command channel depth per room actor.
    pub room_channel_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_rooms: 256, max_players_cap: 12, room_channel_size: 64 }
    }
}

/// Owns every live room handle on this process.
///
/// The registry itself is not a synchronization point for game state -
/// each room actor serializes its own mutations. The registry only
/// allocates codes, routes to handles, and reaps rooms whose actors
/// have stopped.
pub struct RoomRegistry<W: WordCatalog> {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: RegistryConfig,
    schedule: PhaseSchedule,
    catalog: Arc<W>,
    updates: mpsc::UnboundedSender<RoomUpdate>,
    draining: bool,
}

impl<W: WordCatalog> RoomRegistry<W> {
    pub fn new(
        config: RegistryConfig,
        schedule: PhaseSchedule,
        catalog: Arc<W>,
        updates: mpsc::UnboundedSender<RoomUpdate>,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            schedule,
            catalog,
            updates,
            draining: false,
        }
    }

    /// Opens a room with a freshly allocated code and `host` as its
    /// first member.
    pub fn create_room(
        &mut self,
        host: PlayerId,
        host_name: String,
        host_sender: PlayerSender,
        mut options: RoomOptions,
    ) -> Result<RoomCode, ActionError> {
        if self.draining {
            return Err(ActionError::Draining);
        }
        self.reap_closed();
        if self.rooms.len() >= self.config.max_rooms {
            return Err(ActionError::ServerAtCapacity);
        }

        options.max_players = options.max_players.clamp(MIN_PLAYERS, self.config.max_players_cap);

        let code = self.allocate_code()?;
        let handle = spawn_room(
            code.clone(),
            host,
            host_name,
            host_sender,
            options,
            self.schedule,
            Arc::clone(&self.catalog),
            self.updates.clone(),
            self.config.room_channel_size,
        );
        self.rooms.insert(code.clone(), handle);
        info!(room = %code, %host, open = self.rooms.len(), "room created");
        Ok(code)
    }

    /// Routes a join to the room's actor.
    pub async fn join_room(
        &mut self,
        code: &RoomCode,
        player: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), ActionError> {
        if self.draining {
            return Err(ActionError::Draining);
        }
        self.get(code)?.join(player, name, sender).await
    }

    /// The handle for a live room.
    pub fn get(&self, code: &RoomCode) -> Result<&RoomHandle, ActionError> {
        self.rooms
            .get(code)
            .filter(|handle| !handle.is_closed())
            .ok_or_else(|| ActionError::RoomNotFound(code.clone()))
    }

    /// Metadata for every public room, for the lobby listing.
    pub async fn list_public(&self) -> Vec<RoomInfo> {
        let mut listings = Vec::new();
        for handle in self.rooms.values() {
            if let Ok(info) = handle.info().await {
                if info.public {
                    listings.push(info);
                }
            }
        }
        listings.sort_by(|a, b| a.code.as_str().cmp(b.code.as_str()));
        listings
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Stops accepting new rooms and joins; existing rooms play out.
    pub fn begin_drain(&mut self) {
        if !self.draining {
            self.draining = true;
            info!(open = self.rooms.len(), "registry draining");
        }
    }

    /// Asks every room actor to stop.
    pub async fn shutdown_all(&mut self) {
        self.begin_drain();
        for (code, handle) in self.rooms.drain() {
            if handle.shutdown().await.is_err() {
                debug!(room = %code, "room already stopped");
            }
        }
    }

    /// Drops handles whose actors have stopped.
    pub fn reap_closed(&mut self) {
        let before = self.rooms.len();
        self.rooms.retain(|_, handle| !handle.is_closed());
        let reaped = before - self.rooms.len();
        if reaped > 0 {
            debug!(reaped, open = self.rooms.len(), "reaped closed rooms");
        }
    }

    fn allocate_code(&self) -> Result<RoomCode, ActionError> {
        let mut rng = rand::rng();
        for attempt in 0..CODE_ATTEMPTS {
            let code: String = (0..CODE_LEN)
                .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
                .collect();
            let code = RoomCode::new(code);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
            debug!(%code, attempt, "room code collision, retrying");
        }
        // The code space holds over a million entries; exhausting the
        // retries means the registry is effectively full.
        warn!(open = self.rooms.len(), "room code allocation exhausted retries");
        Err(ActionError::ServerAtCapacity)
    }
}

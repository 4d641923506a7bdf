//! Wordspy: a room session orchestrator for a live social deduction
//! word game.
//!
//! Players gather in short-code rooms, get dealt secret roles around a
//! secret word, talk, and vote out the suspected Impostor. This crate
//! wires the pieces together:
//!
//! - [`wordspy_protocol`] - wire types, snapshots, redaction
//! - [`wordspy_game`] - pure rules: role deal, tally, word catalog
//! - [`wordspy_room`] - per-room actors, phase timers, and the registry
//! - [`wordspy_sync`] - cross-instance store and change propagation
//!
//! [`Orchestrator`] is the front door a gateway calls.

mod auth;
mod error;
mod orchestrator;

pub use auth::{AuthError, Authenticator, TokenMap};
pub use error::WordspyError;
pub use orchestrator::{Orchestrator, OrchestratorConfig};

pub use wordspy_game::{MemoryCatalog, WordCard, WordCatalog};
pub use wordspy_protocol::{
    ActionEnvelope, ClientAction, ClientSnapshot, ErrorCode, Phase, PlayerId, Role, RoomCode,
    ServerNotification, StartOptions, StateSnapshot, Verdict, Winner,
};
pub use wordspy_room::{PhaseSchedule, PlayerSender, RegistryConfig, RoomInfo, RoomOptions};
pub use wordspy_sync::{ChangeBus, MemoryBus, MemoryStore, SnapshotStore, SyncBridgeConfig};

/// Installs the global tracing subscriber, honoring `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}

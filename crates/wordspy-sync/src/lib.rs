//! Cross-instance state propagation for Wordspy.
//!
//! Rooms are owned by exactly one instance; peers observe them through
//! a shared [`SnapshotStore`] plus a [`ChangeBus`] of small
//! announcements. The [`spawn_bridge`] tasks tie the two to the room
//! layer's update stream. Everything is versioned and deliveries only
//! move forward, so the whole layer is idempotent under duplicated or
//! reordered notices.

#![allow(async_fn_in_trait)]

mod bridge;
mod bus;
mod error;
mod store;

pub use bridge::{spawn_bridge, InterestRegistry, SyncBridgeConfig, SyncBridgeHandle};
pub use bus::{ChangeBus, ChangeNotice, MemoryBus};
pub use error::SyncError;
pub use store::{MemoryStore, PutOutcome, SnapshotStore};

//! The change notification bus.
//!
//! After persisting a snapshot, an instance publishes a small
//! [`ChangeNotice`] so peer instances know to re-read the store. The
//! notice carries no game state - peers always fetch the authoritative
//! snapshot, so a lost or reordered notice can delay a delivery but
//! never corrupt one.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use wordspy_protocol::RoomCode;

use crate::SyncError;

/// A room-changed announcement between instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// The publishing instance, so it can skip its own notices.
    pub origin: u64,
    pub code: RoomCode,
    /// The version the publisher wrote. Receivers deliver only
    /// strictly newer versions, which makes duplicates harmless.
    pub version: u64,
    /// The room closed; there is nothing left to fetch.
    pub closed: bool,
}

/// Publish/subscribe transport for [`ChangeNotice`]s.
pub trait ChangeBus: Send + Sync + 'static {
    fn publish(&self, notice: ChangeNotice) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// A fresh subscription receiving every notice published after this
    /// call.
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice>;
}

/// An in-process bus for single-machine deployments and tests.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    sender: broadcast::Sender<ChangeNotice>,
}

impl MemoryBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeBus for MemoryBus {
    async fn publish(&self, notice: ChangeNotice) -> Result<(), SyncError> {
        // No subscribers is fine; a single-instance deployment never
        // listens to its own bus.
        let _ = self.sender.send(notice);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.sender.subscribe()
    }
}

// =========================================================================
// Tests
// =========================================================================

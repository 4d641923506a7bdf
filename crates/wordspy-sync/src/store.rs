//! The shared snapshot store boundary.
//!
//! Each room's latest [`StateSnapshot`] lives in a store shared by all
//! instances, keyed by room code. Writes are conditional on version:
//! only a strictly newer snapshot replaces a stored one, so instances
//! racing on the same room can never roll state backwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use wordspy_protocol::{RoomCode, StateSnapshot};

use crate::SyncError;

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The snapshot is now the stored state.
    Stored,
    /// A snapshot at `latest` (>= the offered version) is already
    /// stored; the write was discarded.
    Conflict { latest: u64 },
}

/// Shared persistence for room snapshots.
///
/// Implementations may sit on a remote key-value service; the trait is
/// async for that reason.
pub trait SnapshotStore: Send + Sync + 'static {
    /// The stored snapshot for a room, if any.
    fn get(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<StateSnapshot>, SyncError>> + Send;

    /// Stores `snapshot` unless the stored version is already equal or
    /// newer.
    fn put(
        &self,
        snapshot: &StateSnapshot,
    ) -> impl Future<Output = Result<PutOutcome, SyncError>> + Send;

    /// Removes a closed room's snapshot.
    fn remove(&self, code: &RoomCode) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// An in-process store for single-instance deployments and tests.
///
/// Snapshots are held as encoded bytes, same as a remote store would
/// hold them, so codec errors surface here too rather than only in
/// production.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<RoomCode, (u64, Vec<u8>)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    async fn get(&self, code: &RoomCode) -> Result<Option<StateSnapshot>, SyncError> {
        let bytes = {
            let entries = self.entries.lock().expect("store lock poisoned");
            entries.get(code).map(|(_, bytes)| bytes.clone())
        };
        match bytes {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, snapshot: &StateSnapshot) -> Result<PutOutcome, SyncError> {
        let bytes = serde_json::to_vec(snapshot)?;
        let mut entries = self.entries.lock().expect("store lock poisoned");
        match entries.get(&snapshot.code) {
            Some((stored, _)) if *stored >= snapshot.version => {
                Ok(PutOutcome::Conflict { latest: *stored })
            }
            _ => {
                entries.insert(snapshot.code.clone(), (snapshot.version, bytes));
                Ok(PutOutcome::Stored)
            }
        }
    }

    async fn remove(&self, code: &RoomCode) -> Result<(), SyncError> {
        self.entries.lock().expect("store lock poisoned").remove(code);
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wordspy_protocol::{Phase, PlayerId};

    fn snapshot(version: u64) -> StateSnapshot {
        StateSnapshot {
            code: RoomCode::new("AB12"),
            version,
            host: PlayerId(1),
            phase: Phase::Waiting,
            deadline_ms: None,
            round: 0,
            public: true,
            max_players: 8,
            members: vec![],
            assignment: None,
            votes: HashMap::new(),
            outcome: None,
        }
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let store = MemoryStore::new();
        assert_eq!(store.put(&snapshot(1)).await.unwrap(), PutOutcome::Stored);
        let loaded = store.get(&RoomCode::new("AB12")).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_put_older_or_equal_version_conflicts() {
        let store = MemoryStore::new();
        store.put(&snapshot(5)).await.unwrap();

        assert_eq!(
            store.put(&snapshot(5)).await.unwrap(),
            PutOutcome::Conflict { latest: 5 }
        );
        assert_eq!(
            store.put(&snapshot(3)).await.unwrap(),
            PutOutcome::Conflict { latest: 5 }
        );
        // State never rolls backwards.
        let loaded = store.get(&RoomCode::new("AB12")).await.unwrap().unwrap();
        assert_eq!(loaded.version, 5);
    }

    #[tokio::test]
    async fn test_put_newer_version_replaces() {
        let store = MemoryStore::new();
        store.put(&snapshot(1)).await.unwrap();
        assert_eq!(store.put(&snapshot(2)).await.unwrap(), PutOutcome::Stored);
        let loaded = store.get(&RoomCode::new("AB12")).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
    }

    #[tokio::test]
    async fn test_remove_clears_entry() {
        let store = MemoryStore::new();
        store.put(&snapshot(1)).await.unwrap();
        store.remove(&RoomCode::new("AB12")).await.unwrap();
        assert!(store.get(&RoomCode::new("AB12")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing_room_is_none() {
        let store = MemoryStore::new();
        assert!(store.get(&RoomCode::new("ZZZZ")).await.unwrap().is_none());
    }
}

//! The sync bridge: persists room changes and replays peers' changes.
//!
//! Two tasks per instance. The outbound task drains the room layer's
//! update stream, writes each snapshot to the shared store, announces
//! it on the bus, and serves local watchers. The inbound task consumes
//! peer announcements, re-reads the store, and fans the redacted state
//! out to whoever is watching that room here. Deliveries are keyed on
//! version and only ever move forward, so duplicated or reordered
//! notices are no-ops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use wordspy_protocol::{
    Phase, PlayerId, RoomCode, RoomUpdate, ServerNotification, StateSnapshot,
};

use crate::{ChangeBus, ChangeNotice, PutOutcome, SnapshotStore};

// ---------------------------------------------------------------------------
// Interest registry
// ---------------------------------------------------------------------------

/// Who on this instance wants pushes for which room.
///
/// The room actor serves its own joined members directly; this registry
/// serves everyone else - players whose room lives on another instance,
/// and lobby clients previewing a room. Dead senders are pruned on
/// delivery.
#[derive(Debug, Default)]
pub struct InterestRegistry {
    watchers: Mutex<HashMap<RoomCode, HashMap<PlayerId, mpsc::UnboundedSender<ServerNotification>>>>,
}

impl InterestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(
        &self,
        code: RoomCode,
        player: PlayerId,
        sender: mpsc::UnboundedSender<ServerNotification>,
    ) {
        let mut watchers = self.watchers.lock().expect("interest lock poisoned");
        watchers.entry(code).or_default().insert(player, sender);
    }

    pub fn unwatch(&self, code: &RoomCode, player: PlayerId) {
        let mut watchers = self.watchers.lock().expect("interest lock poisoned");
        if let Some(room) = watchers.get_mut(code) {
            room.remove(&player);
            if room.is_empty() {
                watchers.remove(code);
            }
        }
    }

    /// Pushes each watcher their own redacted view of `snapshot`.
    pub fn deliver(&self, snapshot: &StateSnapshot) {
        let mut watchers = self.watchers.lock().expect("interest lock poisoned");
        if let Some(room) = watchers.get_mut(&snapshot.code) {
            room.retain(|player, sender| {
                sender
                    .send(ServerNotification::RoomState {
                        snapshot: snapshot.redacted_for(*player),
                    })
                    .is_ok()
            });
            if room.is_empty() {
                watchers.remove(&snapshot.code);
            }
        }
    }

    /// Tells every watcher the room is gone and drops the interest.
    pub fn close(&self, code: &RoomCode) {
        let mut watchers = self.watchers.lock().expect("interest lock poisoned");
        if let Some(room) = watchers.remove(code) {
            for sender in room.values() {
                let _ = sender.send(ServerNotification::PhaseChange {
                    phase: Phase::Closed,
                    deadline_ms: None,
                });
            }
        }
    }

    pub fn watcher_count(&self, code: &RoomCode) -> usize {
        self.watchers
            .lock()
            .expect("interest lock poisoned")
            .get(code)
            .map_or(0, HashMap::len)
    }
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Retry policy for the outbound path, covering both store writes and
/// notice publishes.
#[derive(Debug, Clone)]
pub struct SyncBridgeConfig {
    pub retry_attempts: usize,
    /// Base backoff; doubles per retry, capped at one second.
    pub retry_backoff: Duration,
}

impl Default for SyncBridgeConfig {
    fn default() -> Self {
        Self { retry_attempts: 3, retry_backoff: Duration::from_millis(50) }
    }
}

/// A running bridge's tasks.
#[derive(Debug)]
pub struct SyncBridgeHandle {
    instance_id: u64,
    outbound: JoinHandle<()>,
    inbound: JoinHandle<()>,
}

impl SyncBridgeHandle {
    /// This process's random identity, used to skip its own notices.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn shutdown(&self) {
        self.outbound.abort();
        self.inbound.abort();
    }
}

/// Spawns the outbound and inbound bridge tasks.
pub fn spawn_bridge<S, B>(
    store: Arc<S>,
    bus: Arc<B>,
    interest: Arc<InterestRegistry>,
    updates: mpsc::UnboundedReceiver<RoomUpdate>,
    config: SyncBridgeConfig,
) -> SyncBridgeHandle
where
    S: SnapshotStore,
    B: ChangeBus,
{
    let instance_id = rand::random::<u64>();
    let outbound = tokio::spawn(outbound_task(
        Arc::clone(&store),
        Arc::clone(&bus),
        Arc::clone(&interest),
        updates,
        config,
        instance_id,
    ));
    let inbound = tokio::spawn(inbound_task(store, bus, interest, instance_id));
    SyncBridgeHandle { instance_id, outbound, inbound }
}

/// Persists local room changes and announces them to peers.
async fn outbound_task<S: SnapshotStore, B: ChangeBus>(
    store: Arc<S>,
    bus: Arc<B>,
    interest: Arc<InterestRegistry>,
    mut updates: mpsc::UnboundedReceiver<RoomUpdate>,
    config: SyncBridgeConfig,
    instance_id: u64,
) {
    while let Some(update) = updates.recv().await {
        match update {
            RoomUpdate::Changed(snapshot) => {
                // Local watchers see the change whether or not the
                // store is reachable.
                interest.deliver(&snapshot);

                if !persist_with_retry(store.as_ref(), &snapshot, &config).await {
                    continue;
                }
                let notice = ChangeNotice {
                    origin: instance_id,
                    code: snapshot.code.clone(),
                    version: snapshot.version,
                    closed: false,
                };
                publish_with_retry(bus.as_ref(), notice, &config).await;
            }
            RoomUpdate::Closed(code) => {
                interest.close(&code);
                if let Err(error) = store.remove(&code).await {
                    warn!(room = %code, %error, "snapshot removal failed");
                }
                let notice =
                    ChangeNotice { origin: instance_id, code: code.clone(), version: u64::MAX, closed: true };
                publish_with_retry(bus.as_ref(), notice, &config).await;
            }
        }
    }
    debug!(instance_id, "sync outbound stopped");
}

/// Doubling delay for transient store and bus failures, capped at one
/// second.
struct Backoff {
    delay: Duration,
}

impl Backoff {
    fn new(config: &SyncBridgeConfig) -> Self {
        Self { delay: config.retry_backoff }
    }

    async fn wait(&mut self) {
        tokio::time::sleep(self.delay).await;
        self.delay = (self.delay * 2).min(Duration::from_secs(1));
    }
}

/// Writes `snapshot` to the store, retrying transient failures.
/// Returns `false` when the write was abandoned - either a peer
/// already stored something newer, or retries ran out.
async fn persist_with_retry<S: SnapshotStore>(
    store: &S,
    snapshot: &StateSnapshot,
    config: &SyncBridgeConfig,
) -> bool {
    let mut backoff = Backoff::new(config);
    for attempt in 0..=config.retry_attempts {
        match store.put(snapshot).await {
            Ok(PutOutcome::Stored) => return true,
            Ok(PutOutcome::Conflict { latest }) => {
                trace!(
                    room = %snapshot.code,
                    version = snapshot.version,
                    latest,
                    "snapshot superseded in store"
                );
                return false;
            }
            Err(error) => {
                warn!(
                    room = %snapshot.code,
                    version = snapshot.version,
                    attempt,
                    %error,
                    "snapshot write failed"
                );
                if attempt < config.retry_attempts {
                    backoff.wait().await;
                }
            }
        }
    }
    // In-memory state remains authoritative; the next accepted
    // mutation produces a newer snapshot and tries again.
    warn!(room = %snapshot.code, version = snapshot.version, "snapshot write abandoned");
    false
}

/// Publishes `notice`, retrying transient bus failures. An abandoned
/// notice delays peer deliveries until the next change; the store
/// already holds the authoritative snapshot.
async fn publish_with_retry<B: ChangeBus>(
    bus: &B,
    notice: ChangeNotice,
    config: &SyncBridgeConfig,
) {
    let mut backoff = Backoff::new(config);
    for attempt in 0..=config.retry_attempts {
        match bus.publish(notice.clone()).await {
            Ok(()) => return,
            Err(error) => {
                warn!(
                    room = %notice.code,
                    version = notice.version,
                    attempt,
                    %error,
                    "change notice publish failed"
                );
                if attempt < config.retry_attempts {
                    backoff.wait().await;
                }
            }
        }
    }
    warn!(room = %notice.code, version = notice.version, "change notice abandoned");
}

/// Replays peers' changes to local watchers.
async fn inbound_task<S: SnapshotStore, B: ChangeBus>(
    store: Arc<S>,
    bus: Arc<B>,
    interest: Arc<InterestRegistry>,
    instance_id: u64,
) {
    let mut notices = bus.subscribe();
    // Highest version delivered per room. Duplicated notices and
    // out-of-order arrivals fall out here.
    let mut delivered: HashMap<RoomCode, u64> = HashMap::new();

    loop {
        let notice = match notices.recv().await {
            Ok(notice) => notice,
            Err(RecvError::Lagged(missed)) => {
                // Notices are only hints; the next fetch reads the
                // latest snapshot anyway.
                warn!(missed, "change bus lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        if notice.origin == instance_id {
            continue;
        }
        if notice.closed {
            interest.close(&notice.code);
            delivered.remove(&notice.code);
            continue;
        }
        if delivered.get(&notice.code).is_some_and(|seen| notice.version <= *seen) {
            trace!(room = %notice.code, version = notice.version, "stale notice skipped");
            continue;
        }

        match store.get(&notice.code).await {
            Ok(Some(snapshot)) => {
                if delivered.get(&notice.code).is_some_and(|seen| snapshot.version <= *seen) {
                    continue;
                }
                delivered.insert(notice.code.clone(), snapshot.version);
                interest.deliver(&snapshot);
            }
            Ok(None) => {
                debug!(room = %notice.code, "notice for a room missing from the store");
            }
            Err(error) => {
                warn!(room = %notice.code, %error, "snapshot fetch failed");
            }
        }
    }
    debug!(instance_id, "sync inbound stopped");
}

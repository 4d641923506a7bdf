//! Single-shot phase timer for Wordspy room actors.
//!
//! Each room has at most one pending expiry at a time. The timer never
//! calls into room state directly: when it fires it sends a regular
//! message into the room's own command channel, so the expiry is
//! serialized with player actions and all ordering reasoning holds
//! uniformly.
//!
//! # Generations
//!
//! Every [`arm`](PhaseTimer::arm) and [`cancel`](PhaseTimer::cancel)
//! bumps a generation counter, and a fire carries the generation it was
//! armed with. A fire whose generation no longer matches
//! [`generation()`](PhaseTimer::generation) raced with a rearm or
//! cancel and must be dropped by the receiver. Combined with the task
//! abort in `cancel`, a fire is delivered at most once per arm and a
//! cancelled fire is a no-op.
//!
//! # Integration
//!
//! ```ignore
//! let mut timer = PhaseTimer::new(cmd_tx.clone(), |generation| {
//!     RoomCommand::TimerExpired { generation }
//! });
//! timer.arm(Duration::from_secs(10));
//! // ... in the actor loop:
//! RoomCommand::TimerExpired { generation } if generation == timer.generation() => { ... }
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Schedules at most one pending expiry, delivered as a message of
/// type `M` into the owning actor's command channel.
pub struct PhaseTimer<M: Send + 'static> {
    sender: mpsc::Sender<M>,
    wrap: fn(u64) -> M,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl<M: Send + 'static> PhaseTimer<M> {
    /// Creates an unarmed timer. `wrap` turns a generation number into
    /// the actor's expiry message.
    pub fn new(sender: mpsc::Sender<M>, wrap: fn(u64) -> M) -> Self {
        Self { sender, wrap, generation: 0, pending: None }
    }

    /// Arms the timer, replacing any pending expiry.
    ///
    /// Returns the new generation. After `delay`, `wrap(generation)` is
    /// sent into the channel; the send is best-effort - if the actor is
    /// gone the fire is silently dropped.
    pub fn arm(&mut self, delay: Duration) -> u64 {
        self.abort_pending();
        self.generation += 1;
        let generation = self.generation;
        let sender = self.sender.clone();
        let wrap = self.wrap;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(generation, "phase timer fired");
            let _ = sender.send(wrap(generation)).await;
        }));

        generation
    }

    /// Cancels any pending expiry.
    ///
    /// Also bumps the generation, so a fire that already left the timer
    /// task but has not yet been processed is recognizably stale.
    pub fn cancel(&mut self) {
        self.abort_pending();
        self.generation += 1;
    }

    /// The generation of the most recent arm/cancel. A received fire is
    /// current only if its generation equals this value.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an expiry is (or was) scheduled and not yet cancelled.
    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<M: Send + 'static> Drop for PhaseTimer<M> {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

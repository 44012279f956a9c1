//! In-process fan-out of snapshots to room subscribers.
//!
//! [`Relay`] is an observer registry keyed by room name. Each room is one
//! bounded [`broadcast`] channel: publishing hands the snapshot to every
//! subscriber currently registered in that room, and there is no backlog, so
//! a late subscriber only sees what is published after it joined.
//!
//! A subscriber that falls more than the room capacity behind skips straight
//! to the newest snapshot. Every snapshot is complete, so nothing a screen
//! needs is lost.
//!
//! ```
//! # use bingo_relay::relay::{Relay, DEFAULT_ROOM};
//! # use bingo_relay::protocol::Snapshot;
//! let relay = Relay::new();
//! let mut screen = relay.subscribe(DEFAULT_ROOM);
//! relay.publish(DEFAULT_ROOM, Snapshot::from_value(serde_json::json!({"running": true})));
//! assert!(screen.try_recv().is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::caller::Publisher;
use crate::error::Result;
use crate::protocol::Snapshot;

/// The single room every caller and screen shares unless configured otherwise.
pub const DEFAULT_ROOM: &str = "game";

/// Snapshots a room holds for its slowest subscriber before it starts
/// skipping ahead.
pub const DEFAULT_ROOM_CAPACITY: usize = 1024;

/// Identifies one subscription inside a room.
pub type SubscriberId = Uuid;

type Rooms = HashMap<String, broadcast::Sender<Snapshot>>;

fn lock(rooms: &Mutex<Rooms>) -> MutexGuard<'_, Rooms> {
    // The registry holds no invariant a panicking holder could break.
    rooms.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable handle to the shared subscriber registry.
#[derive(Clone)]
pub struct Relay {
    rooms: Arc<Mutex<Rooms>>,
    capacity: usize,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    /// Create an empty relay with [`DEFAULT_ROOM_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ROOM_CAPACITY)
    }

    /// Create an empty relay whose rooms buffer up to `capacity` snapshots.
    /// Clamped to at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    /// Snapshots each room buffers for its slowest subscriber.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register a new subscriber in `room`.
    ///
    /// The subscription receives snapshots published to `room` from now on,
    /// in publish order, until it is dropped.
    pub fn subscribe(&self, room: impl Into<String>) -> Subscription {
        let room = room.into();
        let id = Uuid::new_v4();

        let rx = lock(&self.rooms)
            .entry(room.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(%id, room = %room, "subscriber joined");

        Subscription {
            id,
            room,
            rx,
            rooms: Arc::downgrade(&self.rooms),
        }
    }

    /// Hand `snapshot` to every current subscriber of `room`.
    ///
    /// Never blocks. Returns how many subscribers it was handed to.
    pub fn publish(&self, room: &str, snapshot: Snapshot) -> usize {
        let mut rooms = lock(&self.rooms);
        let Some(sender) = rooms.get(room) else {
            trace!(room = %room, "publish to empty room");
            return 0;
        };

        match sender.send(snapshot) {
            Ok(delivered) => {
                trace!(room = %room, delivered, "snapshot published");
                delivered
            }
            Err(_) => {
                debug!(room = %room, "no subscribers left, closing room");
                rooms.remove(room);
                0
            }
        }
    }

    /// Number of subscribers currently registered in `room`.
    pub fn subscriber_count(&self, room: &str) -> usize {
        lock(&self.rooms)
            .get(room)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// A [`Publisher`] that publishes into `room` of this relay.
    pub fn publisher(&self, room: impl Into<String>) -> RoomPublisher {
        RoomPublisher {
            relay: self.clone(),
            room: room.into(),
        }
    }
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rooms = lock(&self.rooms);
        let mut map = f.debug_map();
        for (room, sender) in rooms.iter() {
            map.entry(room, &sender.receiver_count());
        }
        map.finish()
    }
}

// ── Subscription ────────────────────────────────────────────────────

/// A live registration in one room. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    room: String,
    rx: broadcast::Receiver<Snapshot>,
    rooms: Weak<Mutex<Rooms>>,
}

impl Subscription {
    /// This subscription's id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// The room this subscription listens to.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Wait for the next snapshot.
    ///
    /// After falling behind, returns the newest snapshot and discards the
    /// ones in between. Returns `None` once the relay has been dropped and
    /// every buffered snapshot has been read. Cancel-safe.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    self.warn_lagged(skipped);
                    if let Some(latest) = self.skip_to_latest() {
                        return Some(latest);
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered snapshot without waiting.
    ///
    /// Skips to the newest snapshot after falling behind, like
    /// [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        match self.rx.try_recv() {
            Ok(snapshot) => Some(snapshot),
            Err(TryRecvError::Lagged(skipped)) => {
                self.warn_lagged(skipped);
                self.skip_to_latest()
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    /// Drain everything buffered and keep the last.
    fn skip_to_latest(&mut self) -> Option<Snapshot> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(TryRecvError::Lagged(skipped)) => self.warn_lagged(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return latest,
            }
        }
    }

    fn warn_lagged(&self, skipped: u64) {
        warn!(id = %self.id, room = %self.room, skipped, "subscriber fell behind, skipping to newest snapshot");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(rooms) = self.rooms.upgrade() else {
            return;
        };
        let mut rooms = lock(&rooms);
        // Our own receiver is still counted until this returns.
        if rooms
            .get(&self.room)
            .is_some_and(|sender| sender.receiver_count() <= 1)
        {
            rooms.remove(&self.room);
        }
        debug!(id = %self.id, room = %self.room, "subscriber left");
    }
}

// ── RoomPublisher ───────────────────────────────────────────────────

/// Publishes a caller's snapshots straight into a local [`Relay`] room.
#[derive(Debug, Clone)]
pub struct RoomPublisher {
    relay: Relay,
    room: String,
}

impl RoomPublisher {
    /// The room this publisher targets.
    pub fn room(&self) -> &str {
        &self.room
    }
}

impl Publisher for RoomPublisher {
    fn publish(&self, snapshot: Snapshot) -> Result<()> {
        self.relay.publish(&self.room, snapshot);
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(n: i64) -> Snapshot {
        Snapshot::from_value(json!({ "seq": n }))
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let relay = Relay::new();
        assert_eq!(relay.publish(DEFAULT_ROOM, snap(1)), 0);

        let mut late = relay.subscribe(DEFAULT_ROOM);
        assert!(late.try_recv().is_none());
    }

    #[test]
    fn every_subscriber_gets_every_snapshot_in_order() {
        let relay = Relay::new();
        let mut subs: Vec<_> = (0..3).map(|_| relay.subscribe(DEFAULT_ROOM)).collect();

        for n in 0..10 {
            assert_eq!(relay.publish(DEFAULT_ROOM, snap(n)), 3);
        }

        for sub in &mut subs {
            for n in 0..10 {
                assert_eq!(sub.try_recv().unwrap(), snap(n));
            }
            assert!(sub.try_recv().is_none());
        }
    }

    #[test]
    fn rooms_are_isolated() {
        let relay = Relay::new();
        let mut a = relay.subscribe("a");
        let mut b = relay.subscribe("b");

        relay.publish("a", snap(1));
        assert_eq!(a.try_recv().unwrap(), snap(1));
        assert!(b.try_recv().is_none());
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let relay = Relay::new();
        let sub = relay.subscribe(DEFAULT_ROOM);
        let other = relay.subscribe(DEFAULT_ROOM);
        assert_eq!(relay.subscriber_count(DEFAULT_ROOM), 2);

        drop(sub);
        assert_eq!(relay.subscriber_count(DEFAULT_ROOM), 1);
        drop(other);
        assert_eq!(relay.subscriber_count(DEFAULT_ROOM), 0);
        assert_eq!(relay.publish(DEFAULT_ROOM, snap(1)), 0);
    }

    #[test]
    fn subscription_outlives_relay() {
        let relay = Relay::new();
        let mut sub = relay.subscribe(DEFAULT_ROOM);
        relay.publish(DEFAULT_ROOM, snap(7));
        drop(relay);

        assert_eq!(sub.try_recv().unwrap(), snap(7));
        drop(sub);
    }

    #[tokio::test]
    async fn recv_ends_after_relay_dropped() {
        let relay = Relay::new();
        let mut sub = relay.subscribe(DEFAULT_ROOM);
        drop(relay);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn room_publisher_targets_its_room() {
        let relay = Relay::new();
        let mut sub = relay.subscribe("hall");
        let publisher = relay.publisher("hall");
        assert_eq!(publisher.room(), "hall");

        publisher.publish(snap(3)).unwrap();
        assert_eq!(sub.try_recv().unwrap(), snap(3));
    }

    #[test]
    fn stalled_subscriber_skips_to_newest_snapshot() {
        let relay = Relay::with_capacity(4);
        let mut stalled = relay.subscribe(DEFAULT_ROOM);
        let mut live = relay.subscribe(DEFAULT_ROOM);

        for n in 0..100 {
            relay.publish(DEFAULT_ROOM, snap(n));
            assert_eq!(live.try_recv().unwrap(), snap(n));
        }

        assert_eq!(stalled.try_recv().unwrap(), snap(99));
        assert!(stalled.try_recv().is_none());

        // Back in step afterwards.
        relay.publish(DEFAULT_ROOM, snap(100));
        assert_eq!(stalled.try_recv().unwrap(), snap(100));
    }

    #[tokio::test]
    async fn lagged_recv_returns_newest_snapshot() {
        let relay = Relay::with_capacity(2);
        let mut sub = relay.subscribe(DEFAULT_ROOM);
        for n in 0..10 {
            relay.publish(DEFAULT_ROOM, snap(n));
        }
        assert_eq!(sub.recv().await.unwrap(), snap(9));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn capacity_is_clamped_to_one() {
        let relay = Relay::with_capacity(0);
        assert_eq!(relay.capacity(), 1);
        let mut sub = relay.subscribe(DEFAULT_ROOM);
        relay.publish(DEFAULT_ROOM, snap(1));
        relay.publish(DEFAULT_ROOM, snap(2));
        assert_eq!(sub.try_recv().unwrap(), snap(2));
    }

    #[test]
    fn debug_lists_room_sizes() {
        let relay = Relay::new();
        let _sub = relay.subscribe(DEFAULT_ROOM);
        assert_eq!(format!("{relay:?}"), r#"{"game": 1}"#);
    }
}

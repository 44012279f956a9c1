//! The screen side: a passive replica of the caller's state.
//!
//! [`ViewerMirror`] holds the last snapshot received and nothing else. Each
//! new snapshot replaces it wholesale; fields are never merged or defaulted.
//! Until the first snapshot arrives the mirror shows the default, not-running
//! [`GameState`], since the relay keeps no backlog for late joiners.

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::error::Result;
use crate::event::RelayEvent;
use crate::protocol::Snapshot;
use crate::state::GameState;

/// Local copy of the most recently received snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerMirror {
    snapshot: Snapshot,
    received: u64,
}

impl Default for ViewerMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerMirror {
    /// A mirror showing the default game state.
    pub fn new() -> Self {
        let snapshot = Snapshot::from_state(&GameState::default())
            .unwrap_or_else(|_| Snapshot::from_value(serde_json::Value::Null));
        Self {
            snapshot,
            received: 0,
        }
    }

    /// Replace the local copy with `snapshot`, whatever it contains.
    pub fn on_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.received += 1;
    }

    /// Apply a relay event. Returns `true` if the local copy changed hands.
    pub fn apply(&mut self, event: RelayEvent) -> bool {
        match event {
            RelayEvent::NewState(snapshot) => {
                self.on_snapshot(snapshot);
                true
            }
            _ => false,
        }
    }

    /// The snapshot exactly as received.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Decode the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Serialization`](crate::BingoError::Serialization)
    /// if the last snapshot received was partial or malformed.
    pub fn game_state(&self) -> Result<GameState> {
        self.snapshot.game_state()
    }

    /// How many snapshots have been received.
    pub fn received(&self) -> u64 {
        self.received
    }
}

/// Mirror a relay connection into a [`watch`] channel.
///
/// Spawns a task that applies every [`RelayEvent::NewState`] from `events`
/// and publishes the new snapshot on the returned receiver. The task ends
/// when `events` closes or every watch receiver is dropped.
///
/// Must be called inside a tokio runtime.
pub fn follow(
    mut events: mpsc::Receiver<RelayEvent>,
) -> (watch::Receiver<Snapshot>, tokio::task::JoinHandle<()>) {
    let mut mirror = ViewerMirror::new();
    let (tx, rx) = watch::channel(mirror.snapshot().clone());

    let task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let RelayEvent::Disconnected { reason } = &event {
                warn!(?reason, "screen lost its relay connection");
            }
            if mirror.apply(event) && tx.send(mirror.snapshot().clone()).is_err() {
                debug!("no screens left watching, stopping mirror");
                break;
            }
        }
        debug!(received = mirror.received(), "mirror stopped");
    });

    (rx, task)
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
    use crate::error::BingoError;
    use serde_json::json;

    fn running_state() -> GameState {
        GameState {
            min: 1,
            max: 3,
            all: vec![1, 2, 3],
            available: vec![1, 3],
            calls: vec![2],
            running: true,
            video: None,
        }
    }

    #[test]
    fn starts_from_default_state() {
        let mirror = ViewerMirror::new();
        assert_eq!(mirror.game_state().unwrap(), GameState::default());
        assert_eq!(mirror.received(), 0);
    }

    #[test]
    fn snapshot_replaces_everything() {
        let mut mirror = ViewerMirror::new();
        mirror.on_snapshot(Snapshot::from_state(&running_state()).unwrap());
        assert_eq!(mirror.game_state().unwrap(), running_state());
        assert_eq!(mirror.received(), 1);
    }

    #[test]
    fn partial_snapshot_is_stored_without_defaults() {
        let mut mirror = ViewerMirror::new();
        mirror.on_snapshot(Snapshot::from_state(&running_state()).unwrap());
        mirror.on_snapshot(Snapshot::from_value(json!({"running": false})));

        assert_eq!(mirror.snapshot().as_value(), &json!({"running": false}));
        assert!(matches!(
            mirror.game_state().unwrap_err(),
            BingoError::Serialization(_)
        ));
    }

    #[test]
    fn non_state_events_are_ignored() {
        let mut mirror = ViewerMirror::new();
        assert!(!mirror.apply(RelayEvent::Connected));
        assert!(!mirror.apply(RelayEvent::Pong));
        assert!(!mirror.apply(RelayEvent::Disconnected { reason: None }));
        assert_eq!(mirror.received(), 0);
    }

    #[tokio::test]
    async fn follow_publishes_each_snapshot() {
        let (tx, rx) = mpsc::channel(8);
        let (mut watch_rx, task) = follow(rx);
        assert_eq!(
            watch_rx.borrow().game_state().unwrap(),
            GameState::default()
        );

        tx.send(RelayEvent::Connected).await.unwrap();
        tx.send(RelayEvent::NewState(
            Snapshot::from_state(&running_state()).unwrap(),
        ))
        .await
        .unwrap();

        watch_rx.changed().await.unwrap();
        assert_eq!(watch_rx.borrow().game_state().unwrap(), running_state());

        drop(tx);
        task.await.unwrap();
    }
}

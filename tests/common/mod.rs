#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for bingo relay integration tests.
//!
//! Provides a scripted [`MockTransport`] and helpers for building relay
//! frames and game states.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use bingo_relay::protocol::{ServerMessage, Snapshot};
use bingo_relay::relay::Relay;
use bingo_relay::state::{number_range, GameState};
use bingo_relay::{BingoError, RelayEvent, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted mock transport for integration testing.
///
/// Scripted relay frames are consumed in order by `recv()`.
/// All frames sent by the client are recorded in `sent`.
pub struct MockTransport {
    /// Scripted relay frames (consumed in order by `recv`).
    incoming: VecDeque<Option<Result<String, BingoError>>>,
    /// Recorded outgoing frames from the client.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Whether `close()` has been called.
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a mock transport with the given scripted incoming frames.
    ///
    /// Returns the transport plus shared handles for inspecting sent frames
    /// and whether close was called.
    pub fn new(
        incoming: Vec<Option<Result<String, BingoError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), BingoError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, BingoError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // Out of script: stay open until the client shuts down.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), BingoError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Frame helpers ───────────────────────────────────────────────────

/// The `new-state` frame the relay sends for `state`.
pub fn new_state_json(state: &GameState) -> String {
    let snapshot = Snapshot::from_state(state).expect("snapshot serialization");
    serde_json::to_string(&ServerMessage::NewState(snapshot)).expect("new_state_json serialization")
}

/// The `pong` frame.
pub fn pong_json() -> String {
    serde_json::to_string(&ServerMessage::Pong).expect("pong_json serialization")
}

// ── State helpers ───────────────────────────────────────────────────

/// A running game over `min..=max` with `calls` already drawn.
pub fn running_state(min: i32, max: i32, calls: &[i32]) -> GameState {
    let all = number_range(min, max);
    let available = all.iter().copied().filter(|n| !calls.contains(n)).collect();
    GameState {
        min,
        max,
        calls: calls.to_vec(),
        available,
        running: true,
        all,
        video: None,
    }
}

// ── Async helpers ───────────────────────────────────────────────────

/// Receive the next event, failing the test after two seconds.
pub async fn next_event(rx: &mut tokio::sync::mpsc::Receiver<RelayEvent>) -> RelayEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Skip events until the next `NewState` and decode it.
pub async fn next_state(rx: &mut tokio::sync::mpsc::Receiver<RelayEvent>) -> GameState {
    loop {
        if let RelayEvent::NewState(snapshot) = next_event(rx).await {
            return snapshot.game_state().expect("decode snapshot");
        }
    }
}

/// Poll until `room` has exactly `count` subscribers.
pub async fn wait_for_subscribers(relay: &Relay, room: &str, count: usize) {
    for _ in 0..400 {
        if relay.subscriber_count(room) == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {count} subscribers in {room}, found {}",
        relay.subscriber_count(room)
    );
}

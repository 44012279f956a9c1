//! Async client for the state relay.
//!
//! [`RelayClient`] is a thin handle that talks to a background transport loop
//! over an unbounded MPSC channel. Events arrive on a bounded channel
//! ([`tokio::sync::mpsc::Receiver<RelayEvent>`]) returned from
//! [`RelayClient::start`].
//!
//! A caller publishes through the handle (it implements
//! [`Publisher`]); a screen only reads events, usually by handing the
//! receiver to [`mirror::follow`](crate::mirror::follow).
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:3536").await?;
//! let (client, mut events) = RelayClient::start(transport, RelayClientConfig::default());
//! let mut caller = Caller::new(client);
//! caller.start()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         RelayEvent::NewState(snapshot) => { /* … */ }
//!         RelayEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::caller::Publisher;
use crate::error::{BingoError, Result};
use crate::event::RelayEvent;
use crate::protocol::{ClientMessage, ServerMessage, Snapshot};
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`RelayClient`].
///
/// # Example
///
/// ```
/// use bingo_relay::client::RelayClientConfig;
/// use std::time::Duration;
///
/// let config = RelayClientConfig::new()
///     .with_event_channel_capacity(512)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.event_channel_capacity, 512);
/// ```
#[derive(Debug, Clone)]
pub struct RelayClientConfig {
    /// Capacity of the bounded event channel.
    ///
    /// `NewState` and `Disconnected` are never dropped: when the channel is
    /// full the transport loop waits for the consumer, which stops reading
    /// from the relay until there is room. Other events (`Pong`) are dropped
    /// with a warning instead.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`RelayClient::shutdown`] waits for the transport loop to
    /// close the connection before aborting it.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayClientConfig {
    /// Configuration with default values.
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the capacity of the bounded event channel. Clamped to at least 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the graceful shutdown timeout. Zero aborts immediately.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async handle to a relay connection.
///
/// Created via [`RelayClient::start`], which spawns the transport loop. All
/// sending methods queue a message and return immediately.
pub struct RelayClient {
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    connected: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl RelayClient {
    /// Start the transport loop and return a handle plus event receiver.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: RelayClientConfig,
    ) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        // tokio panics on a zero-capacity channel.
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<RelayEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            event_tx,
            Arc::clone(&connected),
            shutdown_rx,
        ));

        let client = Self {
            cmd_tx,
            connected,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    /// Queue a `set-state` carrying `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::NotConnected`] if the transport has closed. The
    /// snapshot is not buffered for a later connection.
    pub fn publish_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.send(ClientMessage::SetState(snapshot))
    }

    /// Send a keepalive ping. The relay answers with [`RelayEvent::Pong`].
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::NotConnected`] if the transport has closed.
    pub fn ping(&self) -> Result<()> {
        self.send(ClientMessage::Ping)
    }

    /// Close the transport and stop the background task.
    ///
    /// The event receiver yields `Disconnected` and then `None`.
    pub async fn shutdown(&mut self) {
        debug!("RelayClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.connected.store(false, Ordering::Release);
    }

    /// Returns `true` while the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn send(&self, msg: ClientMessage) -> Result<()> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(BingoError::NotConnected);
        }
        self.cmd_tx.send(msg).map_err(|_| BingoError::NotConnected)
    }
}

impl Publisher for RelayClient {
    fn publish(&self, snapshot: Snapshot) -> Result<()> {
        self.publish_snapshot(snapshot)
    }
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        // No executor to drive a graceful close from here.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Multiplexes outgoing commands, the shutdown signal, and incoming frames.
///
/// Exits when the command channel closes, shutdown is requested, the relay
/// closes the connection, or the transport fails.
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<RelayEvent>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("transport loop started");

    emit_event(&event_tx, RelayEvent::Connected);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(msg) = cmd else {
                    debug!("command channel closed, shutting down transport loop");
                    let _ = transport.close().await;
                    emit_disconnected(&event_tx, &connected, Some("client shut down".into())).await;
                    break;
                };
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if let Err(e) = transport.send(json).await {
                            error!("transport send error: {e}");
                            emit_disconnected(
                                &event_tx,
                                &connected,
                                Some(format!("transport send error: {e}")),
                            ).await;
                            break;
                        }
                    }
                    Err(e) => error!("failed to serialize ClientMessage: {e}"),
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &connected, Some("client shut down".into())).await;
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(ServerMessage::NewState(snapshot)) => {
                            // Snapshots are never dropped; wait for the screen to catch up.
                            tokio::select! {
                                sent = event_tx.send(RelayEvent::NewState(snapshot)) => {
                                    if sent.is_err() {
                                        debug!("event channel closed, receiver dropped");
                                    }
                                }
                                _ = &mut shutdown_rx => {
                                    debug!("shutdown signal received while delivering snapshot");
                                    let _ = transport.close().await;
                                    emit_disconnected(&event_tx, &connected, Some("client shut down".into())).await;
                                    break;
                                }
                            }
                        }
                        Ok(msg) => emit_event(&event_tx, RelayEvent::from(msg)),
                        Err(e) => warn!("failed to deserialize relay message: {e} (raw: {text})"),
                    },
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &connected,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    None => {
                        debug!("transport closed by relay");
                        emit_disconnected(&event_tx, &connected, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

/// Emit a droppable event without blocking. Drops it with a warning if the channel is full.
fn emit_event(event_tx: &mpsc::Sender<RelayEvent>, event: RelayEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Mark the connection down and deliver `Disconnected`, waiting for room.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<RelayEvent>,
    connected: &AtomicBool,
    reason: Option<String>,
) {
    connected.store(false, Ordering::Release);
    if event_tx
        .send(RelayEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
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
    use async_trait::async_trait;

    /// Never yields anything and never finishes closing.
    struct StuckTransport;

    #[async_trait]
    impl Transport for StuckTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), BingoError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, BingoError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), BingoError> {
            std::future::pending().await
        }
    }

    #[test]
    fn config_defaults() {
        let config = RelayClientConfig::default();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = RelayClientConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_transport_task() {
        let config = RelayClientConfig::new().with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, _events) = RelayClient::start(StuckTransport, config);

        tokio::time::timeout(Duration::from_secs(2), client.shutdown())
            .await
            .expect("shutdown must not hang");
        assert!(!client.is_connected());
        assert!(matches!(
            client.publish_snapshot(Snapshot::from_value(serde_json::json!({}))),
            Err(BingoError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn debug_impl_reports_connection() {
        let (client, _events) = RelayClient::start(StuckTransport, RelayClientConfig::new());
        let debug = format!("{client:?}");
        assert!(debug.contains("connected: true"));
        assert!(debug.contains("has_task: true"));
    }
}

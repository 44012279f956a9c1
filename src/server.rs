//! The relay server: one shared room, no state of its own.
//!
//! Every connection is subscribed to the configured room. Inbound `set-state`
//! frames are published to the room verbatim; every snapshot published to the
//! room (including the connection's own) is written back as `new-state`.
//!
//! [`serve_connection`] holds the per-connection logic and works over any
//! [`Transport`]. [`RelayServer`] adds the WebSocket accept loop.

use tracing::{debug, warn};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::relay::{Relay, DEFAULT_ROOM, DEFAULT_ROOM_CAPACITY};
use crate::transport::Transport;

#[cfg(feature = "transport-websocket")]
use std::net::SocketAddr;

#[cfg(feature = "transport-websocket")]
use crate::error::Result;

/// Default listen address for the relay server.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3536";

/// Drive one client connection until it closes.
///
/// The connection is subscribed to `room` before its first frame is read, so
/// it sees its own publishes. Malformed frames are logged and skipped. A
/// snapshot that cannot be written is lost for this connection only.
pub async fn serve_connection(mut transport: impl Transport, relay: Relay, room: String) {
    let mut subscription = relay.subscribe(room.clone());
    let id = subscription.id();
    debug!(%id, room = %room, "connection joined room");

    loop {
        tokio::select! {
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::SetState(snapshot)) => {
                            let delivered = relay.publish(&room, snapshot);
                            debug!(%id, delivered, "relayed set-state");
                        }
                        Ok(ClientMessage::Ping) => {
                            if !send(&mut transport, &ServerMessage::Pong).await {
                                break;
                            }
                        }
                        Err(e) => warn!(%id, "ignoring malformed frame: {e}"),
                    },
                    Some(Err(e)) => {
                        warn!(%id, "transport receive error: {e}");
                        break;
                    }
                    None => {
                        debug!(%id, "connection closed by peer");
                        break;
                    }
                }
            }

            snapshot = subscription.recv() => {
                let Some(snapshot) = snapshot else {
                    debug!(%id, "relay dropped, closing connection");
                    break;
                };
                if !send(&mut transport, &ServerMessage::NewState(snapshot)).await {
                    break;
                }
            }
        }
    }

    drop(subscription);
    let _ = transport.close().await;
    debug!(%id, room = %room, "connection left room");
}

/// Serialize and send one message. Returns `false` if the connection is unusable.
async fn send(transport: &mut impl Transport, msg: &ServerMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize ServerMessage: {e}");
            return true;
        }
    };
    match transport.send(json).await {
        Ok(()) => true,
        Err(e) => {
            warn!("transport send error: {e}");
            false
        }
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`RelayServer`].
///
/// ```
/// use bingo_relay::server::RelayServerConfig;
///
/// let config = RelayServerConfig::new().with_room("hall");
/// assert_eq!(config.room, "hall");
/// assert_eq!(config.bind_addr, "127.0.0.1:3536");
/// ```
#[derive(Debug, Clone)]
pub struct RelayServerConfig {
    /// Address to listen on. Defaults to **127.0.0.1:3536**.
    pub bind_addr: String,
    /// Room every connection joins. Defaults to **"game"**.
    pub room: String,
    /// Snapshots the room buffers for a stalled connection before it skips
    /// ahead to the newest. Defaults to **1024**.
    pub room_capacity: usize,
}

impl Default for RelayServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayServerConfig {
    /// Configuration with default values.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room: DEFAULT_ROOM.to_string(),
            room_capacity: DEFAULT_ROOM_CAPACITY,
        }
    }

    /// Set the listen address (`host:port`; port 0 picks a free one).
    #[must_use]
    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }

    /// Set the room name.
    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    /// Set the per-room snapshot buffer. Clamped to at least 1.
    #[must_use]
    pub fn with_room_capacity(mut self, capacity: usize) -> Self {
        self.room_capacity = capacity.max(1);
        self
    }
}

// ── WebSocket server ────────────────────────────────────────────────

/// WebSocket relay server.
///
/// ```rust,no_run
/// # async fn example() -> Result<(), bingo_relay::BingoError> {
/// use bingo_relay::server::{RelayServer, RelayServerConfig};
///
/// let server = RelayServer::bind(RelayServerConfig::new()).await?;
/// server.run().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "transport-websocket")]
#[derive(Debug)]
pub struct RelayServer {
    listener: tokio::net::TcpListener,
    relay: Relay,
    room: String,
}

#[cfg(feature = "transport-websocket")]
impl RelayServer {
    /// Bind the listen socket.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Io`](crate::BingoError::Io) if the address
    /// cannot be bound.
    pub async fn bind(config: RelayServerConfig) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, room = %config.room, "relay listening");
        Ok(Self {
            listener,
            relay: Relay::with_capacity(config.room_capacity),
            room: config.room,
        })
    }

    /// The address actually bound.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Io`](crate::BingoError::Io) if the socket has no
    /// local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The relay shared by every connection.
    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Accept connections until the listener fails.
    ///
    /// Each connection is served on its own task. A failed handshake only
    /// drops that connection.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Io`](crate::BingoError::Io) if accepting fails.
    pub async fn run(self) -> Result<()> {
        loop {
            let (tcp, peer) = self.listener.accept().await?;
            let relay = self.relay.clone();
            let room = self.room.clone();
            tokio::spawn(async move {
                match crate::transports::WebSocketTransport::accept(tcp).await {
                    Ok(transport) => {
                        tracing::info!(%peer, "client connected");
                        serve_connection(transport, relay, room).await;
                        tracing::info!(%peer, "client disconnected");
                    }
                    Err(e) => warn!(%peer, "WebSocket handshake failed: {e}"),
                }
            });
        }
    }

    /// Like [`run`](Self::run), but return `Ok(())` once `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Io`](crate::BingoError::Io) if accepting fails.
    pub async fn run_until(self, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
        tokio::select! {
            result = self.run() => result,
            () = shutdown => {
                tracing::info!("relay shutting down");
                Ok(())
            }
        }
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
    use crate::protocol::Snapshot;
    use crate::transports::loopback_pair;
    use serde_json::json;
    use std::time::Duration;

    async fn next_message(peer: &mut impl Transport) -> ServerMessage {
        let text = tokio::time::timeout(Duration::from_secs(2), peer.recv())
            .await
            .expect("timed out waiting for relay")
            .expect("connection closed")
            .expect("transport error");
        serde_json::from_str(&text).unwrap()
    }

    async fn wait_for_subscribers(relay: &Relay, count: usize) {
        for _ in 0..200 {
            if relay.subscriber_count(DEFAULT_ROOM) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} subscribers");
    }

    #[tokio::test]
    async fn set_state_is_echoed_to_sender() {
        let relay = Relay::new();
        let (mut peer, server_side) = loopback_pair();
        tokio::spawn(serve_connection(server_side, relay.clone(), DEFAULT_ROOM.into()));
        wait_for_subscribers(&relay, 1).await;

        let msg = ClientMessage::SetState(Snapshot::from_value(json!({"running": true})));
        peer.send(serde_json::to_string(&msg).unwrap()).await.unwrap();

        assert_eq!(
            next_message(&mut peer).await,
            ServerMessage::NewState(Snapshot::from_value(json!({"running": true})))
        );
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let relay = Relay::new();
        let (mut peer, server_side) = loopback_pair();
        tokio::spawn(serve_connection(server_side, relay, DEFAULT_ROOM.into()));

        peer.send(r#"{"event":"ping"}"#.into()).await.unwrap();
        assert_eq!(next_message(&mut peer).await, ServerMessage::Pong);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let relay = Relay::new();
        let (mut peer, server_side) = loopback_pair();
        tokio::spawn(serve_connection(server_side, relay, DEFAULT_ROOM.into()));

        peer.send("not json".into()).await.unwrap();
        peer.send(r#"{"event":"reset"}"#.into()).await.unwrap();
        peer.send(r#"{"event":"ping"}"#.into()).await.unwrap();
        assert_eq!(next_message(&mut peer).await, ServerMessage::Pong);
    }

    #[tokio::test]
    async fn closing_peer_unsubscribes() {
        let relay = Relay::new();
        let (mut peer, server_side) = loopback_pair();
        let task = tokio::spawn(serve_connection(server_side, relay.clone(), DEFAULT_ROOM.into()));
        wait_for_subscribers(&relay, 1).await;

        peer.close().await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(relay.subscriber_count(DEFAULT_ROOM), 0);
    }

    #[test]
    fn server_config_defaults() {
        let config = RelayServerConfig::default();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.room, DEFAULT_ROOM);
        assert_eq!(config.room_capacity, DEFAULT_ROOM_CAPACITY);
        assert_eq!(RelayServerConfig::new().with_room_capacity(0).room_capacity, 1);
    }

    #[tokio::test]
    async fn stalled_connection_catches_up_with_newest_snapshot() {
        let relay = Relay::with_capacity(4);
        let (mut peer, server_side) = loopback_pair();
        tokio::spawn(serve_connection(server_side, relay.clone(), DEFAULT_ROOM.into()));
        wait_for_subscribers(&relay, 1).await;

        // Publish faster than the connection task gets to run.
        for seq in 0..50 {
            relay.publish(DEFAULT_ROOM, Snapshot::from_value(json!({ "seq": seq })));
        }

        let mut last = None;
        while let Ok(Some(Ok(text))) =
            tokio::time::timeout(Duration::from_millis(200), peer.recv()).await
        {
            last = Some(serde_json::from_str::<ServerMessage>(&text).unwrap());
        }
        assert_eq!(
            last,
            Some(ServerMessage::NewState(Snapshot::from_value(json!({ "seq": 49 }))))
        );
    }
}

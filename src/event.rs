//! Events emitted by a [`RelayClient`](crate::client::RelayClient).

use crate::protocol::{ServerMessage, Snapshot};

/// Something that happened on a relay connection.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// The transport loop started. Always the first event.
    Connected,
    /// A snapshot published to the room, possibly by this client itself.
    NewState(Snapshot),
    /// The relay answered a ping.
    Pong,
    /// The connection ended. Always the last event.
    Disconnected {
        /// Why the connection ended, if known. `None` for a clean close by
        /// the relay.
        reason: Option<String>,
    },
}

impl From<ServerMessage> for RelayEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::NewState(snapshot) => RelayEvent::NewState(snapshot),
            ServerMessage::Pong => RelayEvent::Pong,
        }
    }
}

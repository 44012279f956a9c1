//! Wire protocol for the state relay.
//!
//! Every frame is a JSON text message adjacently tagged by `event`, with the
//! snapshot (if any) under `payload`:
//!
//! ```json
//! {"event":"set-state","payload":{"min":1,"max":90,"calls":[],"available":[],"running":false,"all":[],"video":false}}
//! ```
//!
//! Snapshots are carried as raw JSON so the relay forwards them verbatim,
//! without filtering fields or validating the schema.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::GameState;

// ── Snapshot ────────────────────────────────────────────────────────

/// A complete game state at one point in time, as it travels on the wire.
///
/// Produced from a [`GameState`] by the caller; consumed by screens through
/// [`Snapshot::game_state`]. The relay never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(serde_json::Value);

impl Snapshot {
    /// Capture `state` as a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Serialization`](crate::BingoError::Serialization)
    /// if the state cannot be represented as JSON.
    pub fn from_state(state: &GameState) -> Result<Self> {
        Ok(Self(serde_json::to_value(state)?))
    }

    /// Wrap an arbitrary JSON value without inspecting it.
    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Decode the typed game state.
    ///
    /// No field is defaulted: a snapshot missing any key is an error.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Serialization`](crate::BingoError::Serialization)
    /// if the snapshot is not a complete, well-formed [`GameState`].
    pub fn game_state(&self) -> Result<GameState> {
        Ok(GameState::deserialize(&self.0)?)
    }

    /// The raw JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consume the snapshot, returning the raw JSON value.
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Snapshot {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// Messages sent from a relay client (caller or screen) to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Publish a full snapshot to every subscriber of the room.
    SetState(Snapshot),
    /// Keepalive. Answered with [`ServerMessage::Pong`] on the same connection.
    Ping,
}

/// Messages sent from the relay to its clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// A snapshot published to the room, forwarded verbatim.
    NewState(Snapshot),
    /// Reply to [`ClientMessage::Ping`].
    Pong,
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

    #[test]
    fn set_state_wire_shape() {
        let snapshot = Snapshot::from_state(&GameState::default()).unwrap();
        let json = serde_json::to_value(ClientMessage::SetState(snapshot)).unwrap();
        assert_eq!(json["event"], "set-state");
        assert_eq!(json["payload"]["max"], 90);
        assert_eq!(json["payload"]["video"], false);
    }

    #[test]
    fn new_state_wire_shape() {
        let msg = ServerMessage::NewState(Snapshot::from_value(json!({"anything": [1, 2]})));
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"event":"new-state","payload":{"anything":[1,2]}}"#);
    }

    #[test]
    fn ping_and_pong_have_no_payload() {
        assert_eq!(
            serde_json::to_string(&ClientMessage::Ping).unwrap(),
            r#"{"event":"ping"}"#
        );
        let pong: ServerMessage = serde_json::from_str(r#"{"event":"pong"}"#).unwrap();
        assert_eq!(pong, ServerMessage::Pong);
    }

    #[test]
    fn partial_snapshot_passes_through_untouched() {
        let raw = r#"{"event":"set-state","payload":{"running":true,"extra":"kept"}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        let ClientMessage::SetState(snapshot) = msg else {
            panic!("expected SetState");
        };
        assert_eq!(snapshot.as_value(), &json!({"running": true, "extra": "kept"}));
        assert!(snapshot.game_state().is_err());
    }

    #[test]
    fn snapshot_round_trips_game_state() {
        let state = GameState {
            calls: vec![3],
            available: vec![1, 2, 4, 5],
            all: vec![1, 2, 3, 4, 5],
            running: true,
            max: 5,
            ..GameState::default()
        };
        let snapshot = Snapshot::from_state(&state).unwrap();
        assert_eq!(snapshot.game_state().unwrap(), state);
    }

    #[test]
    fn unknown_event_is_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"event":"reset","payload":{}}"#);
        assert!(result.is_err());
    }
}

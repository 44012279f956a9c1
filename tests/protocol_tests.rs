#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Protocol serialization tests for the bingo relay.
//!
//! Checks the wire shape of every `ClientMessage` and `ServerMessage`
//! variant and decodes JSON fixtures that match what browser screens and
//! callers put on the wire.

use bingo_relay::protocol::{ClientMessage, ServerMessage, Snapshot};
use bingo_relay::state::{GameState, VideoClip};
use serde_json::json;

// ════════════════════════════════════════════════════════════════════
// Fixtures
// ════════════════════════════════════════════════════════════════════

/// A mid-game state as a caller page publishes it.
const RUNNING_STATE: &str = r#"{
    "min": 1,
    "max": 5,
    "calls": [3, 1],
    "available": [2, 4, 5],
    "running": true,
    "all": [1, 2, 3, 4, 5],
    "video": false
}"#;

fn running_state() -> GameState {
    GameState {
        min: 1,
        max: 5,
        calls: vec![3, 1],
        available: vec![2, 4, 5],
        running: true,
        all: vec![1, 2, 3, 4, 5],
        video: None,
    }
}

// ════════════════════════════════════════════════════════════════════
// GameState fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn game_state_fixture_decodes() {
    let state: GameState = serde_json::from_str(RUNNING_STATE).unwrap();
    assert_eq!(state, running_state());
    state.check_invariants().unwrap();
}

#[test]
fn game_state_uses_wire_field_names() {
    let value = serde_json::to_value(running_state()).unwrap();
    let keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    for key in ["min", "max", "calls", "available", "running", "all", "video"] {
        assert!(keys.contains(&key), "missing key {key}: {keys:?}");
    }
    assert_eq!(keys.len(), 7);
}

#[test]
fn video_is_false_when_idle() {
    let value = serde_json::to_value(GameState::default()).unwrap();
    assert_eq!(value["video"], json!(false));
}

#[test]
fn video_is_the_clip_file_name_when_playing() {
    for clip in VideoClip::ALL {
        let state = GameState {
            video: Some(clip),
            ..GameState::default()
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["video"], json!(clip.file_name()));

        let back: GameState = serde_json::from_value(value).unwrap();
        assert_eq!(back.video, Some(clip));
    }
}

#[test]
fn video_true_is_rejected() {
    let mut value: serde_json::Value = serde_json::from_str(RUNNING_STATE).unwrap();
    value["video"] = json!(true);
    assert!(serde_json::from_value::<GameState>(value).is_err());
}

#[test]
fn unknown_video_clip_is_rejected() {
    let mut value: serde_json::Value = serde_json::from_str(RUNNING_STATE).unwrap();
    value["video"] = json!("cat.gif");
    assert!(serde_json::from_value::<GameState>(value).is_err());
}

// ════════════════════════════════════════════════════════════════════
// ClientMessage
// ════════════════════════════════════════════════════════════════════

#[test]
fn set_state_fixture_decodes() {
    let json = format!(r#"{{"event":"set-state","payload":{RUNNING_STATE}}}"#);
    let msg: ClientMessage = serde_json::from_str(&json).unwrap();
    if let ClientMessage::SetState(snapshot) = msg {
        assert_eq!(snapshot.game_state().unwrap(), running_state());
    } else {
        panic!("expected SetState, got {msg:?}");
    }
}

#[test]
fn set_state_wire_shape() {
    let msg = ClientMessage::SetState(Snapshot::from_state(&running_state()).unwrap());
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["event"], "set-state");
    assert_eq!(
        value["payload"],
        serde_json::from_str::<serde_json::Value>(RUNNING_STATE).unwrap()
    );
}

#[test]
fn ping_wire_shape() {
    let value = serde_json::to_value(ClientMessage::Ping).unwrap();
    assert_eq!(value, json!({"event": "ping"}));
    let msg: ClientMessage = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
    assert_eq!(msg, ClientMessage::Ping);
}

#[test]
fn set_state_keeps_unknown_fields() {
    let json = r#"{"event":"set-state","payload":{"running":true,"theme":"dark"}}"#;
    let msg: ClientMessage = serde_json::from_str(json).unwrap();
    let ClientMessage::SetState(snapshot) = msg else {
        panic!("expected SetState");
    };
    assert_eq!(snapshot.as_value()["theme"], "dark");

    // Forwarded verbatim.
    let forwarded = serde_json::to_value(ServerMessage::NewState(snapshot)).unwrap();
    assert_eq!(
        forwarded,
        json!({"event": "new-state", "payload": {"running": true, "theme": "dark"}})
    );
}

#[test]
fn unknown_client_event_is_rejected() {
    assert!(serde_json::from_str::<ClientMessage>(r#"{"event":"reset"}"#).is_err());
    assert!(serde_json::from_str::<ClientMessage>(r#"{"payload":{}}"#).is_err());
    assert!(serde_json::from_str::<ClientMessage>("[]").is_err());
}

// ════════════════════════════════════════════════════════════════════
// ServerMessage
// ════════════════════════════════════════════════════════════════════

#[test]
fn new_state_fixture_decodes() {
    let json = format!(r#"{{"event":"new-state","payload":{RUNNING_STATE}}}"#);
    let msg: ServerMessage = serde_json::from_str(&json).unwrap();
    if let ServerMessage::NewState(snapshot) = msg {
        let state = snapshot.game_state().unwrap();
        assert_eq!(state.last_call(), Some(1));
        assert_eq!(state.progress(), (2, 5));
    } else {
        panic!("expected NewState, got {msg:?}");
    }
}

#[test]
fn pong_wire_shape() {
    let value = serde_json::to_value(ServerMessage::Pong).unwrap();
    assert_eq!(value, json!({"event": "pong"}));
}

#[test]
fn partial_new_state_decodes_but_is_not_a_game_state() {
    let json = r#"{"event":"new-state","payload":{"calls":[7]}}"#;
    let msg: ServerMessage = serde_json::from_str(json).unwrap();
    let ServerMessage::NewState(snapshot) = msg else {
        panic!("expected NewState");
    };
    assert_eq!(snapshot.as_value(), &json!({"calls": [7]}));
    assert!(snapshot.game_state().is_err());
}

#[test]
fn snapshot_is_transparent_json() {
    let snapshot = Snapshot::from_state(&running_state()).unwrap();
    let direct = serde_json::to_value(running_state()).unwrap();
    assert_eq!(serde_json::to_value(&snapshot).unwrap(), direct);
    assert_eq!(snapshot.into_value(), direct);
}

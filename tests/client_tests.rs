//! Integration-style client tests for the bingo relay client.
//!
//! Uses the shared `MockTransport` from `tests/common` to script relay
//! frames and verify that `RelayClient` sends the right frames and delivers
//! the right events, both on its own and driven by a `Caller`.

mod common;

use std::time::Duration;

use bingo_relay::protocol::{ClientMessage, Snapshot};
use bingo_relay::{
    BingoError, Caller, GameState, RelayClient, RelayClientConfig, RelayEvent, ViewerMirror,
};
use serde_json::json;

use common::{new_state_json, next_event, pong_json, running_state, MockTransport};

// ════════════════════════════════════════════════════════════════════
// Helper: start a mock client with scripted frames
// ════════════════════════════════════════════════════════════════════

/// Start a client over a mock transport that yields `incoming` in order.
#[allow(clippy::type_complexity)]
fn start_client(
    incoming: Vec<Option<Result<String, BingoError>>>,
) -> (
    RelayClient,
    tokio::sync::mpsc::Receiver<RelayEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let (transport, sent, closed) = MockTransport::new(incoming);
    let (client, events) = RelayClient::start(transport, RelayClientConfig::default());
    (client, events, sent, closed)
}

/// Consume the `Connected` event. Panics if anything else arrives first.
async fn expect_connected(rx: &mut tokio::sync::mpsc::Receiver<RelayEvent>) {
    let ev = next_event(rx).await;
    assert!(
        matches!(ev, RelayEvent::Connected),
        "first event should be Connected, got {ev:?}"
    );
}

/// Decode every frame the client has sent so far.
fn sent_messages(sent: &std::sync::Mutex<Vec<String>>) -> Vec<ClientMessage> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|m| serde_json::from_str(m).expect("client sent malformed frame"))
        .collect()
}

/// Wait until the client has sent at least `count` frames.
async fn wait_for_sent(sent: &std::sync::Mutex<Vec<String>>, count: usize) {
    for _ in 0..400 {
        if sent.lock().unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("client sent fewer than {count} frames");
}

// ════════════════════════════════════════════════════════════════════
// Connection lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn connected_is_the_first_event() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![]);

    expect_connected(&mut events).await;
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_transport_and_emits_disconnected() {
    let (mut client, mut events, _sent, closed) = start_client(vec![]);
    expect_connected(&mut events).await;

    client.shutdown().await;

    assert!(closed.load(std::sync::atomic::Ordering::Relaxed));
    assert!(!client.is_connected());
    let ev = next_event(&mut events).await;
    assert!(matches!(ev, RelayEvent::Disconnected { .. }), "got {ev:?}");
    assert!(events.recv().await.is_none());
}

// ════════════════════════════════════════════════════════════════════
// Outgoing frames
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn publish_snapshot_sends_set_state() {
    let (mut client, mut events, sent, _closed) = start_client(vec![]);
    expect_connected(&mut events).await;

    let state = running_state(1, 5, &[3]);
    client
        .publish_snapshot(Snapshot::from_state(&state).unwrap())
        .expect("publish");
    wait_for_sent(&sent, 1).await;

    let messages = sent_messages(&sent);
    if let [ClientMessage::SetState(snapshot)] = messages.as_slice() {
        assert_eq!(snapshot.game_state().unwrap(), state);
    } else {
        panic!("expected one SetState, got {messages:?}");
    }

    // Wire shape the relay expects.
    let raw: serde_json::Value = serde_json::from_str(&sent.lock().unwrap()[0]).unwrap();
    assert_eq!(raw["event"], "set-state");
    assert_eq!(raw["payload"]["calls"], json!([3]));

    client.shutdown().await;
}

#[tokio::test]
async fn snapshots_are_sent_in_publish_order() {
    let (mut client, mut events, sent, _closed) = start_client(vec![]);
    expect_connected(&mut events).await;

    for n in 1..=10 {
        client
            .publish_snapshot(Snapshot::from_value(json!({ "seq": n })))
            .expect("publish");
    }
    wait_for_sent(&sent, 10).await;

    let seqs: Vec<i64> = sent_messages(&sent)
        .into_iter()
        .map(|m| match m {
            ClientMessage::SetState(s) => s.as_value()["seq"].as_i64().unwrap(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(seqs, (1..=10).collect::<Vec<_>>());

    client.shutdown().await;
}

#[tokio::test]
async fn ping_and_pong_flow() {
    let (mut client, mut events, sent, _closed) = start_client(vec![Some(Ok(pong_json()))]);
    expect_connected(&mut events).await;

    client.ping().expect("ping");

    let ev = next_event(&mut events).await;
    assert!(matches!(ev, RelayEvent::Pong));

    wait_for_sent(&sent, 1).await;
    assert!(sent_messages(&sent)
        .iter()
        .any(|m| matches!(m, ClientMessage::Ping)));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Incoming frames
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn new_state_frames_become_events_in_order() {
    let first = running_state(1, 5, &[]);
    let second = running_state(1, 5, &[2]);
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok(new_state_json(&first))),
        Some(Ok(new_state_json(&second))),
    ]);
    expect_connected(&mut events).await;

    for expected in [first, second] {
        let ev = next_event(&mut events).await;
        if let RelayEvent::NewState(snapshot) = ev {
            assert_eq!(snapshot.game_state().unwrap(), expected);
        } else {
            panic!("expected NewState, got {ev:?}");
        }
    }

    client.shutdown().await;
}

#[tokio::test]
async fn partial_snapshot_is_delivered_verbatim() {
    let frame = r#"{"event":"new-state","payload":{"running":false}}"#.to_string();
    let (mut client, mut events, _sent, _closed) = start_client(vec![Some(Ok(frame))]);
    expect_connected(&mut events).await;

    let ev = next_event(&mut events).await;
    assert_eq!(
        ev,
        RelayEvent::NewState(Snapshot::from_value(json!({"running": false})))
    );

    client.shutdown().await;
}

#[tokio::test]
async fn malformed_json_does_not_crash_and_next_message_arrives() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![
        Some(Ok("{not json".into())),
        Some(Ok(r#"{"event":"reset"}"#.into())),
        Some(Ok(pong_json())),
    ]);
    expect_connected(&mut events).await;

    let ev = next_event(&mut events).await;
    assert!(matches!(ev, RelayEvent::Pong), "got {ev:?}");

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Disconnect handling
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn disconnect_on_transport_close() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![None]);
    expect_connected(&mut events).await;

    let ev = next_event(&mut events).await;
    assert_eq!(ev, RelayEvent::Disconnected { reason: None });
    assert!(!client.is_connected());

    client.shutdown().await;
}

#[tokio::test]
async fn disconnect_on_transport_error() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![Some(Err(
        BingoError::TransportReceive("network failure".into()),
    ))]);
    expect_connected(&mut events).await;

    let ev = next_event(&mut events).await;
    if let RelayEvent::Disconnected { reason } = ev {
        let r = reason.expect("reason should be present");
        assert!(r.contains("network failure"), "reason was: {r}");
    } else {
        panic!("expected Disconnected, got {ev:?}");
    }

    assert!(!client.is_connected());
    client.shutdown().await;
}

#[tokio::test]
async fn operations_fail_after_disconnect() {
    let (mut client, mut events, _sent, _closed) = start_client(vec![None]);
    expect_connected(&mut events).await;
    let _ev = next_event(&mut events).await;

    let result = client.ping();
    assert!(
        matches!(result, Err(BingoError::NotConnected)),
        "expected NotConnected error, got {result:?}"
    );
    let result = client.publish_snapshot(Snapshot::from_value(json!({})));
    assert!(matches!(result, Err(BingoError::NotConnected)));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Backpressure
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn full_event_channel_drops_pongs_but_keeps_disconnected() {
    let mut frames: Vec<_> = (0..5).map(|_| Some(Ok(pong_json()))).collect();
    frames.push(None);
    let (transport, _sent, _closed) = MockTransport::new(frames);
    let config = RelayClientConfig::new().with_event_channel_capacity(1);
    let (mut client, mut events) = RelayClient::start(transport, config);

    // Let the loop run ahead while nobody reads.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut received = Vec::new();
    while let Some(ev) = events.recv().await {
        received.push(ev);
    }
    let pongs = received.iter().filter(|ev| **ev == RelayEvent::Pong).count();
    assert!(pongs < 5, "expected some pongs to be dropped, got {received:?}");
    assert!(matches!(
        received.last(),
        Some(RelayEvent::Disconnected { reason: None })
    ));

    client.shutdown().await;
}

#[tokio::test]
async fn slow_screen_still_reaches_the_latest_snapshot() {
    let states = [
        running_state(1, 5, &[1]),
        running_state(1, 5, &[1, 2]),
        running_state(1, 5, &[1, 2, 3]),
    ];
    let mut frames: Vec<_> = states.iter().map(|s| Some(Ok(new_state_json(s)))).collect();
    frames.push(None);
    let (transport, _sent, _closed) = MockTransport::new(frames);
    let config = RelayClientConfig::new().with_event_channel_capacity(2);
    let (mut client, mut events) = RelayClient::start(transport, config);

    // Fill the channel before the screen starts reading.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut mirror = ViewerMirror::new();
    let mut seen = Vec::new();
    while let Some(ev) = events.recv().await {
        if let RelayEvent::NewState(snapshot) = &ev {
            seen.push(snapshot.game_state().unwrap());
        }
        mirror.apply(ev);
    }

    assert_eq!(seen, states);
    assert_eq!(mirror.game_state().unwrap(), states[2]);

    client.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_transport_while_screen_is_behind() {
    let frames: Vec<_> = (0..4)
        .map(|n| Some(Ok(new_state_json(&running_state(1, 5, &[n + 1])))))
        .collect();
    let (transport, _sent, closed) = MockTransport::new(frames);
    let config = RelayClientConfig::new()
        .with_event_channel_capacity(1)
        .with_shutdown_timeout(Duration::from_secs(5));
    let (mut client, mut events) = RelayClient::start(transport, config);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The loop is parked on a full channel; shutdown must still close.
    let shutdown = tokio::spawn(async move {
        client.shutdown().await;
        client
    });
    for _ in 0..400 {
        if closed.load(std::sync::atomic::Ordering::Relaxed) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(closed.load(std::sync::atomic::Ordering::Relaxed));

    let mut last = None;
    while let Some(ev) = events.recv().await {
        last = Some(ev);
    }
    assert!(matches!(last, Some(RelayEvent::Disconnected { .. })));
    let client = shutdown.await.unwrap();
    assert!(!client.is_connected());
}

// ════════════════════════════════════════════════════════════════════
// Caller driving a client
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn caller_publishes_every_transition_through_client() {
    let (transport, sent, _closed) = MockTransport::new(vec![]);
    let (client, mut events) = RelayClient::start(transport, RelayClientConfig::default());
    expect_connected(&mut events).await;

    let mut caller = Caller::new(client);
    caller.set_min(1).unwrap();
    caller.set_max(5).unwrap();
    caller.start().unwrap();
    caller.call(2).unwrap();
    wait_for_sent(&sent, 4).await;

    let states: Vec<GameState> = sent_messages(&sent)
        .into_iter()
        .map(|m| match m {
            ClientMessage::SetState(s) => s.game_state().unwrap(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(states.len(), 4);
    assert_eq!(states.last(), Some(caller.state()));
    assert_eq!(caller.state().calls, vec![3]);
    assert_eq!(caller.state().available, vec![1, 2, 4, 5]);

    // Replaying the frames into a mirror lands on the caller's state.
    let mut mirror = ViewerMirror::new();
    for state in &states {
        mirror.on_snapshot(Snapshot::from_state(state).unwrap());
    }
    assert_eq!(&mirror.game_state().unwrap(), caller.state());

    caller.into_publisher().shutdown().await;
}

#[tokio::test]
async fn caller_keeps_state_when_client_is_down() {
    let (transport, _sent, _closed) = MockTransport::new(vec![None]);
    let (client, mut events) = RelayClient::start(transport, RelayClientConfig::default());
    expect_connected(&mut events).await;
    let _ev = next_event(&mut events).await;

    let mut caller = Caller::new(client);
    caller.start().expect("publish failures are not surfaced");
    assert!(caller.state().running);
    assert_eq!(caller.state().available.len(), 90);
}

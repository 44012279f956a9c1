//! # Loopback Game
//!
//! Runs a caller, the relay, and one screen inside a single process:
//!
//! 1. Connect a caller and a screen to an in-process relay over loopback transports
//! 2. Start a 1..=20 game and call five random numbers
//! 3. Print what the screen's mirror shows after each call
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_game
//! ```

use std::time::Duration;

use bingo_relay::relay::DEFAULT_ROOM;
use bingo_relay::server::serve_connection;
use bingo_relay::{
    loopback_pair, mirror, Caller, Relay, RelayClient, RelayClientConfig, VideoClip,
};

/// Wire a new client to the relay and return its handle plus events.
fn connect(
    relay: &Relay,
) -> (
    RelayClient,
    tokio::sync::mpsc::Receiver<bingo_relay::RelayEvent>,
) {
    let (client_side, relay_side) = loopback_pair();
    tokio::spawn(serve_connection(
        relay_side,
        relay.clone(),
        DEFAULT_ROOM.to_string(),
    ));
    RelayClient::start(client_side, RelayClientConfig::new())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let relay = Relay::new();

    // ── Screen ──────────────────────────────────────────────────────
    let (_screen, screen_events) = connect(&relay);
    let (mut view, _mirror_task) = mirror::follow(screen_events);

    // ── Caller ──────────────────────────────────────────────────────
    let (caller_client, _caller_events) = connect(&relay);
    let mut caller = Caller::new(caller_client);

    // Both connections must be subscribed before the first publish.
    while relay.subscriber_count(DEFAULT_ROOM) < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    caller.set_max(20)?;
    caller.start()?;

    let mut rng = rand::thread_rng();
    for _ in 0..5 {
        let Some(called) = caller.call_random(&mut rng)? else {
            break;
        };
        tracing::info!("caller drew {called}");

        // Wait until the screen has caught up with this call.
        loop {
            view.changed().await?;
            let state = view.borrow_and_update().game_state()?;
            if state.last_call() == Some(called) {
                let recent: Vec<_> = state.recent_calls(5).collect();
                tracing::info!(
                    "screen shows {called} ({}), recent {recent:?}, {}/{} called",
                    state.last_call_name().unwrap_or(""),
                    state.progress().0,
                    state.progress().1,
                );
                break;
            }
        }
    }

    caller.play_video(VideoClip::Woohoo)?;
    caller.video_ended()?;
    caller.end()?;

    let mut client = caller.into_publisher();
    client.shutdown().await;
    tracing::info!("game over");
    Ok(())
}

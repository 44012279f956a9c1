//! # Screen
//!
//! A terminal screen: connects to a relay over WebSocket and prints the
//! mirrored game state every time the caller publishes.
//!
//! ## Running
//!
//! ```sh
//! # Start the relay (cargo run --bin bingo-relay), then:
//! cargo run --example screen
//!
//! # Override the relay URL:
//! BINGO_RELAY_URL=ws://my-relay:3536 cargo run --example screen
//! ```

use bingo_relay::{mirror, RelayClient, RelayClientConfig, WebSocketTransport};

/// Default relay URL when `BINGO_RELAY_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:3536";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("BINGO_RELAY_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    tracing::info!("Connecting to {url}");

    let transport = WebSocketTransport::connect(&url).await?;
    let (mut client, events) = RelayClient::start(transport, RelayClientConfig::new());
    let (mut view, mirror_task) = mirror::follow(events);

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    tracing::info!("Relay connection gone, exiting");
                    break;
                }
                let snapshot = view.borrow_and_update().clone();
                match snapshot.game_state() {
                    Ok(state) if !state.running => println!("Game not running"),
                    Ok(state) => {
                        if let Some(clip) = state.video {
                            println!("[playing {clip}]");
                        }
                        let recent: Vec<_> = state.recent_calls(5).collect();
                        match state.last_call() {
                            Some(n) => println!(
                                "{n}  {}  recent {recent:?}",
                                state.last_call_name().unwrap_or("")
                            ),
                            None => println!("Waiting for the first call"),
                        }
                    }
                    Err(e) => tracing::warn!("unreadable snapshot: {e}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    client.shutdown().await;
    mirror_task.abort();
    Ok(())
}

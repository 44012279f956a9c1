//! # bingo-relay
//!
//! Runs the WebSocket relay that carries game state from the caller to every
//! screen.
//!
//! ```sh
//! bingo-relay --bind 0.0.0.0:3536
//!
//! # Or through the environment:
//! BINGO_RELAY_BIND=0.0.0.0:3536 RUST_LOG=debug bingo-relay
//! ```

use bingo_relay::relay::{DEFAULT_ROOM, DEFAULT_ROOM_CAPACITY};
use bingo_relay::server::{RelayServer, RelayServerConfig, DEFAULT_BIND_ADDR};
use clap::Parser;

/// Relay game-state snapshots from a bingo caller to its screens.
#[derive(Debug, Parser)]
#[command(name = "bingo-relay", version, about)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "BINGO_RELAY_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    /// Room every connection joins.
    #[arg(long, env = "BINGO_RELAY_ROOM", default_value = DEFAULT_ROOM)]
    room: String,

    /// Snapshots buffered for a stalled screen before it skips to the newest.
    #[arg(long, env = "BINGO_RELAY_ROOM_CAPACITY", default_value_t = DEFAULT_ROOM_CAPACITY)]
    room_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = RelayServerConfig::new()
        .with_bind_addr(cli.bind)
        .with_room(cli.room)
        .with_room_capacity(cli.room_capacity);

    let server = RelayServer::bind(config).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("relay stopped");
    Ok(())
}

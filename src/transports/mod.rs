//! Transport implementations for the state relay.
//!
//! | Feature                | Transport              |
//! |------------------------|------------------------|
//! | (always)               | [`LoopbackTransport`]  |
//! | `transport-websocket`  | [`WebSocketTransport`] |
//!
//! # Example
//!
//! ```rust,ignore
//! # async fn example() -> Result<(), bingo_relay::BingoError> {
//! use bingo_relay::{Transport, WebSocketTransport};
//!
//! let mut ws = WebSocketTransport::connect("ws://localhost:3536").await?;
//! ws.send(r#"{"event":"ping"}"#.to_string()).await?;
//!
//! if let Some(Ok(msg)) = ws.recv().await {
//!     println!("relay said: {msg}");
//! }
//!
//! ws.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod loopback;

#[cfg(feature = "transport-websocket")]
pub mod websocket;

pub use loopback::{loopback_pair, LoopbackTransport};

#[cfg(feature = "transport-websocket")]
pub use websocket::WebSocketTransport;

//! Transport abstraction for the state relay.
//!
//! The [`Transport`] trait is a bidirectional text message channel. The relay
//! protocol uses JSON text messages, so every implementation handles framing
//! itself (WebSocket frames, in-process channels, and so on).
//!
//! The same trait serves both ends: [`RelayClient`](crate::client::RelayClient)
//! drives a transport connected to a relay, and
//! [`serve_connection`](crate::server::serve_connection) drives a transport
//! accepted by one.
//!
//! # Connection Setup
//!
//! Connection setup is NOT part of this trait. Construct a connected transport
//! externally, then pass it to `RelayClient::start` or `serve_connection`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use bingo_relay::error::BingoError;
//! use bingo_relay::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), BingoError> {
//!         // Send the JSON text message
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, BingoError>> {
//!         // Receive the next JSON text message; None on clean close
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), BingoError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::BingoError;

/// A bidirectional text message transport.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON message.
/// Each call to [`recv`](Transport::recv) returns one complete JSON message.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because it is used inside
/// `tokio::select!`. Channel-based implementations are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::TransportSend`] if the message could not be sent,
    /// or [`BingoError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), BingoError>;

    /// Receive the next JSON text message from the peer.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the peer closed the connection cleanly
    async fn recv(&mut self) -> Option<Result<String, BingoError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Resources are released
    /// regardless.
    async fn close(&mut self) -> Result<(), BingoError>;
}

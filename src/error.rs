//! Error types for the bingo relay.

use thiserror::Error;

/// Errors that can occur while driving, relaying, or mirroring game state.
#[derive(Debug, Error)]
pub enum BingoError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a message or snapshot.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted to publish while the relay connection is down.
    #[error("not connected to relay")]
    NotConnected,

    /// A game cannot start because the configured range is empty or larger
    /// than [`MAX_BOARD_SIZE`](crate::state::MAX_BOARD_SIZE).
    #[error(
        "invalid number range {min}..={max}: min must be less than max and the board at most {} numbers",
        crate::state::MAX_BOARD_SIZE
    )]
    InvalidRange {
        /// Configured lower bound.
        min: i32,
        /// Configured upper bound.
        max: i32,
    },

    /// A snapshot violates the `calls`/`available`/`all` partition.
    #[error("inconsistent game state: {0}")]
    InconsistentState(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for bingo relay operations.
pub type Result<T> = std::result::Result<T, BingoError>;

//! # Bingo Relay
//!
//! Real-time state synchronization for a two-screen bingo game: a *caller*
//! that draws numbers and a *screen* that shows them to the room.
//!
//! One authoritative [`GameState`] lives in the [`Caller`]. Every change is
//! computed by a pure [`reduce`](reducer::reduce) and then published as a
//! complete [`Snapshot`] to a single shared room. The relay fans each
//! snapshot out to every connected screen, and each screen's
//! [`ViewerMirror`] replaces its copy wholesale. There is no persistence,
//! no backlog for late joiners, and no conflict resolution: the latest
//! snapshot wins.
//!
//! ## Features
//!
//! - **Pure reducer**: `Start`, `Set` and `Call` transitions, testable without I/O
//! - **Transport-agnostic**: implement [`Transport`] for any backend
//! - **WebSocket built-in**: default `transport-websocket` feature provides `WebSocketTransport`
//! - **Relay server**: default `server` feature builds the `bingo-relay` binary
//!
//! ## Quick Start
//!
//! ```
//! use bingo_relay::{Caller, Relay, ViewerMirror};
//! use bingo_relay::relay::DEFAULT_ROOM;
//!
//! let relay = Relay::new();
//! let mut screen = relay.subscribe(DEFAULT_ROOM);
//! let mut caller = Caller::new(relay.publisher(DEFAULT_ROOM));
//!
//! caller.start().unwrap();
//! caller.call(0).unwrap();
//!
//! let mut mirror = ViewerMirror::new();
//! while let Some(snapshot) = screen.try_recv() {
//!     mirror.on_snapshot(snapshot);
//! }
//! assert_eq!(&mirror.game_state().unwrap(), caller.state());
//! ```

pub mod call_names;
pub mod caller;
pub mod client;
pub mod error;
pub mod event;
pub mod mirror;
pub mod protocol;
pub mod reducer;
pub mod relay;
pub mod server;
pub mod state;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use caller::{Caller, Publisher};
pub use client::{RelayClient, RelayClientConfig};
pub use error::BingoError;
pub use event::RelayEvent;
pub use mirror::ViewerMirror;
pub use protocol::{ClientMessage, ServerMessage, Snapshot};
pub use reducer::{Action, Update};
pub use relay::{Relay, Subscription};
pub use state::{GameState, VideoClip};
pub use transport::Transport;
pub use transports::{loopback_pair, LoopbackTransport};

#[cfg(feature = "transport-websocket")]
pub use server::RelayServer;
#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;

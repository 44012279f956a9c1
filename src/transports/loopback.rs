//! In-process transport built on tokio channels.
//!
//! [`loopback_pair`] returns two connected ends. Hand one to
//! [`RelayClient::start`](crate::client::RelayClient::start) and the other to
//! [`serve_connection`](crate::server::serve_connection) to run a caller, the
//! relay, and screens inside one process: handy for tests and demos.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BingoError;
use crate::transport::Transport;

/// One end of an in-process message pipe.
///
/// Closing either end makes the other end's [`recv`](Transport::recv) return
/// `None` once buffered messages are drained.
#[derive(Debug)]
pub struct LoopbackTransport {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Create a connected pair of loopback transports.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackTransport) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();

    let a = LoopbackTransport {
        tx: Some(a_tx),
        rx: a_rx,
    };
    let b = LoopbackTransport {
        tx: Some(b_tx),
        rx: b_rx,
    };
    (a, b)
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), BingoError> {
        let tx = self.tx.as_ref().ok_or(BingoError::TransportClosed)?;
        tx.send(message)
            .map_err(|e| BingoError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, BingoError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), BingoError> {
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_cross_in_both_directions() {
        let (mut a, mut b) = loopback_pair();
        a.send("to b".into()).await.unwrap();
        b.send("to a".into()).await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap(), "to b");
        assert_eq!(a.recv().await.unwrap().unwrap(), "to a");
    }

    #[tokio::test]
    async fn close_ends_peer_stream() {
        let (mut a, mut b) = loopback_pair();
        a.send("last".into()).await.unwrap();
        a.close().await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap(), "last");
        assert!(b.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let (mut a, _b) = loopback_pair();
        a.close().await.unwrap();
        let err = a.send("oops".into()).await.unwrap_err();
        assert!(matches!(err, BingoError::TransportClosed));
    }

    #[tokio::test]
    async fn send_to_dropped_peer_fails() {
        let (mut a, b) = loopback_pair();
        drop(b);
        let err = a.send("nobody".into()).await.unwrap_err();
        assert!(matches!(err, BingoError::TransportSend(_)));
    }
}

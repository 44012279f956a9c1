//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] works on both sides of the relay: callers and
//! screens use [`connect`](WebSocketTransport::connect), and the relay server
//! wraps each accepted socket with [`accept`](WebSocketTransport::accept).
//! Both `ws://` and `wss://` URLs are supported on the connecting side.
//!
//! # Feature gate
//!
//! Only available with the `transport-websocket` feature (enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), bingo_relay::BingoError> {
//! use bingo_relay::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:3536").await?;
//! transport.send(r#"{"event":"ping"}"#.to_string()).await?;
//!
//! if let Some(Ok(msg)) = transport.recv().await {
//!     println!("received: {msg}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::MaybeTlsStream;

use crate::error::BingoError;
use crate::transport::Transport;

/// Type alias for the underlying WebSocket stream.
///
/// Accepted server sockets are wrapped as [`MaybeTlsStream::Plain`] so both
/// sides share this one type.
pub type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: dropping its future before it
/// completes does not lose messages.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

fn io_error(e: tokio_tungstenite::tungstenite::Error) -> BingoError {
    let kind = match &e {
        tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
        _ => std::io::ErrorKind::Other,
    };
    BingoError::Io(std::io::Error::new(kind, e))
}

impl WebSocketTransport {
    /// Connect to a relay at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Io`] if the URL is invalid or the connection
    /// cannot be established. The underlying [`ErrorKind`](std::io::ErrorKind)
    /// is preserved for I/O failures.
    pub async fn connect(url: &str) -> Result<Self, BingoError> {
        tracing::debug!(url = %url, "connecting to relay");

        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(io_error)?;

        tracing::info!(url = %url, "relay connection established");

        Ok(Self::from_stream(stream))
    }

    /// Connect with a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Timeout`] if the deadline elapses, or any error
    /// that [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(
        url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, BingoError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| BingoError::Timeout)?
    }

    /// Complete the server side of the WebSocket handshake on an accepted
    /// TCP connection.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Io`] if the handshake fails.
    pub async fn accept(tcp: TcpStream) -> Result<Self, BingoError> {
        let stream = tokio_tungstenite::accept_async(MaybeTlsStream::Plain(tcp))
            .await
            .map_err(io_error)?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), BingoError> {
        if self.closed {
            return Err(BingoError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| BingoError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, BingoError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(BingoError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                // Never produced by the read half.
                Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), BingoError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| BingoError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, BingoError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, BingoError::Io(_)));
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        let err = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1",
            std::time::Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BingoError::Timeout));
    }

    /// Accept one connection with [`WebSocketTransport::accept`] and hand it
    /// to `handler`. Returns the URL to connect to.
    async fn start_accepting<F, Fut>(handler: F) -> String
    where
        F: FnOnce(WebSocketTransport) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let transport = WebSocketTransport::accept(tcp).await.unwrap();
            handler(transport).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn accepted_side_echoes_text() {
        let url = start_accepting(|mut server| async move {
            if let Some(Ok(text)) = server.recv().await {
                server.send(text).await.unwrap();
            }
            server.close().await.unwrap();
        })
        .await;

        let mut client = WebSocketTransport::connect(&url).await.unwrap();
        client.send("echo".to_string()).await.unwrap();
        assert_eq!(client.recv().await.unwrap().unwrap(), "echo");
        assert!(client.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let mut client = WebSocketTransport::connect(&format!("ws://{addr}"))
            .await
            .unwrap();
        assert_eq!(client.recv().await.unwrap().unwrap(), "after_binary");
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url = start_accepting(|mut server| async move {
            while let Some(Ok(_)) = server.recv().await {}
        })
        .await;

        let mut client = WebSocketTransport::connect(&url).await.unwrap();
        client.close().await.unwrap();
        client.close().await.unwrap();

        let err = client.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, BingoError::TransportClosed));
    }
}

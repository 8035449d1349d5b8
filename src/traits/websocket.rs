//! WebSocket connector trait abstraction.
//!
//! [`ControlChannel`](crate::websocket::ControlChannel) opens its socket
//! through this trait so tests can count, delay, or fail connection attempts
//! without a live backend.

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::websocket::ChannelError;

/// The socket type produced by a connector.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens a WebSocket to a URL.
///
/// One call is one connection attempt. Retry policy belongs to the caller.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn open(&self, url: &str) -> Result<WsStream, ChannelError>;
}

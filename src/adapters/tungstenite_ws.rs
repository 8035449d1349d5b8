//! Tungstenite-based WebSocket connector.

use async_trait::async_trait;
use tokio_tungstenite::connect_async;
use tracing::debug;

use crate::traits::{SocketConnector, WsStream};
use crate::websocket::ChannelError;

/// Opens `ws://` and `wss://` sockets with tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn open(&self, url: &str) -> Result<WsStream, ChannelError> {
        debug!(%url, "Opening WebSocket");
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| ChannelError::Open(e.to_string()))?;
        Ok(stream)
    }
}

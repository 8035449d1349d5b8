//! Common test utilities for integration tests.
//!
//! Fixtures plus a local WebSocket server standing in for the backend's
//! control socket.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;

use voicenav::auth::TokenPair;
use voicenav::config::AppConfig;

/// Token pair returned by the mocked backend.
pub fn test_tokens() -> TokenPair {
    TokenPair::new("test-access-token-12345", "test-refresh-token-67890")
}

/// Config for tests: ephemeral callback port, short grace, fast retries.
pub fn test_config(backend_url: &str) -> AppConfig {
    AppConfig::default()
        .with_backend_url(backend_url)
        .with_callback_port(0)
        .with_callback_shutdown_grace(Duration::from_millis(100))
        .with_connect_retries(3, Duration::from_millis(20))
}

/// Local control socket server.
///
/// Frames pushed with [`TestControlServer::push`] go to every open
/// connection. Frames the clients send are collected in arrival order.
pub struct TestControlServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicU32>,
    closed: Arc<AtomicU32>,
    outbound: broadcast::Sender<Message>,
    received: mpsc::UnboundedReceiver<Message>,
}

impl TestControlServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicU32::new(0));
        let closed = Arc::new(AtomicU32::new(0));
        let (outbound, _) = broadcast::channel(64);
        let (received_tx, received) = mpsc::unbounded_channel();

        let accepted = Arc::clone(&connections);
        let released = Arc::clone(&closed);
        let outbound_tx = outbound.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                // Subscribe before the handshake so the client cannot see
                // Connected before pushes reach this connection
                let mut outbound_rx = outbound_tx.subscribe();
                let received_tx = received_tx.clone();
                let accepted = Arc::clone(&accepted);
                let released = Arc::clone(&released);

                tokio::spawn(async move {
                    let ws = match tokio_tungstenite::accept_async(stream).await {
                        Ok(ws) => ws,
                        Err(_) => return,
                    };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let (mut sink, mut source) = ws.split();

                    loop {
                        tokio::select! {
                            pushed = outbound_rx.recv() => {
                                let Ok(message) = pushed else { break };
                                let closing = matches!(message, Message::Close(_));
                                if sink.send(message).await.is_err() || closing {
                                    break;
                                }
                            }
                            frame = source.next() => match frame {
                                Some(Ok(message)) => {
                                    let _ = received_tx.send(message);
                                }
                                _ => break,
                            },
                        }
                    }
                    released.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            connections,
            closed,
            outbound,
            received,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/control", self.addr)
    }

    /// Completed WebSocket handshakes so far.
    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Connections that have ended, from either side.
    pub fn closed_count(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait up to two seconds for `count` connections to have ended.
    pub async fn wait_closed(&self, count: u32) -> bool {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.closed_count() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    /// Send a frame to every open connection.
    pub fn push(&self, message: Message) {
        let _ = self.outbound.send(message);
    }

    /// Next frame a client sent, or `None` after two seconds.
    pub async fn next_received(&mut self) -> Option<Message> {
        tokio::time::timeout(Duration::from_secs(2), self.received.recv())
            .await
            .ok()
            .flatten()
    }
}

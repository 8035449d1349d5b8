//! Connectors for exercising the control channel's retry logic.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{SocketConnector, WsStream};
use crate::websocket::ChannelError;

/// Connector that always fails, counting attempts.
///
/// An optional delay holds each attempt open, which keeps a channel in
/// `Connecting` long enough to race a second `connect()` against it.
#[derive(Debug, Clone, Default)]
pub struct FailingConnector {
    attempts: Arc<AtomicU32>,
    delay: Duration,
}

impl FailingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            attempts: Arc::default(),
            delay,
        }
    }

    /// Number of `open` calls so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocketConnector for FailingConnector {
    async fn open(&self, url: &str) -> Result<WsStream, ChannelError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Err(ChannelError::Open(format!(
            "mock refused attempt {} to {}",
            attempt, url
        )))
    }
}

/// Wraps another connector and counts attempts.
pub struct CountingConnector<C> {
    inner: C,
    attempts: Arc<AtomicU32>,
}

impl<C: SocketConnector> CountingConnector<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            attempts: Arc::default(),
        }
    }

    /// Shared counter, readable after the connector moves into a channel.
    pub fn counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl<C: SocketConnector> SocketConnector for CountingConnector<C> {
    async fn open(&self, url: &str) -> Result<WsStream, ChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.open(url).await
    }
}

/// Wraps another connector and holds each successful socket for a delay
/// before handing it over.
///
/// The socket is already open on the server side during the delay, which
/// lets a `close()` land between open and install.
pub struct DelayedConnector<C> {
    inner: C,
    delay: Duration,
}

impl<C: SocketConnector> DelayedConnector<C> {
    pub fn new(inner: C, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<C: SocketConnector> SocketConnector for DelayedConnector<C> {
    async fn open(&self, url: &str) -> Result<WsStream, ChannelError> {
        let stream = self.inner.open(url).await?;
        tokio::time::sleep(self.delay).await;
        Ok(stream)
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::{self, BoxStream, SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::messages::ToolCallRequest;
use crate::adapters::TungsteniteConnector;
use crate::config::AppConfig;
use crate::traits::{SocketConnector, WsStream};

/// Default number of connection attempts per `connect()`.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default pause between connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Inbound frames buffered per subscriber before it starts losing them.
const INBOUND_CAPACITY: usize = 256;

/// Control channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A single socket-open attempt failed
    #[error("Failed to open socket: {0}")]
    Open(String),

    /// Every attempt of a `connect()` failed
    #[error("Connection failed after {attempts} attempts: {message}")]
    ConnectionFailed { attempts: u32, message: String },

    /// `close()` ran while the connection was being established
    #[error("Connection attempt cancelled")]
    Cancelled,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Attempt count and spacing for `connect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

type WsSink = SplitSink<WsStream, Message>;

/// One live socket.
struct Session {
    id: u64,
    /// Whole-frame writes go through this lock
    sink: Arc<tokio::sync::Mutex<WsSink>>,
    inbound: broadcast::Sender<String>,
    reader: JoinHandle<()>,
}

/// Everything guarded by the state lock.
struct Inner {
    session: Option<Session>,
    /// Bumped by every `close()`; connect attempts started under an older
    /// epoch are abandoned
    epoch: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ChannelState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called by a session's reader task when the socket ends on its own.
    fn end_session(&self, session_id: u64) {
        let ended = {
            let mut inner = self.lock();
            match &inner.session {
                Some(session) if session.id == session_id => {
                    let ended = inner.session.take();
                    self.state_tx.send_replace(ChannelState::Disconnected);
                    ended
                }
                _ => None,
            }
        };

        if ended.is_some() {
            info!(session_id, "Control channel session ended");
        }
    }
}

/// Single logical connection to the backend's control socket.
///
/// All methods take `&self`; share the channel behind an `Arc`. `connect()`
/// is single-flight: while one call is connecting or connected, further calls
/// return immediately. The state check and the move to `Connecting` happen
/// under one lock.
pub struct ControlChannel {
    url: String,
    connector: Arc<dyn SocketConnector>,
    policy: RetryPolicy,
    shared: Arc<Shared>,
    close_notify: Notify,
    next_session_id: AtomicU64,
}

impl ControlChannel {
    pub fn new(url: impl Into<String>, connector: Arc<dyn SocketConnector>) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        Self {
            url: url.into(),
            connector,
            policy: RetryPolicy::default(),
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    session: None,
                    epoch: 0,
                }),
                state_tx,
            }),
            close_notify: Notify::new(),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Channel to the configured control URL using tokio-tungstenite.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.control_url.clone(), Arc::new(TungsteniteConnector)).with_retry_policy(
            RetryPolicy {
                max_retries: config.connect_max_retries,
                retry_delay: config.connect_retry_delay,
            },
        )
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.shared.state_tx.subscribe()
    }

    /// Connect using the channel's retry policy.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        self.connect_with(self.policy.max_retries, self.policy.retry_delay)
            .await
    }

    /// Connect with up to `max_retries` attempts, `retry_delay` apart.
    ///
    /// Returns `Ok(())` without doing anything if the channel is already
    /// connected or another call is connecting. Exhausting the attempts
    /// leaves the channel `Disconnected`.
    pub async fn connect_with(
        &self,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<(), ChannelError> {
        let epoch = {
            let inner = self.shared.lock();
            let current = *self.shared.state_tx.borrow();
            if current != ChannelState::Disconnected {
                debug!(state = ?current, "connect() ignored, channel busy");
                return Ok(());
            }
            self.shared.state_tx.send_replace(ChannelState::Connecting);
            inner.epoch
        };

        let mut last_error = String::from("no attempts made");

        for attempt in 1..=max_retries {
            if self.closed_since(epoch) {
                debug!("Connect abandoned, channel closed");
                return Err(ChannelError::Cancelled);
            }

            match self.connector.open(&self.url).await {
                Ok(stream) => {
                    info!(url = %self.url, attempt, "Control channel connected");
                    return self.install_session(stream, epoch).await;
                }
                Err(e) => {
                    warn!(
                        url = %self.url,
                        attempt,
                        max_retries,
                        error = %e,
                        "Control channel connection attempt failed"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_retries && !self.wait_retry_delay(retry_delay, epoch).await {
                debug!("Retry delay interrupted by close()");
                return Err(ChannelError::Cancelled);
            }
        }

        {
            let inner = self.shared.lock();
            if inner.epoch != epoch {
                return Err(ChannelError::Cancelled);
            }
            self.shared.state_tx.send_replace(ChannelState::Disconnected);
        }

        error!(
            url = %self.url,
            attempts = max_retries,
            "Failed to connect control channel, giving up"
        );
        Err(ChannelError::ConnectionFailed {
            attempts: max_retries,
            message: last_error,
        })
    }

    /// Close any session, then connect with the channel's retry policy.
    pub async fn reconnect(&self) -> Result<(), ChannelError> {
        info!("Reconnecting control channel");
        self.close().await;
        self.connect().await
    }

    /// Inbound text frames from the current session.
    ///
    /// Empty when not connected. Otherwise every call gets its own stream,
    /// starting at the next frame received; it ends when the session closes.
    /// Frames arriving while the consumer is not draining are dropped once
    /// its buffer fills.
    pub fn receive_messages(&self) -> BoxStream<'static, String> {
        let rx = {
            let inner = self.shared.lock();
            match &inner.session {
                Some(session) => session.inbound.subscribe(),
                None => {
                    debug!("receive_messages() while disconnected");
                    return stream::empty().boxed();
                }
            }
        };

        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(text) => return Some((text, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Inbound consumer fell behind, frames dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    /// Write one tool call as a JSON text frame.
    ///
    /// Returns whether the frame was written. Not connected, serialization
    /// failures, and write failures are all logged and return `false`.
    pub async fn send_tool_call(&self, request: &ToolCallRequest) -> bool {
        let sink = {
            let inner = self.shared.lock();
            match &inner.session {
                Some(session) => Arc::clone(&session.sink),
                None => {
                    debug!(tool = %request.tool_name, "Not connected, dropping tool call");
                    return false;
                }
            }
        };

        let payload = match request.to_wire() {
            Ok(payload) => payload,
            Err(e) => {
                error!(tool = %request.tool_name, error = %e, "Failed to serialize tool call");
                return false;
            }
        };

        let mut sink = sink.lock().await;
        match sink.send(Message::Text(payload)).await {
            Ok(()) => {
                debug!(tool = %request.tool_name, "Sent tool call");
                true
            }
            Err(e) => {
                warn!(tool = %request.tool_name, error = %e, "Failed to send tool call");
                false
            }
        }
    }

    /// Close the session with a normal-closure frame and reset to
    /// `Disconnected`. Safe to call at any time, including repeatedly.
    pub async fn close(&self) {
        let session = {
            let mut inner = self.shared.lock();
            inner.epoch += 1;
            self.shared.state_tx.send_replace(ChannelState::Disconnected);
            inner.session.take()
        };
        self.close_notify.notify_waiters();

        let Some(session) = session else {
            debug!("close() with no session");
            return;
        };

        {
            let mut sink = session.sink.lock().await;
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            };
            if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                debug!(error = %e, "Close frame not delivered");
            }
            if let Err(e) = sink.close().await {
                debug!(error = %e, "Socket close failed");
            }
        }
        session.reader.abort();
        info!(session_id = session.id, "Control channel closed");
    }

    fn closed_since(&self, epoch: u64) -> bool {
        self.shared.lock().epoch != epoch
    }

    /// Sleep for `delay`, waking early on `close()`. Returns false if closed.
    async fn wait_retry_delay(&self, delay: Duration, epoch: u64) -> bool {
        let notified = self.close_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.closed_since(epoch) {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => !self.closed_since(epoch),
            _ = &mut notified => false,
        }
    }

    async fn install_session(&self, stream: WsStream, epoch: u64) -> Result<(), ChannelError> {
        let (sink, source) = stream.split();
        let sink = Arc::new(tokio::sync::Mutex::new(sink));

        {
            let mut inner = self.shared.lock();
            if inner.epoch == epoch {
                let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
                let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
                // The reader cannot end the session before it is installed:
                // it needs this lock to do so.
                let reader = tokio::spawn(read_frames(
                    id,
                    source,
                    inbound.clone(),
                    Arc::clone(&self.shared),
                ));
                inner.session = Some(Session {
                    id,
                    sink,
                    inbound,
                    reader,
                });
                self.shared.state_tx.send_replace(ChannelState::Connected);
                return Ok(());
            }
        }

        // close() ran while the socket was opening
        debug!("Discarding socket opened after close()");
        if let Err(e) = sink.lock().await.close().await {
            debug!(error = %e, "Discarded socket close failed");
        }
        Err(ChannelError::Cancelled)
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if let Some(session) = inner.session.take() {
            session.reader.abort();
        }
        self.shared.state_tx.send_replace(ChannelState::Disconnected);
    }
}

/// Pump inbound text frames into the session's broadcast channel.
async fn read_frames(
    session_id: u64,
    mut source: SplitStream<WsStream>,
    inbound: broadcast::Sender<String>,
    shared: Arc<Shared>,
) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                // No subscribers means nobody is draining; the frame is lost
                let _ = inbound.send(text);
            }
            Ok(Message::Close(frame)) => {
                info!(session_id, ?frame, "Received close frame from server");
                break;
            }
            Ok(_) => {
                // Binary, ping, pong and raw frames are not surfaced
            }
            Err(e) => {
                warn!(session_id, error = %e, "Control channel read error");
                break;
            }
        }
    }

    drop(inbound);
    shared.end_session(session_id);
}

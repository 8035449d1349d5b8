//! Loopback OAuth callback server.
//!
//! A short-lived HTTP listener on a fixed local port that captures the
//! browser redirect carrying the authorization code.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

/// Route the OAuth redirect URI points at.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Receives each authorization code. Runs on the blocking pool, never on the
/// request path.
pub type CodeCallback = Arc<dyn Fn(ReceivedCode) + Send + Sync>;

/// An authorization code and the listener that received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedCode {
    pub code: String,
    /// Pass to [`LoopbackCallbackServer::schedule_stop_generation`] to stop
    /// this listener and no later one
    pub server_generation: u64,
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>voicenav</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Login successful</h2>
<p>You can close this tab and return to voicenav.</p>
</body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>voicenav</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Login failed</h2>
<p>No authorization code was received. Return to voicenav and try logging in again.</p>
</body>
</html>"#;

/// Callback server errors.
#[derive(Debug, Error)]
pub enum CallbackServerError {
    /// The port could not be bound, usually because it is in use
    #[error("Failed to bind callback server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// This instance already has a listener
    #[error("Callback server is already running on port {0}")]
    AlreadyRunning(u16),

    /// `start` was called outside a tokio runtime
    #[error("Callback server requires a tokio runtime")]
    NoRuntime,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone)]
struct CallbackState {
    on_code: CodeCallback,
    generation: u64,
}

struct RunningServer {
    generation: u64,
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    runtime: Handle,
}

#[derive(Default)]
struct ServerSlot {
    running: Option<RunningServer>,
    generation: u64,
    /// Flips to true once the most recent listener is released
    stopped_rx: Option<watch::Receiver<bool>>,
}

impl ServerSlot {
    /// Stop the running server if it is still the given generation.
    fn stop_generation(&mut self, generation: Option<u64>) -> bool {
        let matches = match (&self.running, generation) {
            (Some(running), Some(generation)) => running.generation == generation,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return false;
        }

        if let Some(running) = self.running.take() {
            info!(addr = %running.addr, "Stopping callback server");
            // The serve task may already be gone; nothing left to signal then
            let _ = running.shutdown_tx.send(());
        }
        true
    }
}

/// Loopback HTTP listener for the OAuth redirect.
///
/// Holds zero or one running listener. `stop` is idempotent, and a delayed
/// self-stop only affects the listener that scheduled it, so the two can run
/// in either order.
#[derive(Clone, Default)]
pub struct LoopbackCallbackServer {
    slot: Arc<Mutex<ServerSlot>>,
}

impl LoopbackCallbackServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ServerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `127.0.0.1:port` and serve `GET /auth/callback`.
    ///
    /// Port 0 binds an ephemeral port; the bound address is returned. Must be
    /// called from within a tokio runtime. Does not block.
    pub fn start(
        &self,
        port: u16,
        on_code: CodeCallback,
    ) -> Result<SocketAddr, CallbackServerError> {
        let runtime = Handle::try_current().map_err(|_| CallbackServerError::NoRuntime)?;
        let mut slot = self.lock();

        if let Some(running) = &slot.running {
            return Err(CallbackServerError::AlreadyRunning(running.addr.port()));
        }

        let bind_err = |source| CallbackServerError::Bind { port, source };
        // IPv4 loopback only. Browsers resolving `localhost` to ::1 first fall
        // back to 127.0.0.1 when nothing listens there.
        let std_listener = StdTcpListener::bind(("127.0.0.1", port)).map_err(bind_err)?;
        std_listener.set_nonblocking(true).map_err(bind_err)?;
        let addr = std_listener.local_addr().map_err(bind_err)?;
        let listener = {
            let _guard = runtime.enter();
            tokio::net::TcpListener::from_std(std_listener).map_err(bind_err)?
        };

        let generation = slot.generation + 1;
        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(CallbackState {
                on_code,
                generation,
            });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (stopped_tx, stopped_rx) = watch::channel(false);

        runtime.spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Callback server error: {}", e);
            }
            debug!(%addr, "Callback server task finished");
            let _ = stopped_tx.send(true);
        });

        slot.generation = generation;
        slot.running = Some(RunningServer {
            generation,
            addr,
            shutdown_tx,
            runtime,
        });
        slot.stopped_rx = Some(stopped_rx);

        info!(%addr, "Callback server listening on http://{}{}", addr, CALLBACK_PATH);
        Ok(addr)
    }

    /// Stop the listener. No-op when nothing is running.
    pub fn stop(&self) {
        if !self.lock().stop_generation(None) {
            debug!("Callback server not running, nothing to stop");
        }
    }

    /// Stop the current listener after `grace`.
    ///
    /// If the listener is stopped and a new one started in the meantime, the
    /// new one is left alone.
    pub fn schedule_stop(&self, grace: Duration) {
        let generation = match &self.lock().running {
            Some(running) => running.generation,
            None => return,
        };
        self.schedule_stop_generation(generation, grace);
    }

    /// Stop the listener of the given generation after `grace`.
    ///
    /// No-op if that listener is already gone, even when a newer one runs.
    pub fn schedule_stop_generation(&self, generation: u64, grace: Duration) {
        let runtime = match &self.lock().running {
            Some(running) if running.generation == generation => running.runtime.clone(),
            _ => {
                debug!(generation, "Callback server generation already stopped");
                return;
            }
        };

        debug!(?grace, generation, "Scheduling callback server shutdown");
        let slot = Arc::clone(&self.slot);
        runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .stop_generation(Some(generation));
        });
    }

    pub fn is_running(&self) -> bool {
        self.lock().running.is_some()
    }

    /// Address of the running listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().running.as_ref().map(|running| running.addr)
    }

    /// Resolve once the most recently started listener has released its
    /// socket. Returns immediately if none was ever started.
    pub async fn wait_stopped(&self) {
        let stopped_rx = self.lock().stopped_rx.clone();
        if let Some(mut stopped_rx) = stopped_rx {
            // A dropped sender means the serve task is gone too
            let _ = stopped_rx.wait_for(|stopped| *stopped).await;
        }
    }
}

impl Drop for ServerSlot {
    fn drop(&mut self) {
        self.stop_generation(None);
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    if let Some(error) = &params.error {
        warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Authorization provider returned an error"
        );
        return (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE));
    }

    match params.code.filter(|code| !code.is_empty()) {
        Some(code) => {
            info!("Received authorization code");
            let on_code = Arc::clone(&state.on_code);
            let received = ReceivedCode {
                code,
                server_generation: state.generation,
            };
            tokio::task::spawn_blocking(move || on_code(received));
            (StatusCode::OK, Html(SUCCESS_PAGE))
        }
        None => {
            warn!("Callback request without an authorization code");
            (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE))
        }
    }
}

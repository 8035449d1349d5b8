//! OAuth authorization-code login flow.
//!
//! [`AuthSessionManager`] opens the authorization URL in the system browser,
//! runs the loopback callback server, exchanges the received code for tokens,
//! persists them and notifies the caller.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::callback_server::{
    CallbackServerError, CodeCallback, LoopbackCallbackServer, ReceivedCode,
};
use super::tokens::TokenPair;
use crate::config::AppConfig;
use crate::traits::{AuthRepository, BrowserLauncher, TokenStore, TokenStoreError};

/// Receives the token pair after a successful login.
pub type TokenCallback = Arc<dyn Fn(TokenPair) + Send + Sync>;

/// Login flow state.
///
/// `Idle → AwaitingRedirect → ExchangePending → Authenticated`, or
/// `ExchangePending → ExchangeFailed`. A failed attempt accepts a fresh
/// redirect or a new `login()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    AwaitingRedirect,
    ExchangePending,
    Authenticated,
    ExchangeFailed { reason: String },
}

impl LoginState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoginState::Authenticated | LoginState::ExchangeFailed { .. }
        )
    }
}

/// What `login()` managed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    /// Authorization URL, for the user to open by hand if needed
    pub url: String,
    /// Whether the system browser accepted the URL
    pub browser_opened: bool,
}

/// Drives the browser-delegated OAuth login.
pub struct AuthSessionManager {
    backend_url: String,
    oauth_provider: String,
    callback_port: u16,
    shutdown_grace: Duration,
    repository: Arc<dyn AuthRepository>,
    token_store: Arc<dyn TokenStore>,
    browser: Arc<dyn BrowserLauncher>,
    server: LoopbackCallbackServer,
    state: Arc<SessionState>,
}

/// Login state plus the id of the current attempt.
///
/// State changes from an exchange go through `update_if_current`, so an
/// exchange left over from an earlier attempt cannot touch a newer one.
struct SessionState {
    tx: watch::Sender<LoginState>,
    attempt: Mutex<u64>,
}

impl SessionState {
    fn attempt(&self) -> MutexGuard<'_, u64> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new attempt and return its id.
    fn next_attempt(&self, state: LoginState) -> (u64, LoginState) {
        let mut attempt = self.attempt();
        *attempt += 1;
        (*attempt, self.tx.send_replace(state))
    }

    /// Undo `next_attempt` when no newer attempt has started since, so a
    /// server that is already running keeps accepting codes.
    fn rollback_attempt(&self, attempt_id: u64, previous: LoginState) {
        let mut attempt = self.attempt();
        if *attempt == attempt_id {
            *attempt -= 1;
            self.tx.send_replace(previous);
        }
    }

    fn update_if_current<F>(&self, attempt_id: u64, modify: F) -> bool
    where
        F: FnOnce(&mut LoginState) -> bool,
    {
        let attempt = self.attempt();
        if *attempt != attempt_id {
            return false;
        }
        self.tx.send_if_modified(modify)
    }
}

impl AuthSessionManager {
    pub fn new(
        config: &AppConfig,
        repository: Arc<dyn AuthRepository>,
        token_store: Arc<dyn TokenStore>,
        browser: Arc<dyn BrowserLauncher>,
    ) -> Self {
        let (tx, _) = watch::channel(LoginState::Idle);
        Self {
            backend_url: config.backend_url.trim_end_matches('/').to_string(),
            oauth_provider: config.oauth_provider.clone(),
            callback_port: config.callback_port,
            shutdown_grace: config.callback_shutdown_grace,
            repository,
            token_store,
            browser,
            server: LoopbackCallbackServer::new(),
            state: Arc::new(SessionState {
                tx,
                attempt: Mutex::new(0),
            }),
        }
    }

    /// `{backend}/oauth2/authorization/{provider}`
    pub fn authorization_url(&self) -> String {
        format!(
            "{}/oauth2/authorization/{}",
            self.backend_url,
            urlencoding::encode(&self.oauth_provider)
        )
    }

    pub fn state(&self) -> LoginState {
        self.state.tx.borrow().clone()
    }

    /// Subscribe to login state changes
    pub fn subscribe(&self) -> watch::Receiver<LoginState> {
        self.state.tx.subscribe()
    }

    pub fn callback_server(&self) -> &LoopbackCallbackServer {
        &self.server
    }

    /// Open the authorization URL in the system browser.
    ///
    /// Never blocks on the redirect. A browser that cannot be launched is
    /// logged and reported through `browser_opened`; the user can still open
    /// the returned URL by hand.
    pub fn login(&self) -> LoginStart {
        let url = self.authorization_url();

        self.state.tx.send_if_modified(|state| match state {
            LoginState::ExchangePending | LoginState::AwaitingRedirect => false,
            _ => {
                *state = LoginState::AwaitingRedirect;
                true
            }
        });

        match self.browser.open(&url) {
            Ok(()) => {
                info!(%url, "Opened authorization URL in browser");
                LoginStart {
                    url,
                    browser_opened: true,
                }
            }
            Err(e) => {
                warn!(%url, error = %e, "Could not open browser, open the URL manually");
                LoginStart {
                    url,
                    browser_opened: false,
                }
            }
        }
    }

    /// Start the loopback server that completes the login.
    ///
    /// Each received code is exchanged on its own task. On success the pair
    /// is saved, `on_token_received` runs, and the server stops itself after
    /// the configured grace delay. On failure nothing is retried and the
    /// server keeps listening.
    ///
    /// `on_token_received` fires at most once per login attempt: codes that
    /// arrive while an exchange is pending, or after success, are ignored.
    /// Each call starts a new attempt. An exchange still running from an
    /// earlier attempt completes, but leaves the state and the new server
    /// alone.
    pub fn start_callback_server(
        &self,
        on_token_received: TokenCallback,
    ) -> Result<SocketAddr, CallbackServerError> {
        let (attempt_id, previous) = self.state.next_attempt(LoginState::AwaitingRedirect);

        let exchange = ExchangeContext {
            attempt_id,
            server_generation: 0,
            repository: Arc::clone(&self.repository),
            token_store: Arc::clone(&self.token_store),
            server: self.server.clone(),
            state: Arc::clone(&self.state),
            shutdown_grace: self.shutdown_grace,
            on_token_received,
        };

        let on_code: CodeCallback = Arc::new(move |received: ReceivedCode| {
            if !exchange.begin() {
                debug!("Ignoring authorization code, no login attempt is waiting for one");
                return;
            }
            let exchange = ExchangeContext {
                server_generation: received.server_generation,
                ..exchange.clone()
            };
            tokio::spawn(async move { exchange.run(received.code).await });
        });

        match self.server.start(self.callback_port, on_code) {
            Ok(addr) => Ok(addr),
            Err(e) => {
                error!(error = %e, "Failed to start callback server");
                self.state.rollback_attempt(attempt_id, previous);
                Err(e)
            }
        }
    }

    /// Stop the callback server. Safe to call at any time, from any thread.
    pub fn stop_callback_server(&self) {
        self.server.stop();
    }

    /// Clear both stored tokens and reset to `Idle`.
    pub async fn logout(&self) -> Result<(), TokenStoreError> {
        self.server.stop();
        self.token_store.clear().await?;
        self.state.next_attempt(LoginState::Idle);
        info!("Logged out");
        Ok(())
    }
}

impl Drop for AuthSessionManager {
    fn drop(&mut self) {
        // The serve task keeps the server alive on its own
        self.server.stop();
    }
}

/// Everything a code exchange needs, detached from the manager so it can
/// outlive the server that received the code.
#[derive(Clone)]
struct ExchangeContext {
    attempt_id: u64,
    /// Listener that received the code; only this one is self-stopped
    server_generation: u64,
    repository: Arc<dyn AuthRepository>,
    token_store: Arc<dyn TokenStore>,
    server: LoopbackCallbackServer,
    state: Arc<SessionState>,
    shutdown_grace: Duration,
    on_token_received: TokenCallback,
}

impl ExchangeContext {
    /// Claim the exchange slot. Atomic, so two redirects cannot both start
    /// an exchange.
    fn begin(&self) -> bool {
        self.state.update_if_current(self.attempt_id, |state| match state {
            LoginState::Idle | LoginState::AwaitingRedirect | LoginState::ExchangeFailed { .. } => {
                *state = LoginState::ExchangePending;
                true
            }
            LoginState::ExchangePending | LoginState::Authenticated => false,
        })
    }

    async fn run(self, code: String) {
        let tokens = match self.repository.exchange_code_for_token(&code).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(error = %e, "Authorization code exchange failed");
                self.fail(e.to_string());
                return;
            }
        };

        if let Err(e) = self.token_store.save(&tokens).await {
            error!(error = %e, "Failed to persist tokens");
            self.fail(format!("could not save tokens: {}", e));
            return;
        }

        info!("Login complete");
        // Callback first, so anyone watching for Authenticated sees its effects
        (self.on_token_received)(tokens);
        let current = self.state.update_if_current(self.attempt_id, |state| {
            *state = LoginState::Authenticated;
            true
        });
        if !current {
            debug!(attempt = self.attempt_id, "Login attempt superseded, state left alone");
        }
        self.server
            .schedule_stop_generation(self.server_generation, self.shutdown_grace);
    }

    fn fail(&self, reason: String) {
        self.state.update_if_current(self.attempt_id, |state| {
            *state = LoginState::ExchangeFailed { reason };
            true
        });
    }
}

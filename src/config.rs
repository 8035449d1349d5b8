//! Application configuration.
//!
//! [`AppConfig`] is built once at startup and passed by reference to every
//! component that needs it.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Default OAuth provider registered with the backend.
pub const DEFAULT_OAUTH_PROVIDER: &str = "google";

/// Fixed loopback port the OAuth redirect URI points at.
pub const DEFAULT_CALLBACK_PORT: u16 = 8765;

/// Default control socket URL.
pub const DEFAULT_CONTROL_URL: &str = "ws://localhost:8080/control";

/// Time the callback server stays up after a successful exchange, so the
/// success page reaches the browser before the socket closes.
pub const DEFAULT_CALLBACK_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Configuration for the login flow and the control channel.
///
/// # Example
///
/// ```ignore
/// use voicenav::config::AppConfig;
///
/// let config = AppConfig::default()
///     .with_backend_url("https://nav.example.com")
///     .with_callback_port(9000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Backend base URL, used for the authorization URL and code exchange
    pub backend_url: String,
    /// OAuth provider path segment
    pub oauth_provider: String,
    /// Loopback callback port
    pub callback_port: u16,
    /// Delay before the callback server stops itself after a login
    pub callback_shutdown_grace: Duration,
    /// Control socket URL (`ws://` or `wss://`)
    pub control_url: String,
    /// Connection attempts per `connect()`
    pub connect_max_retries: u32,
    /// Pause between connection attempts
    pub connect_retry_delay: Duration,
    /// Override for the token file location
    pub token_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            oauth_provider: DEFAULT_OAUTH_PROVIDER.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            callback_shutdown_grace: DEFAULT_CALLBACK_SHUTDOWN_GRACE,
            control_url: DEFAULT_CONTROL_URL.to_string(),
            connect_max_retries: crate::websocket::DEFAULT_MAX_RETRIES,
            connect_retry_delay: crate::websocket::DEFAULT_RETRY_DELAY,
            token_file: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_oauth_provider(mut self, provider: impl Into<String>) -> Self {
        self.oauth_provider = provider.into();
        self
    }

    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_callback_shutdown_grace(mut self, grace: Duration) -> Self {
        self.callback_shutdown_grace = grace;
        self
    }

    pub fn with_control_url(mut self, url: impl Into<String>) -> Self {
        self.control_url = url.into();
        self
    }

    pub fn with_connect_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.connect_max_retries = max_retries;
        self.connect_retry_delay = retry_delay;
        self
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    /// Build config from `VOICENAV_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable source.
    ///
    /// Unset variables keep their defaults. Unparseable numbers are logged
    /// and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("VOICENAV_BACKEND_URL") {
            config = config.with_backend_url(url);
        }
        if let Some(provider) = lookup("VOICENAV_OAUTH_PROVIDER") {
            config.oauth_provider = provider;
        }
        if let Some(port) = parse_var(&lookup, "VOICENAV_CALLBACK_PORT") {
            config.callback_port = port;
        }
        if let Some(url) = lookup("VOICENAV_CONTROL_URL") {
            config.control_url = url;
        }
        if let Some(retries) = parse_var(&lookup, "VOICENAV_CONNECT_RETRIES") {
            config.connect_max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "VOICENAV_RETRY_DELAY_MS") {
            config.connect_retry_delay = Duration::from_millis(ms);
        }
        if let Some(path) = lookup("VOICENAV_TOKEN_FILE") {
            config.token_file = Some(PathBuf::from(path));
        }

        config
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable config value");
            None
        }
    }
}

//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`FileTokenStore`] - File-based token storage
//! - [`HttpAuthRepository`] - Code exchange over HTTP using reqwest
//! - [`SystemBrowser`] / [`UnsupportedBrowser`] - Platform browser launchers
//! - [`TungsteniteConnector`] - WebSocket using tokio-tungstenite
//!
//! The [`mock`] submodule provides test doubles for all of them.

pub mod file_tokens;
pub mod http_auth;
pub mod mock;
pub mod system_browser;
pub mod tungstenite_ws;

pub use file_tokens::FileTokenStore;
pub use http_auth::{HttpAuthRepository, TOKEN_EXCHANGE_PATH};
#[cfg(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "windows",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
pub use system_browser::SystemBrowser;
pub use system_browser::{default_browser, UnsupportedBrowser};
pub use tungstenite_ws::TungsteniteConnector;

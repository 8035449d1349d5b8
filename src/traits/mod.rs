//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`TokenStore`] - Access/refresh token persistence
//! - [`AuthRepository`] - Authorization-code exchange
//! - [`BrowserLauncher`] - Opening the system browser
//! - [`SocketConnector`] - Opening the control WebSocket

pub mod auth_repository;
pub mod browser;
pub mod token_store;
pub mod websocket;

pub use auth_repository::{AuthError, AuthRepository};
pub use browser::{BrowserError, BrowserLauncher};
pub use token_store::{TokenStore, TokenStoreError};
pub use websocket::{SocketConnector, WsStream};

//! Mock implementations for testing.
//!
//! These implement the traits in `crate::traits` without touching the
//! network, the filesystem, or the desktop.
//!
//! # Available Mocks
//!
//! - [`InMemoryTokenStore`] - In-memory token storage
//! - [`MockAuthRepository`] - Scripted code exchange
//! - [`RecordingBrowser`] - Records URLs instead of opening them
//! - [`FailingConnector`] / [`CountingConnector`] / [`DelayedConnector`] -
//!   Connection attempt control

pub mod auth_repository;
pub mod browser;
pub mod connector;
pub mod tokens;

pub use auth_repository::MockAuthRepository;
pub use browser::RecordingBrowser;
pub use connector::{CountingConnector, DelayedConnector, FailingConnector};
pub use tokens::InMemoryTokenStore;

//! Browser launch capability.
//!
//! Launching the system browser is platform specific. Each target gets one
//! implementation, chosen at build time by
//! [`default_browser`](crate::adapters::default_browser).

use thiserror::Error;

/// Browser launch errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    /// No browser launcher exists for this target
    #[error("Opening a browser is not supported on this platform")]
    Unsupported,

    /// The platform launcher ran but failed
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),
}

/// Opens a URL in the user's browser.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<(), BrowserError>;
}

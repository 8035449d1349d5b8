//! Platform browser launchers.
//!
//! Desktop targets get [`SystemBrowser`], which defers to the OS default
//! handler through the `open` crate. Every other target gets
//! [`UnsupportedBrowser`], which fails with [`BrowserError::Unsupported`].

use std::sync::Arc;

use crate::traits::{BrowserError, BrowserLauncher};

/// Opens URLs with the operating system's default browser.
#[cfg(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "windows",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

#[cfg(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "windows",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), BrowserError> {
        open::that(url).map_err(|e| BrowserError::LaunchFailed(e.to_string()))
    }
}

/// Launcher for targets with no browser integration.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBrowser;

impl BrowserLauncher for UnsupportedBrowser {
    fn open(&self, _url: &str) -> Result<(), BrowserError> {
        Err(BrowserError::Unsupported)
    }
}

/// The launcher for the target this binary was built for.
pub fn default_browser() -> Arc<dyn BrowserLauncher> {
    #[cfg(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "windows",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    ))]
    {
        Arc::new(SystemBrowser)
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "windows",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    )))]
    {
        Arc::new(UnsupportedBrowser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_browser_fails_fast() {
        let browser = UnsupportedBrowser;
        assert_eq!(
            browser.open("http://localhost/"),
            Err(BrowserError::Unsupported)
        );
    }
}

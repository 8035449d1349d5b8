//! Recording browser launcher for testing.

use std::sync::{Arc, Mutex, PoisonError};

use crate::traits::{BrowserError, BrowserLauncher};

/// Records every URL it is asked to open instead of launching anything.
#[derive(Debug, Clone, Default)]
pub struct RecordingBrowser {
    opened: Arc<Mutex<Vec<String>>>,
    failure: Option<BrowserError>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose every `open` fails with `error` (URLs are still recorded).
    pub fn failing(error: BrowserError) -> Self {
        Self {
            opened: Arc::default(),
            failure: Some(error),
        }
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &str) -> Result<(), BrowserError> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

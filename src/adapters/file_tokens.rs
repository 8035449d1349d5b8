//! File-based token store adapter.
//!
//! Wraps [`TokenFile`] and implements [`TokenStore`]. File IO runs on the
//! blocking pool so callers on the async runtime never stall on disk.

use async_trait::async_trait;

use crate::auth::{TokenFile, TokenPair};
use crate::traits::{TokenStore, TokenStoreError};

/// Token store backed by `~/.voicenav/tokens.json`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    file: TokenFile,
}

impl FileTokenStore {
    /// Create a store in the user's home directory.
    pub fn new() -> Result<Self, TokenStoreError> {
        TokenFile::new()
            .map(|file| Self { file })
            .ok_or(TokenStoreError::NoHomeDirectory)
    }

    /// Create a store at an explicit path.
    pub fn with_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            file: TokenFile::with_path(path),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    async fn run<T, F>(&self, op: F) -> Result<T, TokenStoreError>
    where
        T: Send + 'static,
        F: FnOnce(TokenFile) -> Result<T, TokenStoreError> + Send + 'static,
    {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || op(file))
            .await
            .map_err(|e| TokenStoreError::Other(format!("token file task failed: {}", e)))?
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        let tokens = tokens.clone();
        self.run(move |file| file.save(&tokens)).await
    }

    async fn load(&self) -> Result<Option<TokenPair>, TokenStoreError> {
        self.run(|file| file.load()).await
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        self.run(|file| file.clear()).await
    }
}

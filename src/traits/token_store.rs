//! Token store trait abstraction.
//!
//! Provides a trait-based abstraction over the key/value preference store
//! that holds the access and refresh tokens.

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::TokenPair;

/// Token store operation errors.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// Could not locate the user's home directory
    #[error("Failed to determine home directory")]
    NoHomeDirectory,

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("Token store error: {0}")]
    Other(String),
}

/// Persistence for the access/refresh token pair.
///
/// Implementations hold no business logic: they write both values together,
/// read them back, and clear both together.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Overwrite both tokens.
    async fn save(&self, tokens: &TokenPair) -> Result<(), TokenStoreError>;

    /// Load the stored pair, `Ok(None)` when logged out.
    async fn load(&self) -> Result<Option<TokenPair>, TokenStoreError>;

    /// Remove both tokens.
    async fn clear(&self) -> Result<(), TokenStoreError>;

    /// The stored access token, if any.
    async fn access_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.load().await?.map(|tokens| tokens.access_token))
    }

    /// The stored refresh token, if any.
    async fn refresh_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.load().await?.map(|tokens| tokens.refresh_token))
    }
}

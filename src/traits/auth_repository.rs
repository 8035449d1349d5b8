//! Authorization-code exchange trait abstraction.

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::TokenPair;

/// Errors from exchanging an authorization code for tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The HTTP request itself failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status
    #[error("Token endpoint returned {status}: {message}")]
    ServerError { status: u16, message: String },

    /// The response body was not a usable token pair
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Other error
    #[error("Token exchange failed: {0}")]
    Other(String),
}

/// Exchanges an authorization code for a [`TokenPair`].
///
/// The code is single-use; implementations must not retry on their own.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn exchange_code_for_token(&self, code: &str) -> Result<TokenPair, AuthError>;
}

//! reqwest-based authorization-code exchange.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::auth::TokenPair;
use crate::traits::{AuthError, AuthRepository};

/// Path of the backend's code-exchange endpoint.
pub const TOKEN_EXCHANGE_PATH: &str = "/api/auth/token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Exchanges authorization codes against the voicenav backend.
///
/// POST {base_url}/api/auth/token with `{"code": "..."}`; a 2xx response
/// carries `{"accessToken": "...", "refreshToken": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpAuthRepository {
    base_url: String,
    client: Client,
}

impl HttpAuthRepository {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AuthRepository for HttpAuthRepository {
    async fn exchange_code_for_token(&self, code: &str) -> Result<TokenPair, AuthError> {
        let url = format!("{}{}", self.base_url, TOKEN_EXCHANGE_PATH);
        debug!(%url, "Exchanging authorization code");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AuthError::ServerError { status, message });
        }

        let body = response.text().await?;
        let tokens: TokenPair = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        if tokens.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "empty access token".to_string(),
            ));
        }

        Ok(tokens)
    }
}

//! Scripted auth repository for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::auth::TokenPair;
use crate::traits::{AuthError, AuthRepository};

/// Auth repository that replays scripted outcomes.
///
/// Queued outcomes are consumed first; once the queue is empty every call
/// gets the fallback outcome. Every code received is recorded.
#[derive(Debug, Clone)]
pub struct MockAuthRepository {
    queued: Arc<Mutex<VecDeque<Result<TokenPair, String>>>>,
    fallback: Result<TokenPair, String>,
    received_codes: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl MockAuthRepository {
    /// Every exchange succeeds with `tokens`.
    pub fn succeeding(tokens: TokenPair) -> Self {
        Self::with_fallback(Ok(tokens))
    }

    /// Every exchange fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_fallback(Err(message.into()))
    }

    fn with_fallback(fallback: Result<TokenPair, String>) -> Self {
        Self {
            queued: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            received_codes: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    /// Queue a one-off outcome ahead of the fallback.
    pub fn push_outcome(&self, outcome: Result<TokenPair, String>) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Delay every exchange, simulating a slow backend.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Codes passed to `exchange_code_for_token`, in call order.
    pub fn received_codes(&self) -> Vec<String> {
        self.received_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuthRepository for MockAuthRepository {
    async fn exchange_code_for_token(&self, code: &str) -> Result<TokenPair, AuthError> {
        self.received_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(code.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        outcome.map_err(AuthError::Other)
    }
}

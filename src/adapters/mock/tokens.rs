//! In-memory token store for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::auth::TokenPair;
use crate::traits::{TokenStore, TokenStoreError};

/// Token store that keeps the pair in memory.
///
/// # Example
///
/// ```ignore
/// use voicenav::adapters::mock::InMemoryTokenStore;
/// use voicenav::traits::TokenStore;
///
/// let store = InMemoryTokenStore::new();
/// store.save(&TokenPair::new("a", "r")).await?;
/// assert_eq!(store.get_tokens(), Some(TokenPair::new("a", "r")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<Mutex<Option<TokenPair>>>,
    save_should_fail: Arc<AtomicBool>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a pair.
    pub fn with_tokens(tokens: TokenPair) -> Self {
        let store = Self::new();
        store.set_tokens(Some(tokens));
        store
    }

    /// Configure whether save should fail.
    pub fn set_save_should_fail(&self, should_fail: bool) {
        self.save_should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Current contents, read synchronously.
    pub fn get_tokens(&self) -> Option<TokenPair> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_tokens(&self, tokens: Option<TokenPair>) {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = tokens;
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        if self.save_should_fail.load(Ordering::SeqCst) {
            return Err(TokenStoreError::Other("Mock save failure".to_string()));
        }
        self.set_tokens(Some(tokens.clone()));
        Ok(())
    }

    async fn load(&self) -> Result<Option<TokenPair>, TokenStoreError> {
        Ok(self.get_tokens())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        self.set_tokens(None);
        Ok(())
    }
}

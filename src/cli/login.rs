//! Login and logout commands.

use std::sync::Arc;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use tracing::info;

use crate::adapters::{default_browser, FileTokenStore, HttpAuthRepository};
use crate::auth::{AuthSessionManager, LoginState, TokenCallback};
use crate::config::AppConfig;
use crate::traits::TokenStore;

/// Token store at the configured path, or `~/.voicenav/tokens.json`.
pub fn token_store_for(config: &AppConfig) -> Result<FileTokenStore> {
    match &config.token_file {
        Some(path) => Ok(FileTokenStore::with_path(path.clone())),
        None => FileTokenStore::new().wrap_err("Could not locate the token file"),
    }
}

/// Run the browser login and wait until it completes or the user gives up.
pub async fn handle_login_command(config: &AppConfig) -> Result<()> {
    let store = token_store_for(config)?;
    println!("Tokens will be saved to {}", store.path().display());

    let manager = AuthSessionManager::new(
        config,
        Arc::new(HttpAuthRepository::new(config.backend_url.clone())),
        Arc::new(store),
        default_browser(),
    );

    let on_token: TokenCallback = Arc::new(|_tokens| {
        info!("Received token pair");
    });
    let addr = manager
        .start_callback_server(on_token)
        .wrap_err("Could not start the login callback server")?;
    info!(%addr, "Waiting for the OAuth redirect");

    let start = manager.login();
    if start.browser_opened {
        println!("Continue in your browser. If nothing opened, visit:");
    } else {
        println!("Open this URL in your browser to sign in:");
    }
    println!("  {}", start.url);

    let mut state_rx = manager.subscribe();
    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return Err(eyre!("Login state channel closed"));
                }
                let state = state_rx.borrow_and_update().clone();
                match state {
                    LoginState::Authenticated => break,
                    LoginState::ExchangeFailed { reason } => {
                        eprintln!("Sign-in failed: {}", reason);
                        eprintln!("Retry from the browser, or press Ctrl-C to give up.");
                    }
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                manager.stop_callback_server();
                return Err(eyre!("Login cancelled"));
            }
        }
    }

    // Let the success page reach the browser before exiting
    manager.callback_server().wait_stopped().await;
    println!("Signed in.");
    Ok(())
}

/// Remove both stored tokens.
pub async fn handle_logout_command(config: &AppConfig) -> Result<()> {
    let store = token_store_for(config)?;
    store
        .clear()
        .await
        .wrap_err("Could not remove stored tokens")?;
    println!("Signed out.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenPair;
    use tempfile::tempdir;

    #[test]
    fn test_token_store_uses_configured_path() {
        let config = AppConfig::default().with_token_file("/tmp/voicenav-test/tokens.json");
        let store = token_store_for(&config).unwrap();
        assert_eq!(
            store.path(),
            std::path::Path::new("/tmp/voicenav-test/tokens.json")
        );
    }

    #[tokio::test]
    async fn test_logout_removes_token_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let config = AppConfig::default().with_token_file(&path);

        let store = token_store_for(&config).unwrap();
        store.save(&TokenPair::new("a", "r")).await.unwrap();
        assert!(path.exists());

        handle_logout_command(&config).await.unwrap();

        assert!(store.load().await.unwrap().is_none());
    }
}

//! End-to-end login: browser redirect, code exchange against a mocked
//! backend, token persistence and callback server shutdown.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{test_config, test_tokens};
use voicenav::adapters::mock::{InMemoryTokenStore, MockAuthRepository, RecordingBrowser};
use voicenav::adapters::{FileTokenStore, HttpAuthRepository, TOKEN_EXCHANGE_PATH};
use voicenav::auth::{AuthSessionManager, LoginState, TokenCallback, TokenPair};
use voicenav::traits::TokenStore;

struct Harness {
    _dir: TempDir,
    backend: MockServer,
    store: Arc<FileTokenStore>,
    browser: RecordingBrowser,
    manager: AuthSessionManager,
    received: Arc<Mutex<Vec<TokenPair>>>,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let backend = MockServer::start().await;
        let store = Arc::new(FileTokenStore::with_path(dir.path().join("tokens.json")));
        let browser = RecordingBrowser::new();
        let manager = AuthSessionManager::new(
            &test_config(&backend.uri()),
            Arc::new(HttpAuthRepository::new(backend.uri())),
            store.clone(),
            Arc::new(browser.clone()),
        );
        Self {
            _dir: dir,
            backend,
            store,
            browser,
            manager,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on_token(&self) -> TokenCallback {
        let received = Arc::clone(&self.received);
        Arc::new(move |tokens| received.lock().unwrap().push(tokens))
    }

    async fn wait_for_state(&self, wanted: fn(&LoginState) -> bool) -> LoginState {
        let mut state_rx = self.manager.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(5), state_rx.wait_for(|s| wanted(s)))
            .await
            .expect("timed out waiting for login state")
            .unwrap()
            .clone();
        state
    }
}

fn token_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "accessToken": "test-access-token-12345",
        "refreshToken": "test-refresh-token-67890"
    }))
}

#[tokio::test]
async fn test_login_end_to_end() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_EXCHANGE_PATH))
        .and(body_json(json!({"code": "xyz"})))
        .respond_with(token_response())
        .expect(1)
        .mount(&harness.backend)
        .await;

    let addr = harness
        .manager
        .start_callback_server(harness.on_token())
        .unwrap();
    let start = harness.manager.login();

    assert_eq!(
        harness.browser.opened_urls(),
        vec![format!("{}/oauth2/authorization/google", harness.backend.uri())]
    );
    assert!(start.browser_opened);

    let response = reqwest::get(format!("http://{}/auth/callback?code=xyz", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    harness
        .wait_for_state(|s| *s == LoginState::Authenticated)
        .await;

    assert_eq!(harness.store.load().await.unwrap(), Some(test_tokens()));
    assert_eq!(*harness.received.lock().unwrap(), vec![test_tokens()]);

    // Self-stop after the grace window
    tokio::time::timeout(
        Duration::from_secs(2),
        harness.manager.callback_server().wait_stopped(),
    )
    .await
    .expect("callback server did not stop");
    assert!(!harness.manager.callback_server().is_running());
}

#[tokio::test]
async fn test_exchange_failure_then_retry_succeeds() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_EXCHANGE_PATH))
        .and(body_json(json!({"code": "bad"})))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&harness.backend)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_EXCHANGE_PATH))
        .and(body_json(json!({"code": "good"})))
        .respond_with(token_response())
        .mount(&harness.backend)
        .await;

    let addr = harness
        .manager
        .start_callback_server(harness.on_token())
        .unwrap();

    reqwest::get(format!("http://{}/auth/callback?code=bad", addr))
        .await
        .unwrap();
    let state = harness
        .wait_for_state(|s| matches!(s, LoginState::ExchangeFailed { .. }))
        .await;
    assert!(matches!(state, LoginState::ExchangeFailed { .. }));
    assert!(harness.manager.callback_server().is_running());
    assert!(harness.store.load().await.unwrap().is_none());
    assert!(harness.received.lock().unwrap().is_empty());

    reqwest::get(format!("http://{}/auth/callback?code=good", addr))
        .await
        .unwrap();
    harness
        .wait_for_state(|s| *s == LoginState::Authenticated)
        .await;

    assert_eq!(harness.store.load().await.unwrap(), Some(test_tokens()));
    assert_eq!(harness.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_provider_error_is_not_exchanged() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_EXCHANGE_PATH))
        .respond_with(token_response())
        .expect(0)
        .mount(&harness.backend)
        .await;

    let addr = harness
        .manager
        .start_callback_server(harness.on_token())
        .unwrap();

    let denied = reqwest::get(format!(
        "http://{}/auth/callback?error=access_denied",
        addr
    ))
    .await
    .unwrap();
    let missing = reqwest::get(format!("http://{}/auth/callback", addr))
        .await
        .unwrap();

    assert_eq!(denied.status(), 400);
    assert_eq!(missing.status(), 400);
    assert_eq!(harness.manager.state(), LoginState::AwaitingRedirect);

    harness.manager.stop_callback_server();
}

#[tokio::test]
async fn test_stop_before_grace_then_restart() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_EXCHANGE_PATH))
        .respond_with(token_response())
        .mount(&harness.backend)
        .await;

    let addr = harness
        .manager
        .start_callback_server(harness.on_token())
        .unwrap();
    reqwest::get(format!("http://{}/auth/callback?code=xyz", addr))
        .await
        .unwrap();
    harness
        .wait_for_state(|s| *s == LoginState::Authenticated)
        .await;

    // Manual stop inside the grace window, then a new server
    harness.manager.stop_callback_server();
    harness.manager.stop_callback_server();
    harness.manager.callback_server().wait_stopped().await;
    harness
        .manager
        .start_callback_server(harness.on_token())
        .unwrap();

    // The earlier scheduled stop must not take the new server down
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(harness.manager.callback_server().is_running());

    harness.manager.stop_callback_server();
}

fn mock_manager(
    repository: MockAuthRepository,
    store: InMemoryTokenStore,
    shutdown_grace: Duration,
) -> AuthSessionManager {
    AuthSessionManager::new(
        &test_config("http://backend.test").with_callback_shutdown_grace(shutdown_grace),
        Arc::new(repository),
        Arc::new(store),
        Arc::new(RecordingBrowser::new()),
    )
}

fn counting_callback() -> (TokenCallback, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let callback: TokenCallback = Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (callback, calls)
}

async fn redirect(addr: SocketAddr, code: &str) -> reqwest::Response {
    reqwest::get(format!("http://{}/auth/callback?code={}", addr, code))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_slow_exchange_spares_restarted_server() {
    let repository =
        MockAuthRepository::succeeding(test_tokens()).with_delay(Duration::from_millis(300));
    let store = InMemoryTokenStore::new();
    let manager = mock_manager(repository.clone(), store.clone(), Duration::from_millis(100));
    let (callback, calls) = counting_callback();

    let addr = manager.start_callback_server(Arc::clone(&callback)).unwrap();
    redirect(addr, "old").await;
    let mut state_rx = manager.subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        state_rx.wait_for(|s| *s == LoginState::ExchangePending),
    )
    .await
    .unwrap()
    .unwrap();

    // Restart while the first exchange is still in flight
    manager.stop_callback_server();
    manager.callback_server().wait_stopped().await;
    let new_addr = manager.start_callback_server(callback).unwrap();
    assert_eq!(manager.state(), LoginState::AwaitingRedirect);

    // Outlive the stale exchange and its grace window
    tokio::time::sleep(Duration::from_millis(600)).await;

    // The stale exchange completed but left the new attempt alone
    assert_eq!(store.get_tokens(), Some(test_tokens()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), LoginState::AwaitingRedirect);
    assert!(manager.callback_server().is_running());

    // The new server still accepts and exchanges a code
    assert_eq!(redirect(new_addr, "new").await.status(), 200);
    tokio::time::timeout(
        Duration::from_secs(2),
        state_rx.wait_for(|s| *s == LoginState::Authenticated),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(repository.received_codes(), vec!["old", "new"]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    manager.stop_callback_server();
}

#[tokio::test]
async fn test_token_callback_fires_at_most_once() {
    let repository =
        MockAuthRepository::succeeding(test_tokens()).with_delay(Duration::from_millis(200));
    // Long grace so the server is still up for the late redirect
    let manager = mock_manager(
        repository.clone(),
        InMemoryTokenStore::new(),
        Duration::from_secs(5),
    );
    let (callback, calls) = counting_callback();

    let addr = manager.start_callback_server(callback).unwrap();
    let (first, second) = tokio::join!(redirect(addr, "one"), redirect(addr, "two"));
    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 200);

    let mut state_rx = manager.subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        state_rx.wait_for(|s| *s == LoginState::Authenticated),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(repository.received_codes().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Codes after success are ignored too
    redirect(addr, "three").await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(repository.received_codes().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), LoginState::Authenticated);

    manager.stop_callback_server();
}

//! `AppConfig::from_env` against the real process environment.
//!
//! Environment variables are process-global, so these tests run serially.

use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;
use voicenav::config::AppConfig;

const VARS: &[&str] = &[
    "VOICENAV_BACKEND_URL",
    "VOICENAV_OAUTH_PROVIDER",
    "VOICENAV_CALLBACK_PORT",
    "VOICENAV_CONTROL_URL",
    "VOICENAV_CONNECT_RETRIES",
    "VOICENAV_RETRY_DELAY_MS",
    "VOICENAV_TOKEN_FILE",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_defaults_when_unset() {
    clear_env();
    assert_eq!(AppConfig::from_env(), AppConfig::default());
}

#[test]
#[serial]
fn test_from_env_reads_overrides() {
    clear_env();
    std::env::set_var("VOICENAV_BACKEND_URL", "https://nav.example.com/");
    std::env::set_var("VOICENAV_CALLBACK_PORT", "9100");
    std::env::set_var("VOICENAV_RETRY_DELAY_MS", "250");
    std::env::set_var("VOICENAV_TOKEN_FILE", "/tmp/voicenav/tokens.json");

    let config = AppConfig::from_env();
    clear_env();

    assert_eq!(config.backend_url, "https://nav.example.com");
    assert_eq!(config.callback_port, 9100);
    assert_eq!(config.connect_retry_delay, Duration::from_millis(250));
    assert_eq!(
        config.token_file,
        Some(PathBuf::from("/tmp/voicenav/tokens.json"))
    );
}

#[test]
#[serial]
fn test_from_env_ignores_bad_numbers() {
    clear_env();
    std::env::set_var("VOICENAV_CONNECT_RETRIES", "lots");

    let config = AppConfig::from_env();
    clear_env();

    assert_eq!(config.connect_max_retries, 5);
}

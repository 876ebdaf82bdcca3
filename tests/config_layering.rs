// tests/config_layering.rs
use std::io::Write;

use serial_test::serial;

use moltarena_skill::config::arena::{DEFAULT_API_URL, ENV_CONFIG_PATH};
use moltarena_skill::{ArenaClient, ArenaConfig, ArenaError};

const VARS: &[&str] = &[
    ENV_CONFIG_PATH,
    "MOLTARENA_API_URL",
    "MOLTARENA_API_KEY",
    "MOLTARENA_TIMEOUT_SECS",
    "HEARTBEAT_INTERVAL_SECS",
    "HEARTBEAT_MAX_NOTIFICATIONS",
];

fn clear_env() {
    for v in VARS {
        std::env::remove_var(v);
    }
}

fn write_config(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    f.write_all(body.as_bytes()).expect("write config");
    f
}

#[test]
#[serial]
fn file_then_env_overrides() {
    clear_env();
    let file = write_config(
        r#"
api_url = "http://localhost:8080/api/"
timeout_secs = 10

[heartbeat]
interval_secs = 60
max_notifications = 3
"#,
    );
    std::env::set_var(ENV_CONFIG_PATH, file.path());
    std::env::set_var("MOLTARENA_API_KEY", "sk-test");
    std::env::set_var("HEARTBEAT_MAX_NOTIFICATIONS", "7");

    let cfg = ArenaConfig::load().expect("load");
    assert_eq!(cfg.api_url, "http://localhost:8080/api");
    assert_eq!(cfg.api_key.as_deref(), Some("sk-test"));
    assert_eq!(cfg.timeout_secs, 10);
    assert_eq!(cfg.heartbeat.interval_secs, 60);
    assert_eq!(cfg.heartbeat.max_notifications, 7);
    clear_env();
}

#[test]
#[serial]
fn missing_explicit_path_is_an_error() {
    clear_env();
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
    assert!(ArenaConfig::load().is_err());
    clear_env();
}

#[test]
#[serial]
fn non_numeric_env_is_rejected() {
    clear_env();
    let file = write_config("");
    std::env::set_var(ENV_CONFIG_PATH, file.path());
    std::env::set_var("MOLTARENA_TIMEOUT_SECS", "soon");
    let err = ArenaConfig::load().unwrap_err();
    assert!(err.to_string().contains("MOLTARENA_TIMEOUT_SECS"));
    clear_env();
}

#[test]
#[serial]
fn empty_file_gives_defaults_and_blank_key_is_unset() {
    clear_env();
    let file = write_config("");
    std::env::set_var(ENV_CONFIG_PATH, file.path());
    std::env::set_var("MOLTARENA_API_KEY", "   ");

    let cfg = ArenaConfig::load().expect("load");
    assert_eq!(cfg.api_url, DEFAULT_API_URL);
    assert!(cfg.api_key.is_none());
    assert_eq!(cfg.heartbeat.max_notifications, 5);
    assert!(matches!(
        ArenaClient::new(&cfg),
        Err(ArenaError::MissingApiKey)
    ));
    clear_env();
}

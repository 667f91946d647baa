// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for chatwire configuration loading.

use chatwire_config::diagnostic::ConfigError;
use chatwire_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[client]
log_level = "debug"
ack_timeout_secs = 5
author = "alice"

[server]
url = "wss://chat.example.com/ws"
file_base_url = "https://files.example.com"
connect_timeout_secs = 3
max_reconnect_attempts = 2

[session]
throttle_ms = 500
session_id = "s-1"
auth_token = "tok"

[session.env]
OPENAI_API_KEY = "sk-1"
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.client.log_level, "debug");
    assert_eq!(config.client.ack_timeout_secs, 5);
    assert_eq!(config.client.author, "alice");
    assert_eq!(config.server.url, "wss://chat.example.com/ws");
    assert_eq!(config.server.max_reconnect_attempts, Some(2));
    assert_eq!(config.server.resolved_file_base_url(), "https://files.example.com");
    assert_eq!(config.session.throttle_ms, 500);
    assert_eq!(config.session.session_id.as_deref(), Some("s-1"));
    assert_eq!(config.session.auth_token.as_deref(), Some("tok"));
    assert_eq!(config.session.env.len(), 1);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.client.log_level, "info");
    assert_eq!(config.session.throttle_ms, 1000);
    assert!(config.session.auth_token.is_none());
}

#[test]
fn unknown_key_yields_suggestion() {
    let toml = r#"
[session]
throtle_ms = 10
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    let found = errors.iter().any(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => key == "throtle_ms" && suggestion.as_deref() == Some("throttle_ms"),
        _ => false,
    });
    assert!(found, "expected an unknown key suggestion, got: {errors:?}");
}

#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[upload]
max_files = 3
"#;
    let err = load_config_from_str(toml).expect_err("unknown section");
    assert!(format!("{err}").contains("upload"));
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[session]
throttle_ms = "fast"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_))),
        "got: {errors:?}"
    );
}

#[test]
fn validation_errors_surface_after_parse() {
    let toml = r#"
[server]
url = "smtp://mail"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[client]\nlog_level = \"warn\"\n").unwrap();

    let config = load_and_validate_path(&path).expect("valid file");
    assert_eq!(config.client.log_level, "warn");
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.
//!
//! All failures are collected; validation never stops at the first one.

use crate::diagnostic::ConfigError;
use crate::model::ChatwireConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const URL_SCHEMES: &[&str] = &["ws://", "wss://", "http://", "https://"];

/// Upper bound for the bootstrap throttle window.
const MAX_THROTTLE_MS: u64 = 60_000;

/// Validates a deserialized configuration.
pub fn validate_config(config: &ChatwireConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.client.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "client.log_level `{}` must be one of: {}",
            config.client.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.client.ack_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "client.ack_timeout_secs must be greater than 0",
        ));
    }

    if config.client.author.trim().is_empty() {
        errors.push(ConfigError::validation("client.author must not be empty"));
    }

    let url = config.server.url.trim();
    if url.is_empty() {
        errors.push(ConfigError::validation("server.url must not be empty"));
    } else if !URL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        errors.push(ConfigError::validation(format!(
            "server.url `{url}` must start with ws://, wss://, http:// or https://"
        )));
    }

    if let Some(base) = &config.server.file_base_url {
        if !base.starts_with("http://") && !base.starts_with("https://") {
            errors.push(ConfigError::validation(format!(
                "server.file_base_url `{base}` must be an http:// or https:// URL"
            )));
        }
    }

    if config.server.connect_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "server.connect_timeout_secs must be greater than 0",
        ));
    }

    if config.session.throttle_ms > MAX_THROTTLE_MS {
        errors.push(ConfigError::validation(format!(
            "session.throttle_ms must be at most {MAX_THROTTLE_MS}, got {}",
            config.session.throttle_ms
        )));
    }

    if let Some(id) = &config.session.session_id {
        if id.trim().is_empty() {
            errors.push(ConfigError::validation(
                "session.session_id must not be empty when set",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

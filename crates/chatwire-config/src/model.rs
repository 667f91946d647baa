// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the chatwire session client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of being silently ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level chatwire configuration.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatwireConfig {
    /// Client behavior and logging.
    #[serde(default)]
    pub client: ClientConfig,

    /// Backend endpoint and transport policy.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session parameters and bootstrap throttling.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Client behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How long to wait for the server to acknowledge an action call.
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,

    /// Author name attached to messages sent by this client.
    #[serde(default = "default_author")]
    pub author: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            ack_timeout_secs: default_ack_timeout_secs(),
            author: default_author(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ack_timeout_secs() -> u64 {
    30
}

fn default_author() -> String {
    "User".to_string()
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// WebSocket endpoint of the chat backend.
    #[serde(default = "default_url")]
    pub url: String,

    /// Base URL that element file keys are resolved against.
    /// Defaults to `url` with the scheme switched to HTTP.
    #[serde(default)]
    pub file_base_url: Option<String>,

    /// Timeout for a single connection attempt.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Reconnection attempts after a drop before the transport gives up.
    /// `None` retries forever.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            file_base_url: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl ServerConfig {
    /// The base URL for element files, derived from `url` unless set explicitly.
    pub fn resolved_file_base_url(&self) -> String {
        if let Some(base) = &self.file_base_url {
            return base.trim_end_matches('/').to_string();
        }
        let http = if let Some(rest) = self.url.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = self.url.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            self.url.clone()
        };
        let http = http.trim_end_matches('/');
        http.strip_suffix("/ws").unwrap_or(http).to_string()
    }
}

fn default_url() -> String {
    "ws://127.0.0.1:8000/ws".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_reconnect_attempts() -> Option<usize> {
    Some(5)
}

/// Session parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Window in milliseconds within which bootstrap requests are coalesced.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Fixed session id. A random one is generated when unset.
    #[serde(default)]
    pub session_id: Option<String>,

    /// Bearer token sent with the connection.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// User environment variables forwarded to the backend.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            session_id: None,
            auth_token: None,
            env: BTreeMap::new(),
        }
    }
}

fn default_throttle_ms() -> u64 {
    1000
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session identity, connection parameters, and connectivity status.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-user environment variables forwarded to the backend.
///
/// A `BTreeMap` keeps serialization and equality independent of insertion order.
pub type UserEnv = BTreeMap<String, String>;

/// Everything needed to establish one channel.
///
/// Two equal `ConnectParams` describe the same session; the bootstrapper
/// relies on this to skip redundant reconnects.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Session identifier sent as connection metadata.
    pub session_id: SessionId,
    /// Opaque bearer token. `None` for anonymous backends.
    pub auth_token: Option<String>,
    /// User environment, serialized as JSON on the wire.
    pub env: UserEnv,
}

impl ConnectParams {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            auth_token: None,
            env: UserEnv::new(),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_env(mut self, env: UserEnv) -> Self {
        self.env = env;
        self
    }

    /// The env map as the JSON string placed in connection metadata.
    pub fn env_json(&self) -> String {
        serde_json::to_string(&self.env).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("session_id", &self.session_id)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[redacted]"))
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Connectivity of the current session as seen by UI code.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Channel requested, transport not yet connected (or reconnecting).
    Connecting,
    /// Transport connected and acknowledged.
    Connected,
    /// The transport reported a connection error.
    Errored,
    /// No channel is open.
    #[default]
    Closed,
}

impl ConnectionStatus {
    /// Whether a channel is open and expected to deliver events.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Errored,
            ConnectionStatus::Closed,
        ] {
            let parsed = ConnectionStatus::from_str(&status.to_string()).unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!(ConnectionStatus::Errored.to_string(), "errored");
    }

    #[test]
    fn only_connecting_and_connected_are_live() {
        assert!(ConnectionStatus::Connecting.is_live());
        assert!(ConnectionStatus::Connected.is_live());
        assert!(!ConnectionStatus::Errored.is_live());
        assert!(!ConnectionStatus::Closed.is_live());
    }

    #[test]
    fn connect_params_debug_redacts_token() {
        let params = ConnectParams::new(SessionId("s-1".into())).with_auth_token("secret");
        let rendered = format!("{params:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn env_json_is_key_ordered() {
        let mut env = UserEnv::new();
        env.insert("b".into(), "2".into());
        env.insert("a".into(), "1".into());
        let params = ConnectParams::new(SessionId::generate()).with_env(env);
        assert_eq!(params.env_json(), r#"{"a":"1","b":"2"}"#);
    }
}

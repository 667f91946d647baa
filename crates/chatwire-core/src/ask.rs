// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! "Ask user" request specifications and answer payloads.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::message::Message;

/// What kind of answer an ask request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AskKind {
    Text,
    File,
}

/// The specification carried by an `ask` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AskSpec {
    Text(TextAskSpec),
    File(FileAskSpec),
}

impl AskSpec {
    pub fn kind(&self) -> AskKind {
        match self {
            Self::Text(_) => AskKind::Text,
            Self::File(_) => AskKind::File,
        }
    }

    /// How long the server waits for an answer before sending `ask_timeout`.
    pub fn timeout(&self) -> Duration {
        let secs = match self {
            Self::Text(spec) => spec.timeout,
            Self::File(spec) => spec.timeout,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAskSpec {
    /// Timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAskSpec {
    /// Timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accepted MIME types and extensions. Empty accepts everything.
    #[serde(default)]
    pub accept: AcceptPolicy,

    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,

    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl FileAskSpec {
    /// Size limit per file in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_max_size_mb() -> u64 {
    2
}

fn default_max_files() -> usize {
    1
}

/// Accepted file patterns.
///
/// Either a flat list (`["image/*", ".pdf"]`) or a map from MIME type to
/// extensions (`{"text/plain": [".txt", ".md"]}`). Patterns starting with a
/// dot match the file extension; anything else matches the MIME type, where
/// `type/*` and `*/*` are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AcceptPolicy {
    List(Vec<String>),
    Map(BTreeMap<String, Vec<String>>),
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl AcceptPolicy {
    fn patterns(&self) -> Vec<&str> {
        match self {
            Self::List(list) => list.iter().map(String::as_str).collect(),
            Self::Map(map) => map
                .iter()
                .flat_map(|(mime, exts)| {
                    std::iter::once(mime.as_str()).chain(exts.iter().map(String::as_str))
                })
                .collect(),
        }
    }

    /// Whether a file named `file_name` with MIME type `mime` is accepted.
    pub fn accepts(&self, file_name: &str, mime: &str) -> bool {
        let patterns = self.patterns();
        if patterns.is_empty() {
            return true;
        }
        let file_name = file_name.to_ascii_lowercase();
        let mime = mime.to_ascii_lowercase();
        patterns.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            if pattern.starts_with('.') {
                file_name.ends_with(&pattern)
            } else if pattern == "*" || pattern == "*/*" {
                true
            } else if let Some(prefix) = pattern.strip_suffix("/*") {
                mime.split('/').next() == Some(prefix)
            } else {
                mime == pattern
            }
        })
    }
}

/// One file of a file answer, read in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnswer {
    pub path: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

/// The payload delivered to a live ask request's callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AskAnswer {
    /// A text answer, sent as the user message it creates.
    Message(Message),
    Files(Vec<FileAnswer>),
}

/// Binary content travels as standard base64 inside JSON frames.
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

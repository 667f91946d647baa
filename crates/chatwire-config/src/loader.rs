// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order, later wins:
//! 1. compiled defaults
//! 2. `/etc/chatwire/chatwire.toml`
//! 3. `~/.config/chatwire/chatwire.toml`
//! 4. `./chatwire.toml`
//! 5. `CHATWIRE_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatwireConfig;

pub(crate) const SYSTEM_FILE: &str = "/etc/chatwire/chatwire.toml";
pub(crate) const LOCAL_FILE: &str = "chatwire.toml";

/// `~/.config/chatwire/chatwire.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatwire").join(LOCAL_FILE))
}

/// Loads configuration from the full file hierarchy with env overrides.
pub fn load_config() -> Result<ChatwireConfig, figment::Error> {
    build_figment().extract()
}

/// Loads configuration from a TOML string over the defaults. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<ChatwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatwireConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads configuration from one file path with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatwireConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChatwireConfig::default()))
        .merge(Toml::file(SYSTEM_FILE))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_FILE))
        .merge(env_provider())
}

/// Maps `CHATWIRE_<SECTION>_<KEY>` onto `section.key`.
///
/// Only the first underscore after the section name becomes a dot, so
/// `CHATWIRE_SESSION_AUTH_TOKEN` lands on `session.auth_token`.
fn env_provider() -> Env {
    Env::prefixed("CHATWIRE_").map(|key| {
        let key = key.as_str();
        for section in ["client", "server", "session"] {
            if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
                return format!("{section}.{rest}").into();
            }
        }
        key.to_string().into()
    })
}

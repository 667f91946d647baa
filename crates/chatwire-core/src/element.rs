// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Non-message artifacts attached to a conversation, and offered actions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Where an element is displayed relative to its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ElementDisplay {
    Inline,
    Side,
    Page,
}

/// The disjoint collection an element lives in, decided by its type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ElementCollection {
    Elements,
    Avatars,
    Tasklists,
}

/// An attachment, avatar, task list, or any other artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,

    /// Type tag as sent by the server (`image`, `avatar`, `tasklist`, ...).
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Inline textual payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Server-side file key used to derive `url` when neither `url` nor `content` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    /// Messages this element is scoped to.
    #[serde(default)]
    pub for_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<ElementDisplay>,

    /// Remaining payload keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            name: String::new(),
            url: None,
            content: None,
            object_key: None,
            mime: None,
            for_ids: Vec::new(),
            display: None,
            extra: Map::new(),
        }
    }

    /// The collection this element belongs to.
    pub fn collection(&self) -> ElementCollection {
        match self.kind.as_str() {
            "avatar" => ElementCollection::Avatars,
            "tasklist" => ElementCollection::Tasklists,
            _ => ElementCollection::Elements,
        }
    }

    /// Fills `url` from `object_key` against `base_url` when the element has no payload.
    pub fn resolve_url(&mut self, base_url: &str) {
        if self.url.is_some() || self.content.is_some() {
            return;
        }
        if let Some(key) = &self.object_key {
            self.url = Some(format!("{}/files/{key}", base_url.trim_end_matches('/')));
        }
    }
}

/// A user-invocable action offered by the server.
///
/// Actions have no identity of their own: removal compares the whole
/// payload structurally, see [`Action::structurally_eq`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Message the action is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            for_id: None,
            label: None,
            description: None,
            extra: Map::new(),
        }
    }

    /// The action as a JSON value. Object equality on `Value` ignores key order.
    pub fn canonical(&self) -> Option<Value> {
        serde_json::to_value(self).ok()
    }

    /// Deep equality over the canonical representation.
    pub fn structurally_eq(&self, other: &Action) -> bool {
        match (self.canonical(), other.canonical()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

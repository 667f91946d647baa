// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation messages and their identity rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One turn or sub-step of a conversation.
///
/// A message is identified by its final `id` and, until the server confirms
/// it, optionally by a client-generated `temp_id`. Sub-steps nest under a
/// parent through `parent_id` and are stored in `steps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,

    /// Provisional id assigned by the client before the server id is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub author: String,

    #[serde(default, alias = "authorIsUser")]
    pub is_user: bool,

    #[serde(default)]
    pub content: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Feedback score given by the user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<i32>,

    #[serde(default)]
    pub is_error: bool,

    #[serde(default)]
    pub wait_for_answer: bool,

    #[serde(default)]
    pub streaming: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Message>,
}

impl Message {
    /// Creates a message with the given id and content, authored by `author`.
    pub fn new(id: impl Into<String>, author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            temp_id: None,
            parent_id: None,
            author: author.into(),
            is_user: false,
            content: content.into(),
            created_at: Utc::now(),
            language: None,
            feedback: None,
            is_error: false,
            wait_for_answer: false,
            streaming: false,
            steps: Vec::new(),
        }
    }

    /// Creates a user-authored message carrying a fresh provisional id.
    ///
    /// The provisional id doubles as the initial `id` so the server can
    /// confirm the message by echoing it back.
    pub fn from_user(author: impl Into<String>, content: impl Into<String>) -> Self {
        let temp_id = uuid::Uuid::new_v4().to_string();
        let mut message = Self::new(temp_id.clone(), author, content);
        message.temp_id = Some(temp_id);
        message.is_user = true;
        message
    }

    /// Whether `id` is this message's final or provisional id.
    pub fn matches(&self, id: &str) -> bool {
        self.id == id || self.temp_id.as_deref() == Some(id)
    }

    /// Whether `other` refers to the same logical message.
    pub fn same_identity(&self, other: &Message) -> bool {
        self.matches(&other.id) || other.temp_id.as_deref().is_some_and(|t| self.matches(t))
    }

    /// Counts this message and every nested step.
    pub fn len_recursive(&self) -> usize {
        1 + self.steps.iter().map(Message::len_recursive).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_payload_with_defaults() {
        let msg: Message = serde_json::from_str(r#"{"id": "m1"}"#).unwrap();
        assert_eq!(msg.id, "m1");
        assert!(msg.content.is_empty());
        assert!(!msg.is_user);
        assert!(msg.steps.is_empty());
        assert!(msg.temp_id.is_none());
    }

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r#"{
            "id": "m2",
            "parentId": "m1",
            "author": "Assistant",
            "authorIsUser": false,
            "content": "hi",
            "createdAt": "2026-01-02T03:04:05Z",
            "waitForAnswer": true,
            "isError": true,
            "feedback": -1
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.parent_id.as_deref(), Some("m1"));
        assert!(msg.wait_for_answer);
        assert!(msg.is_error);
        assert_eq!(msg.feedback, Some(-1));
        assert_eq!(msg.created_at.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn matches_final_and_provisional_ids() {
        let mut msg = Message::new("server-1", "Assistant", "");
        msg.temp_id = Some("tmp-1".into());
        assert!(msg.matches("server-1"));
        assert!(msg.matches("tmp-1"));
        assert!(!msg.matches("other"));
    }

    #[test]
    fn same_identity_through_provisional_id() {
        let local = Message::from_user("alice", "hello");
        let mut confirmed = Message::new("server-7", "alice", "hello");
        confirmed.temp_id = local.temp_id.clone();
        assert!(local.same_identity(&confirmed));
        assert!(confirmed.same_identity(&local));
    }

    #[test]
    fn from_user_sets_provisional_id() {
        let msg = Message::from_user("alice", "hello");
        assert!(msg.is_user);
        assert_eq!(msg.temp_id.as_deref(), Some(msg.id.as_str()));
    }

    #[test]
    fn len_recursive_counts_steps() {
        let mut parent = Message::new("p", "a", "");
        let mut child = Message::new("c", "a", "");
        child.steps.push(Message::new("g", "a", ""));
        parent.steps.push(child);
        assert_eq!(parent.len_recursive(), 3);
    }
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire frames and typed inbound event schemas.
//!
//! Every frame on the channel is a JSON object:
//! ```json
//! {"event": "stream_token", "data": {"id": "m1", "token": "He", "isSequence": false}}
//! {"event": "ask", "id": "ack-7", "data": {"msg": {...}, "spec": {"type": "text", "timeout": 60}}}
//! {"event": "ask:ack", "id": "ack-7", "data": {...}}
//! ```
//!
//! Payloads are loosely typed on the wire. [`InboundEvent::decode`] validates
//! them once at the dispatch edge so nothing downstream trusts raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ask::AskSpec;
use crate::element::{Action, Element};
use crate::error::ChatwireError;
use crate::message::Message;

/// A single frame in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Present when the sender expects an acknowledgement, or on the acknowledgement itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// A fire-and-forget frame.
    pub fn fire(event: impl Into<String>, data: Value) -> Self {
        Self {
            id: None,
            event: event.into(),
            data,
        }
    }

    /// A frame that expects an acknowledgement; returns the frame and its ack id.
    pub fn with_ack(event: impl Into<String>, data: Value) -> (Self, String) {
        let id = uuid::Uuid::new_v4().to_string();
        let frame = Self {
            id: Some(id.clone()),
            event: event.into(),
            data,
        };
        (frame, id)
    }

    /// The acknowledgement for a frame of kind `event` carrying ack id `id`.
    pub fn ack(event: &str, id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(id.into()),
            event: format!("{event}{ACK_SUFFIX}"),
            data,
        }
    }

    /// If this frame acknowledges an earlier request, the acknowledged event name.
    pub fn acked_event(&self) -> Option<&str> {
        self.event.strip_suffix(ACK_SUFFIX)
    }
}

/// Suffix appended to an event name to form its acknowledgement.
pub const ACK_SUFFIX: &str = ":ack";

/// Event names emitted by the client.
pub mod outbound {
    /// Sent once the transport connects.
    pub const CONNECTION_SUCCESSFUL: &str = "connection_successful";
    /// Sent before honoring a server `reload`.
    pub const CLEAR_SESSION: &str = "clear_session";
    /// User invoked an action; acknowledged by the server.
    pub const ACTION_CALL: &str = "action_call";
    /// User submitted the chat settings form.
    pub const CHAT_SETTINGS_CHANGE: &str = "chat_settings_change";
    /// User sent a message.
    pub const CLIENT_MESSAGE: &str = "client_message";
    /// User asked the server to stop the running task.
    pub const STOP: &str = "stop";
    /// Event name answered when replying to an `ask`.
    pub const ASK: &str = "ask";
}

/// Payload of `stream_token`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamToken {
    pub id: String,
    pub token: String,
    /// `true` when `token` is a full-content snapshot rather than a delta.
    #[serde(default)]
    pub is_sequence: bool,
}

/// Payload of `update_message`: a message plus an optional identity migration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageUpdate {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default, rename = "newId")]
    pub new_id: Option<String>,
}

/// Payload of `ask`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskRequest {
    pub msg: Message,
    pub spec: AskSpec,
}

/// Payload of `update_element`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    pub id: String,
    #[serde(default)]
    pub for_ids: Vec<String>,
}

/// Payload of `remove_element`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ElementRef {
    pub id: String,
}

/// A server event with its payload validated.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    TaskStart,
    TaskEnd,
    Reload,
    NewMessage(Message),
    UpdateMessage(MessageUpdate),
    DeleteMessage(Message),
    StreamStart(Message),
    StreamToken(StreamToken),
    Ask { request: AskRequest, ack_id: String },
    AskTimeout,
    ClearAsk,
    /// Settings form description: a list of input widgets.
    ChatSettings(Vec<Value>),
    Element(Element),
    UpdateElement(ElementPatch),
    RemoveElement(ElementRef),
    Action(Action),
    RemoveAction(Action),
    TokenUsage(u64),
}

impl InboundEvent {
    /// Decodes a raw event. Returns `Ok(None)` for event names this client does not handle.
    pub fn decode(
        event: &str,
        data: Value,
        ack_id: Option<String>,
    ) -> Result<Option<Self>, ChatwireError> {
        fn parse<T: serde::de::DeserializeOwned>(
            event: &str,
            data: Value,
        ) -> Result<T, ChatwireError> {
            serde_json::from_value(data).map_err(|e| ChatwireError::protocol(event, e))
        }

        let decoded = match event {
            "task_start" => Self::TaskStart,
            "task_end" => Self::TaskEnd,
            "reload" => Self::Reload,
            "new_message" => Self::NewMessage(parse(event, data)?),
            "update_message" => Self::UpdateMessage(parse(event, data)?),
            "delete_message" => Self::DeleteMessage(parse(event, data)?),
            "stream_start" => Self::StreamStart(parse(event, data)?),
            "stream_token" => Self::StreamToken(parse(event, data)?),
            "ask" => {
                let ack_id = ack_id
                    .ok_or_else(|| ChatwireError::protocol(event, "missing acknowledgement id"))?;
                Self::Ask {
                    request: parse(event, data)?,
                    ack_id,
                }
            }
            "ask_timeout" => Self::AskTimeout,
            "clear_ask" => Self::ClearAsk,
            "chat_settings" => Self::ChatSettings(parse(event, data)?),
            "element" => Self::Element(parse(event, data)?),
            "update_element" => Self::UpdateElement(parse(event, data)?),
            "remove_element" => Self::RemoveElement(parse(event, data)?),
            "action" => Self::Action(parse(event, data)?),
            "remove_action" => Self::RemoveAction(parse(event, data)?),
            "token_usage" => Self::TokenUsage(parse(event, data)?),
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }

    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskStart => "task_start",
            Self::TaskEnd => "task_end",
            Self::Reload => "reload",
            Self::NewMessage(_) => "new_message",
            Self::UpdateMessage(_) => "update_message",
            Self::DeleteMessage(_) => "delete_message",
            Self::StreamStart(_) => "stream_start",
            Self::StreamToken(_) => "stream_token",
            Self::Ask { .. } => "ask",
            Self::AskTimeout => "ask_timeout",
            Self::ClearAsk => "clear_ask",
            Self::ChatSettings(_) => "chat_settings",
            Self::Element(_) => "element",
            Self::UpdateElement(_) => "update_element",
            Self::RemoveElement(_) => "remove_element",
            Self::Action(_) => "action",
            Self::RemoveAction(_) => "remove_action",
            Self::TokenUsage(_) => "token_usage",
        }
    }
}

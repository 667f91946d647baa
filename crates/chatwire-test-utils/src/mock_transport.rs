// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport that records everything the client sends.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatwire_core::{ChatwireError, Transport};
use serde_json::Value;

use crate::lock;

/// An outbound event captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
    pub event: String,
    pub data: Value,
    /// Sent with `emit_with_ack`.
    pub acked: bool,
}

/// A reply to a server event captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub event: String,
    pub ack_id: String,
    pub data: Value,
}

/// A transport with no network behind it.
///
/// Acknowledged emits answer `null` unless a response was configured with
/// [`MockTransport::respond_to`] or [`MockTransport::fail_acks_for`]. Once
/// closed, every send fails with [`ChatwireError::NotConnected`].
#[derive(Debug, Default)]
pub struct MockTransport {
    emitted: Mutex<Vec<Emitted>>,
    replies: Mutex<Vec<Reply>>,
    ack_responses: Mutex<HashMap<String, Result<Value, String>>>,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent via `emit` and `emit_with_ack`, in order.
    pub fn emitted(&self) -> Vec<Emitted> {
        lock(&self.emitted).clone()
    }

    /// Just the event names of [`MockTransport::emitted`].
    pub fn emitted_events(&self) -> Vec<String> {
        lock(&self.emitted).iter().map(|e| e.event.clone()).collect()
    }

    /// Every reply sent to a server event.
    pub fn replies(&self) -> Vec<Reply> {
        lock(&self.replies).clone()
    }

    /// Acknowledge `event` with `value`.
    pub fn respond_to(&self, event: &str, value: Value) {
        lock(&self.ack_responses).insert(event.to_string(), Ok(value));
    }

    /// Fail every acknowledged `event` with a transport error.
    pub fn fail_acks_for(&self, event: &str, message: &str) {
        lock(&self.ack_responses).insert(event.to_string(), Err(message.to_string()));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), ChatwireError> {
        if self.is_closed() {
            Err(ChatwireError::NotConnected)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn emit(&self, event: &str, data: Value) -> Result<(), ChatwireError> {
        self.ensure_open()?;
        lock(&self.emitted).push(Emitted {
            event: event.to_string(),
            data,
            acked: false,
        });
        Ok(())
    }

    async fn emit_with_ack(
        &self,
        event: &str,
        data: Value,
        _timeout: Duration,
    ) -> Result<Value, ChatwireError> {
        self.ensure_open()?;
        lock(&self.emitted).push(Emitted {
            event: event.to_string(),
            data,
            acked: true,
        });
        match lock(&self.ack_responses).get(event) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(ChatwireError::transport(message.clone())),
            None => Ok(Value::Null),
        }
    }

    async fn reply(&self, event: &str, ack_id: &str, data: Value) -> Result<(), ChatwireError> {
        self.ensure_open()?;
        lock(&self.replies).push(Reply {
            event: event.to_string(),
            ack_id: ack_id.to_string(),
            data,
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), ChatwireError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn captures_emits_and_replies() {
        let transport = MockTransport::new();
        transport.emit("stop", Value::Null).await.unwrap();
        transport.reply("ask", "a1", json!("yes")).await.unwrap();

        assert_eq!(transport.emitted_events(), vec!["stop"]);
        assert!(!transport.emitted()[0].acked);
        assert_eq!(transport.replies()[0].ack_id, "a1");
    }

    #[tokio::test]
    async fn canned_ack_responses() {
        let transport = MockTransport::new();
        transport.respond_to("action_call", json!({"ok": true}));
        let value = transport
            .emit_with_ack("action_call", Value::Null, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));

        transport.fail_acks_for("action_call", "boom");
        let err = transport
            .emit_with_ack("action_call", Value::Null, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn closed_transport_refuses_sends() {
        let transport = MockTransport::new();
        transport.close().await.unwrap();
        assert!(transport.is_closed());
        assert!(matches!(
            transport.emit("stop", Value::Null).await,
            Err(ChatwireError::NotConnected)
        ));
    }
}

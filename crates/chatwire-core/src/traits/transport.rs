// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bidirectional event channel between client and backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::ChatwireError;
use crate::types::ConnectParams;

/// Low-level events reported by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The transport (re)connected.
    Connected,
    /// A connection attempt failed.
    ConnectError(String),
    /// An established connection dropped; the transport may be retrying.
    Disconnected(String),
    /// A server event. `ack_id` is set when the server expects a reply.
    Event {
        name: String,
        data: Value,
        ack_id: Option<String>,
    },
}

/// Outbound half of an open channel.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Human-readable name of this transport, for logs.
    fn name(&self) -> &str;

    /// Sends a fire-and-forget event.
    async fn emit(&self, event: &str, data: Value) -> Result<(), ChatwireError>;

    /// Sends an event and waits up to `timeout` for the server's acknowledgement.
    async fn emit_with_ack(
        &self,
        event: &str,
        data: Value,
        timeout: Duration,
    ) -> Result<Value, ChatwireError>;

    /// Replies to a server event of kind `event` that carried `ack_id`.
    async fn reply(&self, event: &str, ack_id: &str, data: Value) -> Result<(), ChatwireError>;

    /// Closes the channel. Idempotent.
    async fn close(&self) -> Result<(), ChatwireError>;
}

/// An open channel: the outbound transport plus its inbound event stream.
///
/// Dropping `events` is what unsubscribes a listener; the transport observes
/// the closed receiver and stops delivering.
pub struct Connection {
    pub transport: Arc<dyn Transport>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Opens channels.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a new channel with the given session parameters.
    ///
    /// Returning `Ok` does not mean the transport is connected yet; that is
    /// reported as [`TransportEvent::Connected`] on the event stream.
    async fn connect(&self, params: &ConnectParams) -> Result<Connection, ChatwireError>;
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock connector with server-event injection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatwire_core::{ChatwireError, Connection, ConnectParams, Connector, TransportEvent};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::lock;
use crate::mock_transport::MockTransport;

const EVENT_BUFFER: usize = 64;

/// One channel handed out by [`MockConnector`].
#[derive(Debug, Clone)]
pub struct MockConnection {
    pub params: ConnectParams,
    pub transport: Arc<MockTransport>,
    sender: mpsc::Sender<TransportEvent>,
}

impl MockConnection {
    /// Delivers a transport event as if the server sent it.
    ///
    /// Returns `false` when the client has already unsubscribed.
    pub async fn inject(&self, event: TransportEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }

    /// Delivers a server event without an acknowledgement id.
    pub async fn inject_event(&self, name: &str, data: Value) -> bool {
        self.inject(TransportEvent::Event {
            name: name.to_string(),
            data,
            ack_id: None,
        })
        .await
    }

    /// Delivers a server event that expects a reply under `ack_id`.
    pub async fn inject_with_ack(&self, name: &str, ack_id: &str, data: Value) -> bool {
        self.inject(TransportEvent::Event {
            name: name.to_string(),
            data,
            ack_id: Some(ack_id.to_string()),
        })
        .await
    }

    /// Whether the client dropped this channel's event receiver.
    pub fn events_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// A connector that opens in-memory channels.
///
/// By default each channel reports [`TransportEvent::Connected`] right away;
/// [`MockConnector::manual`] leaves that to the test.
#[derive(Debug)]
pub struct MockConnector {
    connections: Mutex<Vec<MockConnection>>,
    failures: Mutex<VecDeque<String>>,
    auto_connect: bool,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            auto_connect: true,
        }
    }

    /// A connector whose channels stay in `Connecting` until the test injects `Connected`.
    pub fn manual() -> Self {
        Self {
            auto_connect: false,
            ..Self::new()
        }
    }

    /// Makes the next `connect` call fail with a transport error.
    pub fn fail_next_connect(&self, message: &str) {
        lock(&self.failures).push_back(message.to_string());
    }

    /// Every channel opened so far, oldest first.
    pub fn connections(&self) -> Vec<MockConnection> {
        lock(&self.connections).clone()
    }

    /// The most recently opened channel.
    pub fn latest(&self) -> Option<MockConnection> {
        lock(&self.connections).last().cloned()
    }

    /// Number of channels successfully opened.
    pub fn connect_count(&self) -> usize {
        lock(&self.connections).len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, params: &ConnectParams) -> Result<Connection, ChatwireError> {
        if let Some(message) = lock(&self.failures).pop_front() {
            return Err(ChatwireError::transport(message));
        }

        let (sender, events) = mpsc::channel(EVENT_BUFFER);
        if self.auto_connect {
            sender
                .try_send(TransportEvent::Connected)
                .map_err(|e| ChatwireError::Internal(e.to_string()))?;
        }
        let transport = Arc::new(MockTransport::new());
        debug!(session_id = %params.session_id, "mock channel opened");
        lock(&self.connections).push(MockConnection {
            params: params.clone(),
            transport: Arc::clone(&transport),
            sender,
        });
        Ok(Connection { transport, events })
    }
}

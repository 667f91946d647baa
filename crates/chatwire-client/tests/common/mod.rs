// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared harness for session integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chatwire_client::{ChatClient, ClientOptions};
use chatwire_core::{ConnectParams, SessionId};
use chatwire_test_utils::{MockConnection, MockConnector, settle};
use serde_json::Value;

/// Builder for a client wired to a [`MockConnector`].
pub struct TestHarnessBuilder {
    options: ClientOptions,
    manual_connect: bool,
}

impl TestHarnessBuilder {
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.options.throttle = throttle;
        self
    }

    pub fn with_file_base_url(mut self, url: &str) -> Self {
        self.options.file_base_url = Some(url.to_string());
        self
    }

    /// Channels stay `Connecting` until the test injects `Connected`.
    pub fn manual_connect(mut self) -> Self {
        self.manual_connect = true;
        self
    }

    pub fn build(self) -> TestHarness {
        let connector = Arc::new(if self.manual_connect {
            MockConnector::manual()
        } else {
            MockConnector::new()
        });
        let client = ChatClient::new(connector.clone(), self.options);
        TestHarness { client, connector }
    }
}

/// A client plus the mock network behind it.
pub struct TestHarness {
    pub client: ChatClient,
    pub connector: Arc<MockConnector>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder {
            options: ClientOptions {
                throttle: Duration::ZERO,
                ..ClientOptions::default()
            },
            manual_connect: false,
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn params(session_id: &str) -> ConnectParams {
        ConnectParams::new(SessionId(session_id.to_string())).with_auth_token("token")
    }

    /// Opens a session and returns its channel once the connect event is applied.
    pub async fn connect(&self, session_id: &str) -> MockConnection {
        self.client.ensure_connected(Self::params(session_id)).await;
        settle().await;
        self.connector
            .latest()
            .expect("ensure_connected should open a channel")
    }

    /// Injects server events in order and waits for them to be applied.
    pub async fn server_sends(&self, channel: &MockConnection, events: &[(&str, Value)]) {
        for (name, data) in events {
            assert!(
                channel.inject_event(name, data.clone()).await,
                "channel unsubscribed before `{name}`"
            );
        }
        settle().await;
    }
}

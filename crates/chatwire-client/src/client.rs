// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session client facade used by UI code.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chatwire_core::events::outbound;
use chatwire_core::{
    Action, AskAnswer, AskKind, AskSpec, ChatwireError, ConnectParams, Connector, Message,
};
use serde_json::{Map, Value, json};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::bootstrap::Bootstrapper;
use crate::channel::ChannelManager;
use crate::reconciler;
use crate::state::{ChatState, SessionStore};
use crate::upload;

/// Client behavior knobs.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Bootstrap throttle window.
    pub throttle: Duration,
    /// How long `call_action` waits for the server's acknowledgement.
    pub ack_timeout: Duration,
    /// Base URL element file keys resolve against. `None` leaves keys unresolved.
    pub file_base_url: Option<String>,
    /// Author name on messages this client sends.
    pub author: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(1),
            ack_timeout: Duration::from_secs(30),
            file_base_url: None,
            author: "User".to_string(),
        }
    }
}

/// A realtime chat session.
///
/// State is read through [`ChatClient::subscribe`] or [`ChatClient::snapshot`];
/// every other method is an outbound intent.
pub struct ChatClient {
    store: Arc<SessionStore>,
    channel: Arc<ChannelManager>,
    bootstrap: Bootstrapper,
    options: ClientOptions,
}

impl ChatClient {
    /// Creates a client. Must be called inside a Tokio runtime.
    pub fn new(connector: Arc<dyn Connector>, options: ClientOptions) -> Self {
        let store = Arc::new(SessionStore::new());
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        let channel = Arc::new(ChannelManager::new(
            connector,
            Arc::clone(&store),
            options.file_base_url.clone(),
            reload_tx,
        ));
        let bootstrap = Bootstrapper::new(
            Arc::clone(&channel),
            Arc::clone(&store),
            options.throttle,
            reload_rx,
        );
        Self {
            store,
            channel,
            bootstrap,
            options,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> ChatState {
        self.store.snapshot()
    }

    /// Makes sure a channel for `params` exists. Throttled.
    pub async fn ensure_connected(&self, params: ConnectParams) {
        self.bootstrap.ensure_connected(params).await;
    }

    /// Closes the session immediately. The next `ensure_connected` reopens it.
    pub async fn logout(&self) {
        self.bootstrap.logout().await;
    }

    /// Sends a user message, shown optimistically under a provisional id.
    pub async fn send_message(&self, content: impl Into<String>) -> Result<Message, ChatwireError> {
        let (generation, transport) = self.channel.transport().await?;
        let message = Message::from_user(&self.options.author, content);
        {
            let turns = self.store.turns().lock().await;
            if turns.is_awaiting() {
                return Err(ChatwireError::AskPending);
            }
            self.store.modify(generation, |s| {
                let next = reconciler::add_message(&s.messages, &message);
                s.set_messages(next)
            });
        }
        debug!(id = %message.id, "sending message");
        transport
            .emit(outbound::CLIENT_MESSAGE, json!({ "message": message }))
            .await?;
        Ok(message)
    }

    /// Asks the server to stop the running task.
    pub async fn stop_task(&self) -> Result<(), ChatwireError> {
        let (generation, transport) = self.channel.transport().await?;
        self.store.modify(generation, |s| s.set_loading(false));
        transport.emit(outbound::STOP, Value::Null).await
    }

    /// Invokes an action and returns the server's acknowledgement payload.
    pub async fn call_action(&self, action: &Action) -> Result<Value, ChatwireError> {
        let (_, transport) = self.channel.transport().await?;
        let data = serde_json::to_value(action)
            .map_err(|e| ChatwireError::Internal(format!("failed to encode action: {e}")))?;
        info!(action = %action.name, "calling action");
        transport
            .emit_with_ack(outbound::ACTION_CALL, data, self.options.ack_timeout)
            .await
    }

    /// Stores edited settings values and sends them to the server.
    pub async fn update_chat_settings(
        &self,
        values: Map<String, Value>,
    ) -> Result<(), ChatwireError> {
        let (generation, transport) = self.channel.transport().await?;
        self.store
            .modify(generation, |s| s.set_chat_settings_values(values.clone()));
        transport
            .emit(outbound::CHAT_SETTINGS_CHANGE, Value::Object(values))
            .await
    }

    /// Answers a live text ask. The answer also becomes a user message.
    pub async fn answer_text(&self, content: impl Into<String>) -> Result<Message, ChatwireError> {
        let message = Message::from_user(&self.options.author, content);
        let pending = {
            let mut turns = self.store.turns().lock().await;
            let (turn_id, generation, spec) = turns.current().ok_or(ChatwireError::NotAwaiting)?;
            if spec.kind() != AskKind::Text {
                return Err(ChatwireError::AnswerKindMismatch {
                    expected: spec.kind(),
                });
            }
            let pending = turns
                .take_if(turn_id, generation)
                .ok_or(ChatwireError::Superseded)?;
            self.store.modify(generation, |s| {
                let next = reconciler::add_message(&s.messages, &message);
                s.set_messages(next) | s.set_ask(None)
            });
            pending
        };
        pending
            .responder
            .respond(&AskAnswer::Message(message.clone()))
            .await?;
        Ok(message)
    }

    /// Answers a live file ask with the files at `paths`.
    ///
    /// Validation failures reject the whole batch and keep the ask live. If
    /// the ask is cleared, replaced, or the session switches while files are
    /// being read, nothing is sent and [`ChatwireError::Superseded`] is returned.
    pub async fn answer_files(&self, paths: &[PathBuf]) -> Result<(), ChatwireError> {
        let (turn_id, generation, spec) = {
            let turns = self.store.turns().lock().await;
            let (turn_id, generation, spec) = turns.current().ok_or(ChatwireError::NotAwaiting)?;
            match spec {
                AskSpec::File(file) => (turn_id, generation, file.clone()),
                AskSpec::Text(_) => {
                    return Err(ChatwireError::AnswerKindMismatch {
                        expected: AskKind::Text,
                    });
                }
            }
        };

        let files = upload::read_batch(paths, &spec).await?;

        let pending = {
            let mut turns = self.store.turns().lock().await;
            let pending = turns
                .take_if(turn_id, generation)
                .ok_or(ChatwireError::Superseded)?;
            self.store.modify(generation, |s| s.set_ask(None));
            pending
        };
        debug!(turn_id, count = files.len(), "answering file ask");
        pending.responder.respond(&AskAnswer::Files(files)).await
    }

    /// Stops bootstrapping and closes the channel.
    pub async fn shutdown(&self) {
        self.bootstrap.cancel();
        self.channel.close().await;
    }
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Applies transport events to session state.
//!
//! One dispatcher exists per channel generation and runs on that channel's
//! listener task, so events are applied strictly one at a time and in
//! arrival order. Failures here are logged and never surfaced.

use std::sync::Arc;

use chatwire_core::events::{AskRequest, outbound};
use chatwire_core::{ConnectionStatus, InboundEvent, Transport, TransportEvent};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::reconciler;
use crate::state::SessionStore;
use crate::turn::AskResponder;

pub(crate) struct Dispatcher {
    store: Arc<SessionStore>,
    transport: Arc<dyn Transport>,
    generation: u64,
    file_base_url: Option<String>,
    reload: mpsc::UnboundedSender<u64>,
}

impl Dispatcher {
    pub(crate) fn new(
        store: Arc<SessionStore>,
        transport: Arc<dyn Transport>,
        generation: u64,
        file_base_url: Option<String>,
        reload: mpsc::UnboundedSender<u64>,
    ) -> Self {
        Self {
            store,
            transport,
            generation,
            file_base_url,
            reload,
        }
    }

    fn modify(&self, f: impl FnOnce(&mut crate::state::ChatState) -> bool) -> bool {
        self.store.modify(self.generation, f)
    }

    pub(crate) async fn handle(&self, event: TransportEvent) {
        if self.store.generation() != self.generation {
            debug!(generation = self.generation, "dropping event from superseded channel");
            return;
        }
        match event {
            TransportEvent::Connected => {
                info!(transport = self.transport.name(), "channel connected");
                self.modify(|s| s.set_status(ConnectionStatus::Connected));
                if let Err(e) = self
                    .transport
                    .emit(outbound::CONNECTION_SUCCESSFUL, Value::Null)
                    .await
                {
                    warn!(error = %e, "failed to announce connection");
                }
            }
            TransportEvent::ConnectError(reason) => {
                warn!(%reason, "connection error");
                self.modify(|s| s.set_status(ConnectionStatus::Errored));
            }
            TransportEvent::Disconnected(reason) => {
                info!(%reason, "channel disconnected, transport is retrying");
                self.modify(|s| {
                    s.status != ConnectionStatus::Closed && s.set_status(ConnectionStatus::Connecting)
                });
            }
            TransportEvent::Event { name, data, ack_id } => {
                match InboundEvent::decode(&name, data, ack_id) {
                    Ok(Some(event)) => self.apply(event).await,
                    Ok(None) => debug!(event = %name, "ignoring unknown event"),
                    Err(e) => warn!(event = %name, error = %e, "dropping malformed event"),
                }
            }
        }
    }

    async fn apply(&self, event: InboundEvent) {
        let name = event.name();
        let changed = match event {
            InboundEvent::TaskStart => self.modify(|s| s.set_loading(true)),
            InboundEvent::TaskEnd => self.modify(|s| s.set_loading(false)),
            InboundEvent::Reload => {
                self.reload().await;
                return;
            }
            InboundEvent::NewMessage(message) => self.modify(|s| {
                let next = reconciler::add_message(&s.messages, &message);
                s.set_messages(next)
            }),
            InboundEvent::UpdateMessage(update) => self.modify(|s| {
                let next = reconciler::update_message(&s.messages, &update);
                s.set_messages(next)
            }),
            InboundEvent::DeleteMessage(message) => self.modify(|s| {
                let next = reconciler::delete_message(&s.messages, &message);
                s.set_messages(next)
            }),
            InboundEvent::StreamStart(message) => self.modify(|s| {
                let next = reconciler::start_stream(&s.messages, &message);
                s.set_messages(Some(next))
            }),
            InboundEvent::StreamToken(token) => self.modify(|s| {
                let next = reconciler::apply_token(&s.messages, &token);
                s.set_messages(next)
            }),
            InboundEvent::Ask { request, ack_id } => self.begin_ask(request, ack_id).await,
            InboundEvent::AskTimeout => {
                let mut turns = self.store.turns().lock().await;
                turns.cancel();
                self.modify(|s| s.set_ask(None) | s.set_loading(false))
            }
            InboundEvent::ClearAsk => {
                let mut turns = self.store.turns().lock().await;
                turns.cancel();
                self.modify(|s| s.set_ask(None))
            }
            InboundEvent::ChatSettings(inputs) => self.modify(|s| s.reset_chat_settings(inputs)),
            InboundEvent::Element(mut element) => {
                if let Some(base) = &self.file_base_url {
                    element.resolve_url(base);
                }
                self.modify(|s| s.upsert_element(&element))
            }
            InboundEvent::UpdateElement(patch) => {
                self.modify(|s| s.patch_element(&patch.id, &patch.for_ids))
            }
            InboundEvent::RemoveElement(target) => self.modify(|s| s.remove_element(&target.id)),
            InboundEvent::Action(action) => self.modify(|s| s.push_action(&action)),
            InboundEvent::RemoveAction(action) => self.modify(|s| s.remove_action(&action)),
            InboundEvent::TokenUsage(count) => self.modify(|s| s.add_tokens(count)),
        };
        if !changed {
            debug!(event = name, "event left state unchanged");
        }
    }

    async fn begin_ask(&self, request: AskRequest, ack_id: String) -> bool {
        let mut turns = self.store.turns().lock().await;
        let responder = AskResponder::new(Arc::clone(&self.transport), ack_id);
        let turn_id = turns.begin(self.generation, request.spec.clone(), responder);
        debug!(turn_id, kind = %request.spec.kind(), "awaiting answer");
        self.modify(|s| {
            let next = reconciler::add_message(&s.messages, &request.msg);
            let added = s.set_messages(next);
            let asked = s.set_ask(Some(request.spec));
            added | asked | s.set_loading(false)
        })
    }

    /// Announces the clear, then asks the owner to restart the session.
    async fn reload(&self) {
        info!(generation = self.generation, "server requested reload");
        if let Err(e) = self.transport.emit(outbound::CLEAR_SESSION, Value::Null).await {
            warn!(error = %e, "failed to send clear_session");
        }
        if self.reload.send(self.generation).is_err() {
            debug!("no reload handler registered");
        }
    }
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session channel lifecycle.
//!
//! The manager owns at most one open channel. Opening always tears the
//! previous one down first: its listener is cancelled and joined (which
//! drops the inbound receiver) and its transport closed. Only then is a new
//! generation started.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chatwire_core::{
    ChatwireError, Connection, ConnectionStatus, ConnectParams, Connector, Transport,
    TransportEvent,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::state::SessionStore;

struct ActiveChannel {
    generation: u64,
    params: ConnectParams,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    listener: JoinHandle<()>,
}

impl ActiveChannel {
    async fn shutdown(self) {
        self.cancel.cancel();
        self.listener.abort();
        if let Err(e) = self.listener.await {
            if !e.is_cancelled() {
                warn!(generation = self.generation, error = %e, "channel listener failed");
            }
        }
        if let Err(e) = self.transport.close().await {
            warn!(generation = self.generation, error = %e, "failed to close transport");
        }
        debug!(generation = self.generation, "channel torn down");
    }
}

/// Opens and closes the session's channel.
pub struct ChannelManager {
    connector: Arc<dyn Connector>,
    store: Arc<SessionStore>,
    file_base_url: Option<String>,
    reload: mpsc::UnboundedSender<u64>,
    active: Mutex<Option<ActiveChannel>>,
    generation: AtomicU64,
}

impl ChannelManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        store: Arc<SessionStore>,
        file_base_url: Option<String>,
        reload: mpsc::UnboundedSender<u64>,
    ) -> Self {
        Self {
            connector,
            store,
            file_base_url,
            reload,
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Generation of the most recently opened channel.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Parameters of the open channel, if any.
    pub async fn current_params(&self) -> Option<ConnectParams> {
        self.active.lock().await.as_ref().map(|a| a.params.clone())
    }

    /// The open channel's transport and generation.
    pub async fn transport(&self) -> Result<(u64, Arc<dyn Transport>), ChatwireError> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| (a.generation, Arc::clone(&a.transport)))
            .ok_or(ChatwireError::NotConnected)
    }

    /// Tears down any open channel, resets session state, and opens a new one.
    ///
    /// On a connector failure the new generation is left `Errored` and no
    /// channel is open.
    pub async fn open(&self, params: ConnectParams) -> Result<u64, ChatwireError> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.shutdown().await;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.reset(generation).await;
        info!(generation, session_id = %params.session_id, "opening channel");

        let Connection { transport, events } = match self.connector.connect(&params).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(generation, error = %e, "failed to open channel");
                self.store
                    .modify(generation, |s| s.set_status(ConnectionStatus::Errored));
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.store),
            Arc::clone(&transport),
            generation,
            self.file_base_url.clone(),
            self.reload.clone(),
        );
        let listener = tokio::spawn(listen(events, dispatcher, cancel.clone()));

        *active = Some(ActiveChannel {
            generation,
            params,
            transport,
            cancel,
            listener,
        });
        Ok(generation)
    }

    /// Closes the open channel, if any. Idempotent.
    pub async fn close(&self) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            info!(generation = previous.generation, "closing channel");
            previous.shutdown().await;
        }
        self.store.close(self.generation()).await;
    }
}

async fn listen(
    mut events: mpsc::Receiver<TransportEvent>,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => dispatcher.handle(event).await,
                None => {
                    debug!("transport event stream ended");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chatwire_core::SessionId;
    use chatwire_test_utils::{MockConnector, settle};
    use serde_json::json;

    use super::*;

    fn manager(connector: &Arc<MockConnector>) -> (ChannelManager, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::new());
        let (reload, _) = mpsc::unbounded_channel();
        let manager = ChannelManager::new(connector.clone(), Arc::clone(&store), None, reload);
        (manager, store)
    }

    fn params(id: &str) -> ConnectParams {
        ConnectParams::new(SessionId(id.into()))
    }

    #[tokio::test]
    async fn open_replaces_previous_channel() {
        let connector = Arc::new(MockConnector::new());
        let (manager, store) = manager(&connector);

        manager.open(params("a")).await.unwrap();
        let first = connector.latest().unwrap();
        manager.open(params("b")).await.unwrap();

        assert!(first.transport.is_closed());
        assert!(first.events_closed());
        assert_eq!(store.snapshot().generation, 2);
        assert_eq!(manager.current_params().await, Some(params("b")));
    }

    #[tokio::test]
    async fn events_from_closed_channel_are_not_applied() {
        let connector = Arc::new(MockConnector::new());
        let (manager, store) = manager(&connector);

        manager.open(params("a")).await.unwrap();
        let first = connector.latest().unwrap();
        manager.open(params("b")).await.unwrap();

        first.inject_event("task_start", json!(null)).await;
        settle().await;
        assert!(!store.snapshot().loading);
    }

    #[tokio::test]
    async fn connect_failure_marks_errored() {
        let connector = Arc::new(MockConnector::new());
        connector.fail_next_connect("refused");
        let (manager, store) = manager(&connector);

        assert!(manager.open(params("a")).await.is_err());
        assert_eq!(store.snapshot().status, ConnectionStatus::Errored);
        assert!(manager.transport().await.is_err());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let connector = Arc::new(MockConnector::new());
        let (manager, store) = manager(&connector);

        manager.open(params("a")).await.unwrap();
        manager.close().await;
        manager.close().await;
        assert_eq!(store.snapshot().status, ConnectionStatus::Closed);
        assert!(connector.latest().unwrap().transport.is_closed());
        assert!(manager.current_params().await.is_none());
    }
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket transport.
//!
//! Each [`WsConnector::connect`] call spawns one connection task that owns
//! the socket, reconnects with bounded exponential backoff, and forwards
//! decoded frames to the session as [`TransportEvent`]s. The task stops when
//! the transport is closed, the session drops its event receiver, or the
//! reconnect budget runs out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatwire_core::{
    ChatwireError, Connection, ConnectParams, Connector, Frame, Transport, TransportEvent,
};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const PING_INTERVAL: Duration = Duration::from_secs(25);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const EVENT_BUFFER: usize = 256;

pub const SESSION_ID_HEADER: &str = "x-chatwire-session-id";
pub const USER_ENV_HEADER: &str = "x-chatwire-user-env";

/// Connection settings for [`WsConnector`].
#[derive(Debug, Clone)]
pub struct WsOptions {
    pub url: String,
    pub connect_timeout: Duration,
    /// Consecutive failed attempts tolerated before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<usize>,
}

impl WsOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            max_reconnect_attempts: Some(5),
        }
    }
}

/// Opens WebSocket channels.
#[derive(Debug, Clone)]
pub struct WsConnector {
    options: WsOptions,
}

impl WsConnector {
    pub fn new(options: WsOptions) -> Self {
        Self { options }
    }
}

fn header(value: &str) -> Result<HeaderValue, ChatwireError> {
    HeaderValue::from_str(value).map_err(|e| ChatwireError::Transport {
        message: "invalid connection header".to_string(),
        source: Some(Box::new(e)),
    })
}

/// Builds the upgrade request carrying the session parameters as headers.
pub fn build_request(url: &str, params: &ConnectParams) -> Result<Request, ChatwireError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| ChatwireError::Transport {
            message: format!("invalid server url `{url}`"),
            source: Some(Box::new(e)),
        })?;
    let headers = request.headers_mut();
    if let Some(token) = &params.auth_token {
        headers.insert("authorization", header(&format!("Bearer {token}"))?);
    }
    headers.insert(SESSION_ID_HEADER, header(&params.session_id.0)?);
    headers.insert(USER_ENV_HEADER, header(&params.env_json())?);
    Ok(request)
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, params: &ConnectParams) -> Result<Connection, ChatwireError> {
        // Validate once up front; each attempt rebuilds its own request.
        build_request(&self.options.url, params)?;

        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let shared = Arc::new(Shared::default());
        let transport = Arc::new(WsTransport {
            url: self.options.url.clone(),
            shared: Arc::clone(&shared),
        });
        tokio::spawn(run(shared, self.options.clone(), params.clone(), events_tx));
        Ok(Connection { transport, events })
    }
}

#[derive(Default)]
struct Shared {
    outbound: Mutex<Option<mpsc::UnboundedSender<WsMessage>>>,
    pending_acks: Mutex<HashMap<String, oneshot::Sender<Value>>>,
    shutdown: CancellationToken,
}

impl Shared {
    async fn send(&self, frame: &Frame) -> Result<(), ChatwireError> {
        let json = serde_json::to_string(frame).map_err(|e| ChatwireError::Transport {
            message: format!("failed to encode `{}`", frame.event),
            source: Some(Box::new(e)),
        })?;
        let outbound = self.outbound.lock().await;
        let tx = outbound.as_ref().ok_or(ChatwireError::NotConnected)?;
        tx.send(WsMessage::Text(json.into()))
            .map_err(|_| ChatwireError::transport("socket writer stopped"))
    }

    async fn attach(&self, tx: mpsc::UnboundedSender<WsMessage>) {
        *self.outbound.lock().await = Some(tx);
    }

    /// Drops the writer and fails every outstanding acknowledgement.
    async fn detach(&self) {
        *self.outbound.lock().await = None;
        self.pending_acks.lock().await.clear();
    }
}

/// Outbound half of a WebSocket channel.
pub struct WsTransport {
    url: String,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("url", &self.url)
            .field("closed", &self.shared.shutdown.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn emit(&self, event: &str, data: Value) -> Result<(), ChatwireError> {
        self.shared.send(&Frame::fire(event, data)).await
    }

    async fn emit_with_ack(
        &self,
        event: &str,
        data: Value,
        timeout: Duration,
    ) -> Result<Value, ChatwireError> {
        let (frame, id) = Frame::with_ack(event, data);
        let (tx, rx) = oneshot::channel();
        self.shared.pending_acks.lock().await.insert(id.clone(), tx);

        if let Err(e) = self.shared.send(&frame).await {
            self.shared.pending_acks.lock().await.remove(&id);
            return Err(e);
        }

        match time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ChatwireError::transport(format!(
                "connection dropped before `{event}` was acknowledged"
            ))),
            Err(_) => {
                self.shared.pending_acks.lock().await.remove(&id);
                Err(ChatwireError::Timeout { duration: timeout })
            }
        }
    }

    async fn reply(&self, event: &str, ack_id: &str, data: Value) -> Result<(), ChatwireError> {
        self.shared.send(&Frame::ack(event, ack_id, data)).await
    }

    async fn close(&self) -> Result<(), ChatwireError> {
        if !self.shared.shutdown.is_cancelled() {
            debug!(url = %self.url, "closing websocket transport");
            self.shared.shutdown.cancel();
        }
        self.shared.detach().await;
        Ok(())
    }
}

enum SessionEnd {
    /// The transport was closed locally.
    Shutdown,
    /// The session dropped its event receiver.
    Unsubscribed,
    /// The connection was lost; retry.
    Dropped(String),
}

async fn run(
    shared: Arc<Shared>,
    options: WsOptions,
    params: ConnectParams,
    events: mpsc::Sender<TransportEvent>,
) {
    let mut backoff = INITIAL_BACKOFF;
    let mut failures: usize = 0;

    loop {
        if shared.shutdown.is_cancelled() || events.is_closed() {
            break;
        }
        let request = match build_request(&options.url, &params) {
            Ok(request) => request,
            Err(e) => {
                let _ = events.send(TransportEvent::ConnectError(e.to_string())).await;
                break;
            }
        };

        debug!(url = %options.url, "connecting");
        let attempt = tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            attempt = time::timeout(options.connect_timeout, tokio_tungstenite::connect_async(request)) => attempt,
        };

        let failure = match attempt {
            Ok(Ok((stream, _))) => {
                info!(url = %options.url, "websocket connected");
                failures = 0;
                backoff = INITIAL_BACKOFF;
                if events.send(TransportEvent::Connected).await.is_err() {
                    break;
                }
                match session(&shared, stream, &events).await {
                    SessionEnd::Shutdown | SessionEnd::Unsubscribed => break,
                    SessionEnd::Dropped(reason) => {
                        warn!(%reason, "websocket dropped, reconnecting");
                        if events.send(TransportEvent::Disconnected(reason)).await.is_err() {
                            break;
                        }
                        None
                    }
                }
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!(
                "connect timed out after {}s",
                options.connect_timeout.as_secs()
            )),
        };

        if let Some(reason) = failure {
            failures += 1;
            warn!(attempt = failures, %reason, "websocket connection failed");
            if events.send(TransportEvent::ConnectError(reason)).await.is_err() {
                break;
            }
            if options.max_reconnect_attempts.is_some_and(|max| failures > max) {
                warn!(failures, "reconnect attempts exhausted, giving up");
                break;
            }
        }

        debug!(backoff_ms = backoff.as_millis() as u64, "waiting before reconnect");
        tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            _ = time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }

    shared.detach().await;
    debug!(url = %options.url, "websocket task stopped");
}

async fn session(
    shared: &Shared,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &mpsc::Sender<TransportEvent>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    shared.attach(tx.clone()).await;

    let writer = async {
        while let Some(message) = rx.recv().await {
            if let Err(e) = write.send(message).await {
                return SessionEnd::Dropped(e.to_string());
            }
        }
        SessionEnd::Dropped("writer closed".to_string())
    };

    let pinger = async {
        let mut interval = time::interval(PING_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.send(WsMessage::Ping(Default::default())).is_err() {
                return SessionEnd::Dropped("writer closed".to_string());
            }
        }
    };

    let reader = async {
        while let Some(message) = read.next().await {
            match message {
                Ok(WsMessage::Text(text)) => {
                    if !deliver(shared, text.as_str(), events).await {
                        return SessionEnd::Unsubscribed;
                    }
                }
                Ok(WsMessage::Close(_)) => {
                    return SessionEnd::Dropped("closed by server".to_string());
                }
                Ok(_) => {}
                Err(e) => return SessionEnd::Dropped(e.to_string()),
            }
        }
        SessionEnd::Dropped("stream ended".to_string())
    };

    let end = tokio::select! {
        _ = shared.shutdown.cancelled() => SessionEnd::Shutdown,
        end = writer => end,
        end = pinger => end,
        end = reader => end,
    };
    shared.detach().await;
    end
}

/// Routes one text frame. Returns `false` once the session stopped listening.
async fn deliver(shared: &Shared, text: &str, events: &mpsc::Sender<TransportEvent>) -> bool {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "dropping undecodable frame");
            return true;
        }
    };

    if frame.acked_event().is_some() {
        if let Some(id) = &frame.id {
            if let Some(waiter) = shared.pending_acks.lock().await.remove(id) {
                let _ = waiter.send(frame.data);
            } else {
                debug!(event = %frame.event, "acknowledgement with no waiter");
            }
            return true;
        }
    }

    events
        .send(TransportEvent::Event {
            name: frame.event,
            data: frame.data,
            ack_id: frame.id,
        })
        .await
        .is_ok()
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Throttled connection bootstrapping.
//!
//! Requests to (re)establish the session are throttled leading edge plus
//! trailing: the first request in a window runs at once, later ones in the
//! same window collapse into a single run at the window's end with the most
//! recent parameters. Logout bypasses the throttle entirely.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chatwire_core::ConnectParams;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::ChannelManager;
use crate::state::SessionStore;

#[derive(Default)]
struct Throttle {
    last_run: Option<Instant>,
    pending: Option<ConnectParams>,
    timer: Option<CancellationToken>,
}

impl Throttle {
    fn clear(&mut self) {
        self.pending = None;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

struct Inner {
    channel: Arc<ChannelManager>,
    store: Arc<SessionStore>,
    window: Duration,
    throttle: std::sync::Mutex<Throttle>,
    /// Serializes channel opens so two runs never interleave.
    run_lock: Mutex<()>,
    shutdown: CancellationToken,
}

/// Decides when the session channel must be (re)opened.
#[derive(Clone)]
pub struct Bootstrapper {
    inner: Arc<Inner>,
}

impl Bootstrapper {
    /// Creates a bootstrapper and starts watching `reload` for restart requests.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        channel: Arc<ChannelManager>,
        store: Arc<SessionStore>,
        window: Duration,
        reload: mpsc::UnboundedReceiver<u64>,
    ) -> Self {
        let inner = Arc::new(Inner {
            channel,
            store,
            window,
            throttle: std::sync::Mutex::new(Throttle::default()),
            run_lock: Mutex::new(()),
            shutdown: CancellationToken::new(),
        });
        tokio::spawn(watch_reloads(Arc::downgrade(&inner), reload));
        Self { inner }
    }

    /// Requests a channel for `params`, subject to the throttle.
    pub async fn ensure_connected(&self, params: ConnectParams) {
        Inner::ensure_connected(&self.inner, params).await;
    }

    /// Closes the channel immediately and drops any pending request.
    pub async fn logout(&self) {
        self.inner.with_throttle(|t| {
            t.clear();
            t.last_run = None;
        });
        let _run = self.inner.run_lock.lock().await;
        info!("logging out");
        self.inner.channel.close().await;
    }

    /// Discards the session and bootstraps again from scratch with the last parameters.
    pub async fn restart(&self) {
        Inner::restart(&self.inner).await;
    }

    /// Stops the bootstrapper. Pending and future requests never run.
    pub fn cancel(&self) {
        self.inner.shutdown.cancel();
        self.inner.with_throttle(Throttle::clear);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl Inner {
    fn with_throttle<R>(&self, f: impl FnOnce(&mut Throttle) -> R) -> R {
        let mut guard = match self.throttle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    async fn ensure_connected(this: &Arc<Self>, params: ConnectParams) {
        if this.shutdown.is_cancelled() {
            debug!("bootstrapper cancelled, ignoring request");
            return;
        }

        let run_now = this.with_throttle(|t| {
            let now = Instant::now();
            match t.last_run {
                Some(last) if now < last + this.window => {
                    t.pending = Some(params.clone());
                    if t.timer.is_none() {
                        let timer = this.shutdown.child_token();
                        t.timer = Some(timer.clone());
                        tokio::spawn(trailing(Arc::downgrade(this), last + this.window, timer));
                    }
                    false
                }
                _ => {
                    t.last_run = Some(now);
                    true
                }
            }
        });

        if run_now {
            this.run(params).await;
        } else {
            debug!("bootstrap request coalesced");
        }
    }

    async fn run(&self, params: ConnectParams) {
        let _run = self.run_lock.lock().await;
        if self.shutdown.is_cancelled() {
            return;
        }
        let live = self.store.snapshot().status.is_live();
        if live && self.channel.current_params().await.as_ref() == Some(&params) {
            debug!(session_id = %params.session_id, "channel already open with these parameters");
            return;
        }
        if let Err(e) = self.channel.open(params).await {
            warn!(error = %e, "bootstrap failed");
        }
    }

    async fn restart(this: &Arc<Self>) {
        let Some(params) = this.channel.current_params().await else {
            debug!("no open channel to restart");
            return;
        };
        this.with_throttle(|t| {
            t.clear();
            t.last_run = None;
        });
        {
            let _run = this.run_lock.lock().await;
            this.channel.close().await;
        }
        info!(session_id = %params.session_id, "restarting session");
        Self::ensure_connected(this, params).await;
    }
}

async fn trailing(inner: Weak<Inner>, deadline: Instant, timer: CancellationToken) {
    tokio::select! {
        _ = timer.cancelled() => return,
        _ = tokio::time::sleep_until(deadline) => {}
    }
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let pending = inner.with_throttle(|t| {
        if timer.is_cancelled() {
            return None;
        }
        t.timer = None;
        let pending = t.pending.take();
        if pending.is_some() {
            t.last_run = Some(Instant::now());
        }
        pending
    });
    if let Some(params) = pending {
        debug!("running coalesced bootstrap request");
        inner.run(params).await;
    }
}

async fn watch_reloads(inner: Weak<Inner>, mut reload: mpsc::UnboundedReceiver<u64>) {
    while let Some(generation) = reload.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if inner.shutdown.is_cancelled() {
            break;
        }
        if inner.channel.generation() != generation {
            debug!(generation, "ignoring reload from superseded channel");
            continue;
        }
        Inner::restart(&inner).await;
    }
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime session client for the chatwire chat backend.
//!
//! A [`ChatClient`] keeps one channel open per session, applies server
//! events to an observable [`ChatState`], and turns UI intents into
//! outbound events:
//!
//! - [`bootstrap`] decides when a channel must be (re)opened, throttled.
//! - [`channel`] opens and tears down channels and runs the listener.
//! - `dispatch` applies decoded events, one at a time.
//! - [`reconciler`] and [`registry`] compute new message and element collections.
//! - [`turn`] tracks the live "ask user" request.
//! - [`ws`] is the WebSocket [`Connector`](chatwire_core::Connector).

pub mod bootstrap;
pub mod channel;
pub mod client;
mod dispatch;
pub mod reconciler;
pub mod registry;
pub mod state;
pub mod turn;
pub mod upload;
pub mod ws;

pub use bootstrap::Bootstrapper;
pub use channel::ChannelManager;
pub use client::{ChatClient, ClientOptions};
pub use state::{ChatSettings, ChatState, SessionStore};
pub use turn::{TurnManager, TurnState};
pub use ws::{WsConnector, WsOptions};

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the chatwire session client.
//!
//! This crate provides the domain types (messages, elements, actions, ask
//! specifications), the wire frame and typed inbound event schemas, the error
//! type, and the transport traits the client is built on.

pub mod ask;
pub mod element;
pub mod error;
pub mod events;
pub mod message;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use ask::{AcceptPolicy, AskAnswer, AskKind, AskSpec, FileAnswer, FileAskSpec, TextAskSpec};
pub use element::{Action, Element, ElementCollection, ElementDisplay};
pub use error::{ChatwireError, UploadError};
pub use events::{Frame, InboundEvent};
pub use message::Message;
pub use types::{ConnectParams, ConnectionStatus, SessionId, UserEnv};

pub use traits::{Connection, Connector, Transport, TransportEvent};

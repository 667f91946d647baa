// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait definitions.
//!
//! The session client only speaks to the backend through these traits and
//! uses `#[async_trait]` so implementations can be held as trait objects.

pub mod transport;

pub use transport::{Connection, Connector, Transport, TransportEvent};

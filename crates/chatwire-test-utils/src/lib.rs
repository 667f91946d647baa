// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for chatwire.
//!
//! Deterministic stand-ins for the network so session behavior can be
//! tested without a backend.
//!
//! - [`MockConnector`] - hands out scripted channels and records connect parameters
//! - [`MockTransport`] - captures outbound events and replies, with canned acknowledgements

pub mod mock_connector;
pub mod mock_transport;

pub use mock_connector::{MockConnection, MockConnector};
pub use mock_transport::{Emitted, MockTransport, Reply};

/// Lets spawned tasks run until they block.
///
/// Tests use this after injecting events instead of sleeping, so they stay
/// fast under paused time.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Locks a std mutex, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

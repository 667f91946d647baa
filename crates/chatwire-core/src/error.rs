// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the chatwire session client.

use thiserror::Error;

use crate::ask::AskKind;

/// The primary error type returned by transports and client operations.
///
/// Passive event processing never surfaces these to the UI; they are only
/// returned from user-initiated operations (send, answer, call action) and
/// from connection establishment.
#[derive(Debug, Error)]
pub enum ChatwireError {
    /// Configuration errors (invalid values, missing required settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failures (connect refused, socket closed, frame encoding).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An inbound event whose payload does not match its schema.
    #[error("malformed `{event}` payload: {message}")]
    Protocol { event: String, message: String },

    /// A file answer was rejected before anything was sent.
    #[error("upload rejected: {0}")]
    Upload(#[from] UploadError),

    /// An answer was submitted while no ask request is live.
    #[error("no ask request is awaiting an answer")]
    NotAwaiting,

    /// A plain message was sent while an ask request is live.
    #[error("an ask request is awaiting an answer")]
    AskPending,

    /// The answer kind does not match the live ask request.
    #[error("the pending ask expects a {expected} answer")]
    AnswerKindMismatch { expected: AskKind },

    /// The ask request was cancelled or replaced while the answer was being prepared.
    #[error("the ask request was cancelled before the answer could be delivered")]
    Superseded,

    /// No channel is open.
    #[error("channel is not connected")]
    NotConnected,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatwireError {
    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a malformed payload on `event`.
    pub fn protocol(event: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Protocol {
            event: event.into(),
            message: message.to_string(),
        }
    }
}

/// Reasons a file answer batch is rejected. The whole batch fails on the first one.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No files were selected.
    #[error("no files selected")]
    Empty,

    /// More files than the ask allows.
    #[error("{count} files selected, at most {max} allowed")]
    TooManyFiles { count: usize, max: usize },

    /// A file exceeds the size limit.
    #[error("`{name}` is {size} bytes, the limit is {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },

    /// A file matches none of the accepted patterns.
    #[error("`{name}` ({mime}) is not an accepted file type")]
    NotAccepted { name: String, mime: String },

    /// A file could not be read.
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

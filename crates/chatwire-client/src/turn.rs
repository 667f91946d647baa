// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! "Ask user" turn state machine.
//!
//! At most one ask is live. Its responder is owned by the [`PendingAsk`] and
//! consumed on use, so a callback can fire at most once; dropping a pending
//! ask (timeout, clear, supersession, session switch) leaves it unanswered.

use std::fmt;
use std::sync::Arc;

use chatwire_core::events::outbound;
use chatwire_core::{AskAnswer, AskSpec, ChatwireError, Transport};
use tracing::debug;

/// Replies to the server's `ask` over the channel that delivered it.
pub struct AskResponder {
    transport: Arc<dyn Transport>,
    ack_id: String,
}

impl AskResponder {
    pub fn new(transport: Arc<dyn Transport>, ack_id: impl Into<String>) -> Self {
        Self {
            transport,
            ack_id: ack_id.into(),
        }
    }

    /// Delivers the answer. Consumes the responder.
    pub async fn respond(self, answer: &AskAnswer) -> Result<(), ChatwireError> {
        let data = serde_json::to_value(answer)
            .map_err(|e| ChatwireError::Internal(format!("failed to encode answer: {e}")))?;
        self.transport
            .reply(outbound::ASK, &self.ack_id, data)
            .await
    }
}

impl fmt::Debug for AskResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AskResponder")
            .field("transport", &self.transport.name())
            .field("ack_id", &self.ack_id)
            .finish()
    }
}

/// A live ask request.
#[derive(Debug)]
pub struct PendingAsk {
    pub turn_id: u64,
    pub generation: u64,
    pub spec: AskSpec,
    pub responder: AskResponder,
}

/// Turn state.
#[derive(Debug, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Awaiting(PendingAsk),
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Awaiting(ask) => write!(f, "awaiting({} #{})", ask.spec.kind(), ask.turn_id),
        }
    }
}

/// Tracks the live ask and hands out monotonically increasing turn ids.
#[derive(Debug, Default)]
pub struct TurnManager {
    state: TurnState,
    last_turn: u64,
}

impl TurnManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, TurnState::Awaiting(_))
    }

    /// The live ask's turn id, generation and spec.
    pub fn current(&self) -> Option<(u64, u64, &AskSpec)> {
        match &self.state {
            TurnState::Awaiting(ask) => Some((ask.turn_id, ask.generation, &ask.spec)),
            TurnState::Idle => None,
        }
    }

    /// Enters `Awaiting`, dropping any live ask unanswered. Returns the new turn id.
    pub fn begin(&mut self, generation: u64, spec: AskSpec, responder: AskResponder) -> u64 {
        self.last_turn += 1;
        let turn_id = self.last_turn;
        if let TurnState::Awaiting(old) = &self.state {
            debug!(old_turn = old.turn_id, turn_id, "ask superseded");
        }
        self.state = TurnState::Awaiting(PendingAsk {
            turn_id,
            generation,
            spec,
            responder,
        });
        turn_id
    }

    /// Returns to `Idle`. Returns whether an ask was live.
    pub fn cancel(&mut self) -> bool {
        matches!(
            std::mem::take(&mut self.state),
            TurnState::Awaiting(_)
        )
    }

    /// Takes the live ask if it is still turn `turn_id` of `generation`.
    pub fn take_if(&mut self, turn_id: u64, generation: u64) -> Option<PendingAsk> {
        let live = matches!(
            &self.state,
            TurnState::Awaiting(ask) if ask.turn_id == turn_id && ask.generation == generation
        );
        if !live {
            return None;
        }
        match std::mem::take(&mut self.state) {
            TurnState::Awaiting(ask) => Some(ask),
            TurnState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::TextAskSpec;
    use chatwire_test_utils::MockTransport;

    fn responder() -> AskResponder {
        AskResponder::new(Arc::new(MockTransport::new()), "ack")
    }

    fn text_spec() -> AskSpec {
        AskSpec::Text(TextAskSpec { timeout: 60 })
    }

    #[test]
    fn begin_then_take_returns_to_idle() {
        let mut turns = TurnManager::new();
        let id = turns.begin(1, text_spec(), responder());
        assert!(turns.is_awaiting());
        assert!(turns.take_if(id, 1).is_some());
        assert!(!turns.is_awaiting());
        assert!(turns.take_if(id, 1).is_none());
    }

    #[test]
    fn superseded_turn_cannot_be_taken() {
        let mut turns = TurnManager::new();
        let first = turns.begin(1, text_spec(), responder());
        let second = turns.begin(1, text_spec(), responder());
        assert_ne!(first, second);
        assert!(turns.take_if(first, 1).is_none());
        assert!(turns.is_awaiting());
        assert!(turns.take_if(second, 1).is_some());
    }

    #[test]
    fn generation_mismatch_cannot_be_taken() {
        let mut turns = TurnManager::new();
        let id = turns.begin(1, text_spec(), responder());
        assert!(turns.take_if(id, 2).is_none());
    }

    #[test]
    fn cancel_reports_whether_an_ask_was_live() {
        let mut turns = TurnManager::new();
        assert!(!turns.cancel());
        turns.begin(3, text_spec(), responder());
        assert_eq!(turns.state().to_string(), "awaiting(text #1)");
        assert!(turns.cancel());
        assert_eq!(turns.state().to_string(), "idle");
    }

    #[tokio::test]
    async fn responder_replies_on_the_ask_event() {
        let transport = Arc::new(MockTransport::new());
        let responder = AskResponder::new(transport.clone(), "ack-9");
        let answer = AskAnswer::Message(chatwire_core::Message::new("u1", "me", "yes"));
        responder.respond(&answer).await.unwrap();

        let replies = transport.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].event, "ask");
        assert_eq!(replies[0].ack_id, "ack-9");
        assert_eq!(replies[0].data["content"], "yes");
    }
}

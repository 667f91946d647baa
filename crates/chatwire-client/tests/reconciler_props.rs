// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Randomized message sequences never produce duplicate identities.

use std::collections::HashSet;

use chatwire_client::reconciler;
use chatwire_core::Message;
use chatwire_core::events::{MessageUpdate, StreamToken};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    New { id: u8, parent: Option<u8> },
    Send,
    Confirm { pick: usize, new_id: u8 },
    Update { id: u8, new_id: Option<u8> },
    Delete { id: u8 },
    Token { id: u8, snapshot: bool },
    Echo { pick: usize, id: u8, as_update: bool },
}

fn id(n: u8) -> String {
    format!("m{n}")
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..12, proptest::option::of(0u8..12)).prop_map(|(id, parent)| Op::New { id, parent }),
        Just(Op::Send),
        (any::<usize>(), 0u8..12).prop_map(|(pick, new_id)| Op::Confirm { pick, new_id }),
        (0u8..12, proptest::option::of(0u8..12)).prop_map(|(id, new_id)| Op::Update { id, new_id }),
        (0u8..12).prop_map(|id| Op::Delete { id }),
        (0u8..12, any::<bool>()).prop_map(|(id, snapshot)| Op::Token { id, snapshot }),
        (any::<usize>(), 0u8..12, any::<bool>())
            .prop_map(|(pick, id, as_update)| Op::Echo { pick, id, as_update }),
    ]
}

fn apply(messages: &mut Vec<Message>, sent: &mut Vec<Message>, op: Op) {
    let next = match op {
        Op::New { id: n, parent } => {
            let mut message = Message::new(id(n), "Assistant", "x");
            message.parent_id = parent.map(id);
            reconciler::add_message(messages, &message)
        }
        Op::Send => {
            let message = Message::from_user("User", "hi");
            sent.push(message.clone());
            reconciler::add_message(messages, &message)
        }
        Op::Confirm { pick, new_id } => {
            if sent.is_empty() {
                return;
            }
            let update = MessageUpdate {
                message: sent[pick % sent.len()].clone(),
                new_id: Some(id(new_id)),
            };
            reconciler::update_message(messages, &update)
        }
        Op::Update { id: n, new_id } => {
            let update = MessageUpdate {
                message: Message::new(id(n), "Assistant", "y"),
                new_id: new_id.map(id),
            };
            reconciler::update_message(messages, &update)
        }
        Op::Delete { id: n } => {
            reconciler::delete_message(messages, &Message::new(id(n), "Assistant", ""))
        }
        Op::Token { id: n, snapshot } => {
            let token = StreamToken {
                id: id(n),
                token: "t".into(),
                is_sequence: snapshot,
            };
            reconciler::apply_token(messages, &token)
        }
        Op::Echo { pick, id: n, as_update } => {
            if sent.is_empty() {
                return;
            }
            let mut echoed = Message::new(id(n), "User", "hi");
            echoed.temp_id = sent[pick % sent.len()].temp_id.clone();
            if as_update {
                let update = MessageUpdate {
                    message: echoed,
                    new_id: None,
                };
                reconciler::update_message(messages, &update)
            } else {
                reconciler::add_message(messages, &echoed)
            }
        }
    };
    if let Some(next) = next {
        *messages = next;
    }
}

proptest! {
    #[test]
    fn identities_stay_unique(ops in proptest::collection::vec(op(), 0..64)) {
        let mut messages = Vec::new();
        let mut sent = Vec::new();
        for op in ops {
            apply(&mut messages, &mut sent, op);
            let ids = reconciler::identities(&messages);
            let unique: HashSet<&str> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len(), "duplicate identity in {:?}", ids);
        }
    }

    #[test]
    fn deltas_concatenate(tokens in proptest::collection::vec("[a-z ]{1,5}", 1..20)) {
        let mut messages = reconciler::start_stream(&[], &Message::new("s", "Assistant", ""));
        for token in &tokens {
            let delta = StreamToken { id: "s".into(), token: token.clone(), is_sequence: false };
            messages = reconciler::apply_token(&messages, &delta).unwrap();
        }
        prop_assert_eq!(&messages[0].content, &tokens.concat());
    }
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered message tree reconciliation.
//!
//! Every operation reads the current sequence and returns the replacement,
//! or `None` when the event changes nothing. Callers swap the whole sequence
//! in, so readers holding the previous snapshot never observe a half-applied
//! update.

use chatwire_core::Message;
use chatwire_core::events::{MessageUpdate, StreamToken};

/// Index path to a message: top-level position followed by step positions.
type Path = Vec<usize>;

fn locate(messages: &[Message], pred: &dyn Fn(&Message) -> bool) -> Option<Path> {
    for (i, message) in messages.iter().enumerate() {
        if pred(message) {
            return Some(vec![i]);
        }
        if let Some(mut rest) = locate(&message.steps, pred) {
            rest.insert(0, i);
            return Some(rest);
        }
    }
    None
}

fn at_mut<'a>(messages: &'a mut [Message], path: &[usize]) -> Option<&'a mut Message> {
    let (first, rest) = path.split_first()?;
    let message = messages.get_mut(*first)?;
    if rest.is_empty() {
        Some(message)
    } else {
        at_mut(&mut message.steps, rest)
    }
}

fn at<'a>(messages: &'a [Message], path: &[usize]) -> Option<&'a Message> {
    let (first, rest) = path.split_first()?;
    let message = messages.get(*first)?;
    if rest.is_empty() {
        Some(message)
    } else {
        at(&message.steps, rest)
    }
}

fn remove_at(messages: &mut Vec<Message>, path: &[usize]) -> Option<Message> {
    match path.split_last()? {
        (last, []) => (*last < messages.len()).then(|| messages.remove(*last)),
        (last, parent) => {
            let steps = &mut at_mut(messages, parent)?.steps;
            (*last < steps.len()).then(|| steps.remove(*last))
        }
    }
}

/// Drops every message claiming an identity of `claimed`, except the one at `keep`.
///
/// Returns `None` when an ancestor of the kept message holds such an identity.
fn prune_claims(
    messages: &mut Vec<Message>,
    keep: Option<&[usize]>,
    claimed: &Message,
) -> Option<()> {
    let (kept, below) = match keep.and_then(|path| path.split_first()) {
        Some((first, rest)) => (Some(*first), rest),
        None => (None, &[][..]),
    };
    if let Some(ancestor) = kept.filter(|_| !below.is_empty()) {
        if messages.get(ancestor)?.same_identity(claimed) {
            return None;
        }
    }
    let mut index = 0;
    let mut retained = 0;
    let mut kept_at = None;
    messages.retain(|m| {
        let on_path = Some(index) == kept;
        index += 1;
        let retain = on_path || !m.same_identity(claimed);
        if on_path {
            kept_at = Some(retained);
        }
        if retain {
            retained += 1;
        }
        retain
    });
    for (i, message) in messages.iter_mut().enumerate() {
        let keep = (Some(i) == kept_at).then_some(below);
        prune_claims(&mut message.steps, keep, claimed)?;
    }
    Some(())
}

/// Appends under the live parent named by `parent_id`, else at top level.
fn insert(messages: &mut Vec<Message>, message: Message) {
    let parent = message
        .parent_id
        .as_deref()
        .and_then(|pid| locate(messages.as_slice(), &|m| m.matches(pid)));
    match parent.and_then(|path| at_mut(messages, &path)) {
        Some(parent) => parent.steps.push(message),
        None => messages.push(message),
    }
}

/// Replaces `slot` with `incoming`, keeping known steps when the payload carries none.
fn replace(slot: &mut Message, mut incoming: Message) {
    if incoming.steps.is_empty() {
        incoming.steps = std::mem::take(&mut slot.steps);
    }
    *slot = incoming;
}

/// Overwrites the message at `path` and drops any other holder of its identities.
fn reconcile(
    messages: &[Message],
    path: &[usize],
    replacement: Message,
) -> Option<Vec<Message>> {
    let mut next = messages.to_vec();
    replace(at_mut(&mut next, path)?, replacement.clone());
    prune_claims(&mut next, Some(path), &replacement)?;
    (next.as_slice() != messages).then_some(next)
}

/// Handles `new_message`: replace in place when the identity is known, append otherwise.
pub fn add_message(messages: &[Message], incoming: &Message) -> Option<Vec<Message>> {
    match locate(messages, &|m| m.same_identity(incoming)) {
        Some(path) => reconcile(messages, &path, incoming.clone()),
        None => {
            let mut next = messages.to_vec();
            insert(&mut next, incoming.clone());
            Some(next)
        }
    }
}

/// Handles `update_message`, migrating to `new_id` when one is given.
///
/// Migration clears the provisional id. Any other message already claiming
/// the resulting identity is dropped, so identities stay unique.
pub fn update_message(messages: &[Message], update: &MessageUpdate) -> Option<Vec<Message>> {
    let incoming = &update.message;
    let path = locate(messages, &|m| m.same_identity(incoming))?;

    let mut replacement = incoming.clone();
    if let Some(new_id) = &update.new_id {
        replacement.id = new_id.clone();
        replacement.temp_id = None;
    }
    reconcile(messages, &path, replacement)
}

/// Handles `delete_message`.
pub fn delete_message(messages: &[Message], target: &Message) -> Option<Vec<Message>> {
    let path = locate(messages, &|m| m.same_identity(target))?;
    let mut next = messages.to_vec();
    remove_at(&mut next, &path)?;
    Some(next)
}

/// Handles `stream_start`: always appends, even when the id is already present.
pub fn start_stream(messages: &[Message], incoming: &Message) -> Vec<Message> {
    let mut next = messages.to_vec();
    insert(&mut next, incoming.clone());
    next
}

/// Handles `stream_token`: replaces content for snapshots, appends deltas.
pub fn apply_token(messages: &[Message], token: &StreamToken) -> Option<Vec<Message>> {
    let path = locate(messages, &|m| m.matches(&token.id))?;
    let current = at(messages, &path)?;
    if token.is_sequence {
        if current.content == token.token {
            return None;
        }
    } else if token.token.is_empty() {
        return None;
    }

    let mut next = messages.to_vec();
    let slot = at_mut(&mut next, &path)?;
    if token.is_sequence {
        slot.content = token.token.clone();
    } else {
        slot.content.push_str(&token.token);
    }
    Some(next)
}

/// Every id (final and provisional) in the tree, depth first.
pub fn identities(messages: &[Message]) -> Vec<&str> {
    let mut ids = Vec::new();
    for message in messages {
        ids.push(message.id.as_str());
        if let Some(temp) = message.temp_id.as_deref() {
            if temp != message.id {
                ids.push(temp);
            }
        }
        ids.extend(identities(&message.steps));
    }
    ids
}

// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Published session state.
//!
//! [`ChatState`] is what UI code reads. It lives in a `watch` channel; every
//! mutation goes through [`SessionStore::modify`], which runs under the
//! channel's write lock and only notifies subscribers when something changed.

use std::sync::Arc;

use chatwire_core::{
    Action, AskSpec, ConnectionStatus, Element, ElementCollection, Message,
};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, watch};

use crate::registry;
use crate::turn::TurnManager;

/// The chat settings form and its current values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSettings {
    /// Input widgets as sent by the server.
    pub inputs: Arc<Vec<Value>>,
    /// Current values keyed by input id.
    pub values: Arc<Map<String, Value>>,
}

impl ChatSettings {
    /// A form whose values start at each input's `initial`.
    pub fn from_inputs(inputs: Vec<Value>) -> Self {
        let values = defaults_of(&inputs);
        Self {
            inputs: Arc::new(inputs),
            values: Arc::new(values),
        }
    }

    /// `id -> initial` for every input that has an id.
    pub fn defaults(&self) -> Map<String, Value> {
        defaults_of(&self.inputs)
    }
}

fn defaults_of(inputs: &[Value]) -> Map<String, Value> {
    inputs
        .iter()
        .filter_map(|input| {
            let id = input.get("id")?.as_str()?;
            let initial = input.get("initial").cloned().unwrap_or(Value::Null);
            Some((id.to_string(), initial))
        })
        .collect()
}

/// A snapshot of one session.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    /// Channel generation this state belongs to. Bumped on every open.
    pub generation: u64,
    pub status: ConnectionStatus,
    /// A server task is running.
    pub loading: bool,
    pub messages: Arc<Vec<Message>>,
    pub elements: Arc<Vec<Element>>,
    pub avatars: Arc<Vec<Element>>,
    pub tasklists: Arc<Vec<Element>>,
    pub actions: Arc<Vec<Action>>,
    /// The live ask request, if any.
    pub ask: Option<AskSpec>,
    pub chat_settings: ChatSettings,
    pub token_count: u64,
}

fn swap<T>(slot: &mut Arc<Vec<T>>, next: Option<Vec<T>>) -> bool {
    match next {
        Some(next) => {
            *slot = Arc::new(next);
            true
        }
        None => false,
    }
}

impl ChatState {
    fn fresh(generation: u64, status: ConnectionStatus) -> Self {
        Self {
            generation,
            status,
            ..Self::default()
        }
    }

    pub fn collection(&self, collection: ElementCollection) -> &Arc<Vec<Element>> {
        match collection {
            ElementCollection::Elements => &self.elements,
            ElementCollection::Avatars => &self.avatars,
            ElementCollection::Tasklists => &self.tasklists,
        }
    }

    fn collection_mut(&mut self, collection: ElementCollection) -> &mut Arc<Vec<Element>> {
        match collection {
            ElementCollection::Elements => &mut self.elements,
            ElementCollection::Avatars => &mut self.avatars,
            ElementCollection::Tasklists => &mut self.tasklists,
        }
    }

    pub fn set_status(&mut self, status: ConnectionStatus) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }

    pub fn set_loading(&mut self, loading: bool) -> bool {
        if self.loading == loading {
            return false;
        }
        self.loading = loading;
        true
    }

    pub fn set_messages(&mut self, next: Option<Vec<Message>>) -> bool {
        swap(&mut self.messages, next)
    }

    pub fn upsert_element(&mut self, element: &Element) -> bool {
        let slot = self.collection_mut(element.collection());
        let next = registry::upsert_element(slot.as_slice(), element);
        swap(slot, next)
    }

    /// Only the generic collection supports re-scoping.
    pub fn patch_element(&mut self, id: &str, for_ids: &[String]) -> bool {
        let next = registry::patch_for_ids(&self.elements, id, for_ids);
        swap(&mut self.elements, next)
    }

    /// Removes `id` from every collection.
    pub fn remove_element(&mut self, id: &str) -> bool {
        let mut changed = false;
        for collection in [
            ElementCollection::Elements,
            ElementCollection::Avatars,
            ElementCollection::Tasklists,
        ] {
            let slot = self.collection_mut(collection);
            let next = registry::remove_element(slot.as_slice(), id);
            changed |= swap(slot, next);
        }
        changed
    }

    pub fn push_action(&mut self, action: &Action) -> bool {
        self.actions = Arc::new(registry::push_action(&self.actions, action));
        true
    }

    pub fn remove_action(&mut self, action: &Action) -> bool {
        let next = registry::remove_action(&self.actions, action);
        swap(&mut self.actions, next)
    }

    /// Replaces the settings form and resets values to its defaults.
    pub fn reset_chat_settings(&mut self, inputs: Vec<Value>) -> bool {
        self.chat_settings = ChatSettings::from_inputs(inputs);
        true
    }

    pub fn set_chat_settings_values(&mut self, values: Map<String, Value>) -> bool {
        if *self.chat_settings.values == values {
            return false;
        }
        self.chat_settings.values = Arc::new(values);
        true
    }

    pub fn add_tokens(&mut self, count: u64) -> bool {
        if count == 0 {
            return false;
        }
        self.token_count = self.token_count.saturating_add(count);
        true
    }

    pub fn set_ask(&mut self, ask: Option<AskSpec>) -> bool {
        if self.ask == ask {
            return false;
        }
        self.ask = ask;
        true
    }
}

/// Owns the published state and the turn manager of the current session.
///
/// Lock order: `turns` before the state channel. Nothing holds the state
/// lock across an await.
#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<ChatState>,
    turns: Mutex<TurnManager>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            state,
            turns: Mutex::new(TurnManager::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    pub fn turns(&self) -> &Mutex<TurnManager> {
        &self.turns
    }

    /// Applies `f` if the state still belongs to `generation`.
    ///
    /// `f` returns whether it changed anything; subscribers are notified only then.
    pub fn modify(&self, generation: u64, f: impl FnOnce(&mut ChatState) -> bool) -> bool {
        self.state
            .send_if_modified(|state| state.generation == generation && f(state))
    }

    /// Discards all session state and starts `generation` in `Connecting`.
    pub async fn reset(&self, generation: u64) {
        let mut turns = self.turns.lock().await;
        turns.cancel();
        self.state
            .send_replace(ChatState::fresh(generation, ConnectionStatus::Connecting));
    }

    /// Marks `generation` closed and drops any live ask.
    pub async fn close(&self, generation: u64) {
        let mut turns = self.turns.lock().await;
        turns.cancel();
        self.modify(generation, |state| {
            let closed = state.set_status(ConnectionStatus::Closed);
            state.set_ask(None) | closed
        });
    }
}

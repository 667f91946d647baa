// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Element and action collections.
//!
//! Like the reconciler, these return the replacement collection or `None`
//! when nothing changes.

use chatwire_core::{Action, Element};

/// Adds an element, replacing an existing one with the same id in place.
pub fn upsert_element(elements: &[Element], element: &Element) -> Option<Vec<Element>> {
    let mut next = elements.to_vec();
    match next.iter_mut().find(|e| e.id == element.id) {
        Some(existing) if existing == element => return None,
        Some(existing) => *existing = element.clone(),
        None => next.push(element.clone()),
    }
    Some(next)
}

/// Re-scopes an element to `for_ids`. Absent ids are ignored.
pub fn patch_for_ids(elements: &[Element], id: &str, for_ids: &[String]) -> Option<Vec<Element>> {
    let index = elements.iter().position(|e| e.id == id)?;
    if elements[index].for_ids == for_ids {
        return None;
    }
    let mut next = elements.to_vec();
    next[index].for_ids = for_ids.to_vec();
    Some(next)
}

/// Removes every element with `id`.
pub fn remove_element(elements: &[Element], id: &str) -> Option<Vec<Element>> {
    if !elements.iter().any(|e| e.id == id) {
        return None;
    }
    Some(elements.iter().filter(|e| e.id != id).cloned().collect())
}

/// Appends an action. Duplicates are kept.
pub fn push_action(actions: &[Action], action: &Action) -> Vec<Action> {
    let mut next = actions.to_vec();
    next.push(action.clone());
    next
}

/// Removes the first action structurally equal to `action`.
pub fn remove_action(actions: &[Action], action: &Action) -> Option<Vec<Action>> {
    let index = actions.iter().position(|a| a.structurally_eq(action))?;
    let mut next = actions.to_vec();
    next.remove(index);
    Some(next)
}

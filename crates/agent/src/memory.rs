//! Memory Store (C3, §4.3).
//!
//! Grounded on the teacher's `voice-agent-agent::memory` family: a
//! `dashmap::DashMap` sharded by user id with a `parking_lot::Mutex` guard
//! per entry, giving per-user serialization and independent cross-user
//! reads without a single global lock. `ConversationState` lives behind a
//! second map in the same store since both caches share the same 1h
//! inactivity eviction trigger (§3).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use pregnancy_core::{ConversationState, ShortTermMemory, Turn, UserId};
use std::time::Duration as StdDuration;

/// Process-wide, in-memory caches for short-term turn history and
/// per-user conversation state (§9: "global, process-wide state").
pub struct MemoryStore {
    window: usize,
    idle: chrono::Duration,
    short_term: DashMap<UserId, Mutex<ShortTermMemory>>,
    state: DashMap<UserId, Mutex<ConversationState>>,
}

impl MemoryStore {
    pub fn new(window: usize, idle: StdDuration) -> Self {
        Self {
            window,
            idle: chrono::Duration::from_std(idle).unwrap_or(chrono::Duration::hours(1)),
            short_term: DashMap::new(),
            state: DashMap::new(),
        }
    }

    /// `add(user, turn)` (§4.3).
    pub fn add(&self, user: &UserId, turn: Turn) {
        let mut slot = self
            .short_term
            .entry(user.clone())
            .or_insert_with(|| Mutex::new(ShortTermMemory::new(self.window)));
        slot.lock().push(turn);
    }

    /// `recent(user) -> sequence` (§4.3).
    pub fn recent(&self, user: &UserId) -> Vec<Turn> {
        match self.short_term.get(user) {
            Some(slot) => slot.lock().recent().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// `should_reset(user) -> bool` (§4.3): true if the conversation state
    /// is fresh (no prior turn) or its last turn is older than the
    /// configured idle window.
    pub fn should_reset(&self, user: &UserId) -> bool {
        match self.state.get(user) {
            Some(entry) => idle_since(&entry.lock(), self.idle, Utc::now()),
            None => true,
        }
    }

    /// Drop a user's short-term window, e.g. after an idle timeout is
    /// observed (§4.12 step 7).
    pub fn reset_short_term(&self, user: &UserId) {
        if let Some(slot) = self.short_term.get(user) {
            slot.lock().clear();
        }
    }

    /// FSM transition `ACTIVE -> ACTIVE(secondary++, follow_up++)` or the
    /// initial `FRESH -> ACTIVE(primary=extract)` (§4.12).
    pub fn record_turn(&self, user: &UserId, message: &str) {
        let mut entry = self
            .state
            .entry(user.clone())
            .or_insert_with(|| Mutex::new(ConversationState::default()));
        entry.lock().record_turn(Utc::now(), message);
    }

    /// FSM transition `ACTIVE -> FRESH (reset)` (§4.12 steps 6/7).
    pub fn reset_state(&self, user: &UserId) {
        if let Some(entry) = self.state.get(user) {
            entry.lock().reset();
        }
    }
}

fn idle_since(state: &ConversationState, idle: chrono::Duration, now: DateTime<Utc>) -> bool {
    match state.last_turn_at {
        None => true,
        Some(last) => now - last > idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pregnancy_core::Role;
    use uuid::Uuid;

    fn store() -> MemoryStore {
        MemoryStore::new(2, StdDuration::from_secs(3600))
    }

    #[test]
    fn add_trims_to_window() {
        let store = store();
        let user = "u1".to_string();
        let conv = Uuid::new_v4();
        store.add(&user, Turn::new(conv, Role::User, "one"));
        store.add(&user, Turn::new(conv, Role::User, "two"));
        store.add(&user, Turn::new(conv, Role::User, "three"));
        let recent: Vec<_> = store.recent(&user).into_iter().map(|t| t.content).collect();
        assert_eq!(recent, vec!["two", "three"]);
    }

    #[test]
    fn fresh_user_should_reset() {
        let store = store();
        assert!(store.should_reset(&"ghost".to_string()));
    }

    #[test]
    fn recording_a_turn_clears_should_reset() {
        let store = store();
        let user = "u1".to_string();
        store.record_turn(&user, "I'm worried about my symptoms");
        assert!(!store.should_reset(&user));
    }

    #[test]
    fn reset_state_makes_user_fresh_again() {
        let store = store();
        let user = "u1".to_string();
        store.record_turn(&user, "hello");
        store.reset_state(&user);
        assert!(store.should_reset(&user));
    }

    #[test]
    fn reset_short_term_clears_history_but_not_state() {
        let store = store();
        let user = "u1".to_string();
        let conv = Uuid::new_v4();
        store.add(&user, Turn::new(conv, Role::User, "hi"));
        store.record_turn(&user, "hi");
        store.reset_short_term(&user);
        assert!(store.recent(&user).is_empty());
        assert!(!store.should_reset(&user));
    }
}

//! Conversation, Turn (Message), and the two in-memory-only caches:
//! `ConversationState` and `ShortTermMemory`.

use crate::user::UserId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

pub type ConversationId = Uuid;
pub type TurnId = Uuid;

/// A persisted conversation. Created lazily by the engine when a turn
/// arrives without an id (§4.12 step 1); never deleted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub owner: UserId,
    pub title: Option<String>,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Auto-title is the first <=50 chars of the message that created the
    /// conversation (§4.12 step 1).
    pub fn auto_title(message: &str) -> String {
        message.chars().take(50).collect()
    }

    pub fn new(owner: UserId, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            title,
            starred: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// An append-only message. The engine writes both the user turn and the
/// assistant turn (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(conversation_id: ConversationId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// In-memory per-user conversation state (§3). Reset on >1h inactivity or a
/// small-talk-only turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    /// First substantive message, i.e. the user's primary concern.
    pub primary_concern: Option<String>,
    pub secondary_topics: Vec<String>,
    pub follow_up_count: u32,
    pub last_turn_at: Option<DateTime<Utc>>,
}

/// Window after which the engine treats a conversation as having gone idle
/// (§3, §7).
pub const SESSION_RESET_IDLE: Duration = Duration::hours(1);

impl ConversationState {
    /// `should_reset(user)` semantics from §4.3/§4.12 step 7: true if the
    /// sequence is empty (fresh) or the last turn is older than the idle
    /// window.
    pub fn is_idle(&self, now: DateTime<Utc>) -> bool {
        match self.last_turn_at {
            None => true,
            Some(last) => now - last > SESSION_RESET_IDLE,
        }
    }

    pub fn reset(&mut self) {
        *self = ConversationState::default();
    }

    /// FSM transition: `ACTIVE --new topic--> ACTIVE(secondary++, follow_up++)`.
    pub fn record_turn(&mut self, now: DateTime<Utc>, message: &str) {
        if self.primary_concern.is_none() {
            self.primary_concern = Some(first_concern_phrase(message));
        } else if let Some(topic) = disjoint_topic(message, self.primary_concern.as_deref()) {
            if !self.secondary_topics.contains(&topic) {
                self.secondary_topics.push(topic);
            }
            self.follow_up_count += 1;
        }
        self.last_turn_at = Some(now);
    }
}

/// First symptom-keyword match, else first 5 words (§4.12 step 9).
fn first_concern_phrase(message: &str) -> String {
    message
        .split_whitespace()
        .take(5)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A crude disjointness check: a topic is "new" if none of its words
/// overlap with the primary concern. This is intentionally simple — the
/// engine only uses it to decide whether to grow `secondary_topics`, not to
/// classify anything.
fn disjoint_topic(message: &str, primary: Option<&str>) -> Option<String> {
    let primary_lower = primary.unwrap_or_default().to_lowercase();
    let candidate: Vec<&str> = message.split_whitespace().take(5).collect();
    let overlaps = candidate
        .iter()
        .any(|w| primary_lower.contains(&w.to_lowercase()));
    if overlaps {
        None
    } else {
        Some(candidate.join(" "))
    }
}

/// A bounded ring of the last `N` turns for one user, kept in-process only
/// (§3, §4.3).
#[derive(Debug, Clone)]
pub struct ShortTermMemory {
    capacity: usize,
    turns: VecDeque<Turn>,
}

impl ShortTermMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            turns: VecDeque::with_capacity(capacity),
        }
    }

    /// FIFO trim to `capacity` entries.
    pub fn push(&mut self, turn: Turn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn recent(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn last_turn_at(&self) -> Option<DateTime<Utc>> {
        self.turns.back().map(|t| t.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_term_memory_trims_fifo() {
        let conv = Uuid::new_v4();
        let mut mem = ShortTermMemory::new(2);
        mem.push(Turn::new(conv, Role::User, "one"));
        mem.push(Turn::new(conv, Role::User, "two"));
        mem.push(Turn::new(conv, Role::User, "three"));
        let contents: Vec<_> = mem.recent().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);
    }

    #[test]
    fn conversation_state_idle_when_fresh() {
        let state = ConversationState::default();
        assert!(state.is_idle(Utc::now()));
    }

    #[test]
    fn conversation_state_idle_after_window() {
        let mut state = ConversationState::default();
        state.last_turn_at = Some(Utc::now() - Duration::hours(2));
        assert!(state.is_idle(Utc::now()));
        state.last_turn_at = Some(Utc::now() - Duration::minutes(10));
        assert!(!state.is_idle(Utc::now()));
    }
}

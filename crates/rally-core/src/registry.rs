use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::ReactionReason;

/// Points shown on the bot's reply to one message.
///
/// Only a rendering cache: the ledger is the source of truth and this is
/// lost on restart. `total_points` always equals the sum of the active
/// reasons' deltas.
#[derive(Debug, Clone, Default)]
pub struct MessageReplyState {
    total_points: i64,
    reasons: Vec<ReactionReason>,
    pub reply_id: Option<String>,
}

impl MessageReplyState {
    /// Activate a reason. Returns false if it was already active.
    pub fn insert(&mut self, reason: &ReactionReason) -> bool {
        if self.reasons.iter().any(|r| r.emoji == reason.emoji) {
            return false;
        }
        self.total_points += reason.delta;
        self.reasons.push(reason.clone());
        true
    }

    /// Deactivate a reason. Returns false if it was not active.
    pub fn remove(&mut self, emoji: &str) -> bool {
        match self.reasons.iter().position(|r| r.emoji == emoji) {
            Some(idx) => {
                let reason = self.reasons.remove(idx);
                self.total_points -= reason.delta;
                true
            }
            None => false,
        }
    }

    pub fn total_points(&self) -> i64 {
        self.total_points
    }

    pub fn reasons(&self) -> &[ReactionReason] {
        &self.reasons
    }

    pub fn is_idle(&self) -> bool {
        self.reasons.is_empty()
    }
}

pub type SharedReplyState = Arc<tokio::sync::Mutex<MessageReplyState>>;

struct Entry {
    state: SharedReplyState,
    touched: Instant,
}

/// Bounded map from origin message id to its reply state.
///
/// Entries idle for longer than `ttl` are dropped on the next access and
/// the least recently touched entry is dropped when `capacity` is reached.
/// Each entry is behind its own async lock so reactions on one message
/// are applied one at a time while other messages proceed.
pub struct ReplyRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl ReplyRegistry {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// State for `message_id`, created empty on first use.
    pub fn entry(&self, message_id: &str) -> SharedReplyState {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let ttl = self.ttl;
        let before = entries.len();
        entries.retain(|_, e| now.duration_since(e.touched) < ttl);
        if entries.len() < before {
            debug!("Reply registry evicted {} idle entries", before - entries.len());
        }

        if let Some(entry) = entries.get_mut(message_id) {
            entry.touched = now;
            return entry.state.clone();
        }

        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.touched)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        let state = SharedReplyState::default();
        entries.insert(
            message_id.to_string(),
            Entry {
                state: state.clone(),
                touched: now,
            },
        );
        state
    }

    pub fn forget(&self, message_id: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(message_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(message_id)
    }
}

use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    Add,
    Remove,
}

/// A reaction notification relayed by the chat-gateway bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub emoji: String,
    /// The user who added or removed the reaction.
    pub user_id: String,
    pub action: ReactionAction,
    /// The message the reaction was placed on.
    pub message: ChatMessage,
}

impl ReactionEvent {
    pub fn is_add(&self) -> bool {
        self.action == ReactionAction::Add
    }
}

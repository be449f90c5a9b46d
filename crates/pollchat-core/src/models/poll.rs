//! Poll model
//!
//! Polls are owned by the voting subsystem; conversations only reference them.

use serde::{Deserialize, Serialize};

use super::conversation::ConversationId;
use crate::util::now_millis;

string_id!(
    /// Identifier of a poll
    PollId
);

/// A poll created from a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    /// Conversation that produced this poll
    pub conversation_id: ConversationId,
    pub title: String,
    pub owner_id: String,
    /// Unix ms
    pub created_at: i64,
}

impl Poll {
    #[must_use]
    pub fn new(
        conversation_id: ConversationId,
        owner_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: PollId::new(),
            conversation_id,
            title: title.into(),
            owner_id: owner_id.into(),
            created_at: now_millis(),
        }
    }
}

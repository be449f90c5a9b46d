//! Conversation model

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::poll::PollId;
use crate::util::now_millis;

/// Legacy metadata key that used to carry the remote id of a synced record.
pub const BACK_REFERENCE_METADATA_KEY: &str = "backReferenceId";

/// Legacy metadata key that used to carry the linked poll id.
pub const POLL_METADATA_KEY: &str = "pollId";

string_id!(
    /// Identifier of a conversation, unique within its source store
    ConversationId
);

/// Lifecycle status of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Still being worked on
    #[default]
    Active,
    /// Finished (usually a poll was produced)
    Completed,
    /// Hidden from the default view
    Archived,
}

impl ConversationStatus {
    /// Stable lowercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    /// Parse a stored status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// A conversation as stored in either the local cache or the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Identifier within the source store
    pub id: ConversationId,
    /// Display title
    pub title: String,
    /// Owning user; empty means unknown
    pub owner_id: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: ConversationStatus,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// First user message, used as a preview
    #[serde(default)]
    pub first_message: String,
    /// Number of messages in the conversation
    #[serde(default)]
    pub message_count: u32,
    /// Pinned by the user
    #[serde(default)]
    pub is_favorite: bool,
    /// Position among favorites, 1-based
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_rank: Option<u32>,
    /// User tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Poll produced from this conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_poll_id: Option<PollId>,
    /// Remote id this local record was accepted under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_reference_id: Option<ConversationId>,
    /// Open metadata, opaque except for the legacy keys above
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Conversation {
    /// Create a new active conversation for `owner_id`
    #[must_use]
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: ConversationId::new(),
            title: title.into(),
            owner_id: owner_id.into(),
            status: ConversationStatus::Active,
            created_at: now,
            updated_at: now,
            first_message: String::new(),
            message_count: 0,
            is_favorite: false,
            favorite_rank: None,
            tags: BTreeSet::new(),
            linked_poll_id: None,
            back_reference_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Whether this record belongs to `owner_id`.
    ///
    /// A record without an owner never matches.
    #[must_use]
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        !self.owner_id.is_empty() && self.owner_id == owner_id
    }

    /// Remote id this record was synchronized into, if any.
    ///
    /// Falls back to the legacy `backReferenceId` metadata key.
    #[must_use]
    pub fn back_reference(&self) -> Option<&str> {
        self.back_reference_id
            .as_ref()
            .map(ConversationId::as_str)
            .or_else(|| metadata_str(&self.metadata, BACK_REFERENCE_METADATA_KEY))
    }

    /// Linked poll id, if any.
    ///
    /// Falls back to the legacy `pollId` metadata key.
    #[must_use]
    pub fn linked_poll(&self) -> Option<&str> {
        self.linked_poll_id
            .as_ref()
            .map(PollId::as_str)
            .or_else(|| metadata_str(&self.metadata, POLL_METADATA_KEY))
    }

    /// Mark the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }
}

fn metadata_str<'a>(metadata: &'a BTreeMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversation_new() {
        let conversation = Conversation::new("owner-1", "Lunch plans");
        assert_eq!(conversation.title, "Lunch plans");
        assert_eq!(conversation.status, ConversationStatus::Active);
        assert!(!conversation.is_favorite);
        assert!(conversation.favorite_rank.is_none());
        assert_eq!(conversation.created_at, conversation.updated_at);
    }

    #[test]
    fn test_missing_owner_never_matches() {
        let conversation = Conversation::new("", "Orphan");
        assert!(!conversation.is_owned_by(""));
        assert!(!conversation.is_owned_by("owner-1"));
    }

    #[test]
    fn test_back_reference_prefers_field_over_metadata() {
        let mut conversation = Conversation::new("owner-1", "Synced");
        conversation
            .metadata
            .insert(BACK_REFERENCE_METADATA_KEY.to_string(), json!("uuid-old"));
        assert_eq!(conversation.back_reference(), Some("uuid-old"));

        conversation.back_reference_id = Some("uuid-456".into());
        assert_eq!(conversation.back_reference(), Some("uuid-456"));
    }

    #[test]
    fn test_linked_poll_reads_legacy_metadata() {
        let mut conversation = Conversation::new("owner-1", "Poll");
        assert!(conversation.linked_poll().is_none());

        conversation
            .metadata
            .insert(POLL_METADATA_KEY.to_string(), json!("poll-9"));
        assert_eq!(conversation.linked_poll(), Some("poll-9"));

        conversation
            .metadata
            .insert(POLL_METADATA_KEY.to_string(), json!(42));
        assert!(conversation.linked_poll().is_none());
    }

    #[test]
    fn test_status_names() {
        for status in [
            ConversationStatus::Active,
            ConversationStatus::Completed,
            ConversationStatus::Archived,
        ] {
            assert_eq!(ConversationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ConversationStatus::parse("deleted"), None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut conversation = Conversation::new("owner-1", "Trip");
        conversation.is_favorite = true;
        conversation.favorite_rank = Some(2);

        let value = serde_json::to_value(&conversation).unwrap();
        assert_eq!(value["ownerId"], "owner-1");
        assert_eq!(value["isFavorite"], true);
        assert_eq!(value["favoriteRank"], 2);
        assert_eq!(value["status"], "active");
        assert!(value.get("backReferenceId").is_none());
    }
}

//! Identity resolution between local and remote conversation records
//!
//! A conversation created offline gets a temporary local id. Once the remote
//! store accepts it, it lives there under a new id and the local copy records
//! that id as its back-reference. Two records are the same entity when their
//! ids match or when either one back-references the other.

use crate::models::Conversation;

/// Whether `a` and `b` represent the same logical conversation.
#[must_use]
pub fn same_entity(a: &Conversation, b: &Conversation) -> bool {
    if a.id == b.id {
        return true;
    }

    a.back_reference() == Some(b.id.as_str()) || b.back_reference() == Some(a.id.as_str())
}

/// Canonical id of a record: the remote id it was synced into, or its own id.
#[must_use]
pub fn canonical_id(conversation: &Conversation) -> &str {
    conversation
        .back_reference()
        .unwrap_or_else(|| conversation.id.as_str())
}

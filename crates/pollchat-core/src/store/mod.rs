//! Storage contracts consumed by the core
//!
//! The local cache and the remote store both implement [`ConversationStore`];
//! the voting subsystem implements [`PollStore`]. Deletes of absent rows are
//! no-ops so that a rollback followed by a retry is well defined.

mod memory;

use std::sync::Arc;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{Conversation, ConversationId, Message, Poll, PollId};

/// Read/write contract of a conversation store (async)
#[allow(async_fn_in_trait)]
pub trait ConversationStore {
    /// Get a conversation by id
    async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>>;

    /// List every conversation owned by `owner_id`
    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>>;

    /// Remove a conversation record
    async fn delete_conversation(&self, id: &ConversationId) -> Result<()>;

    /// Get the messages of a conversation, oldest first
    async fn get_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>>;

    /// Remove every message of a conversation
    async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<()>;

    /// Replace an existing conversation record
    async fn update_conversation(&self, conversation: &Conversation) -> Result<Conversation>;

    /// Insert (or overwrite) a conversation record
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Insert messages, skipping ids that already exist
    async fn insert_messages(&self, messages: &[Message]) -> Result<()>;
}

/// Read/write contract of the poll store (async)
#[allow(async_fn_in_trait)]
pub trait PollStore {
    /// Find the poll created from a conversation
    async fn find_poll_by_conversation_id(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Poll>>;

    /// Get a poll by id
    async fn get_poll(&self, id: &PollId) -> Result<Option<Poll>>;

    /// Remove a poll
    async fn delete_poll(&self, id: &PollId) -> Result<()>;

    /// Insert (or overwrite) a poll
    async fn insert_poll(&self, poll: &Poll) -> Result<()>;
}

impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        (**self).get_conversation(id).await
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        (**self).list_conversations(owner_id).await
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<()> {
        (**self).delete_conversation(id).await
    }

    async fn get_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        (**self).get_messages(conversation_id).await
    }

    async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<()> {
        (**self).delete_messages(conversation_id).await
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        (**self).update_conversation(conversation).await
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        (**self).insert_conversation(conversation).await
    }

    async fn insert_messages(&self, messages: &[Message]) -> Result<()> {
        (**self).insert_messages(messages).await
    }
}

impl<T: PollStore + ?Sized> PollStore for Arc<T> {
    async fn find_poll_by_conversation_id(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Poll>> {
        (**self).find_poll_by_conversation_id(conversation_id).await
    }

    async fn get_poll(&self, id: &PollId) -> Result<Option<Poll>> {
        (**self).get_poll(id).await
    }

    async fn delete_poll(&self, id: &PollId) -> Result<()> {
        (**self).delete_poll(id).await
    }

    async fn insert_poll(&self, poll: &Poll) -> Result<()> {
        (**self).insert_poll(poll).await
    }
}

impl<T: ConversationStore + ?Sized> ConversationStore for &T {
    async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        (**self).get_conversation(id).await
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        (**self).list_conversations(owner_id).await
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<()> {
        (**self).delete_conversation(id).await
    }

    async fn get_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        (**self).get_messages(conversation_id).await
    }

    async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<()> {
        (**self).delete_messages(conversation_id).await
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        (**self).update_conversation(conversation).await
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        (**self).insert_conversation(conversation).await
    }

    async fn insert_messages(&self, messages: &[Message]) -> Result<()> {
        (**self).insert_messages(messages).await
    }
}

impl<T: PollStore + ?Sized> PollStore for &T {
    async fn find_poll_by_conversation_id(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Poll>> {
        (**self).find_poll_by_conversation_id(conversation_id).await
    }

    async fn get_poll(&self, id: &PollId) -> Result<Option<Poll>> {
        (**self).get_poll(id).await
    }

    async fn delete_poll(&self, id: &PollId) -> Result<()> {
        (**self).delete_poll(id).await
    }

    async fn insert_poll(&self, poll: &Poll) -> Result<()> {
        (**self).insert_poll(poll).await
    }
}

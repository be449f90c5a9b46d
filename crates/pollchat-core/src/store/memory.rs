//! In-memory store
//!
//! Implements both storage contracts over plain maps. Used by tests and by
//! hosts that keep an in-process cache.

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use super::{ConversationStore, PollStore};
use crate::error::{Error, Result};
use crate::models::{Conversation, ConversationId, Message, Poll, PollId};

#[derive(Debug, Default)]
struct MemoryState {
    conversations: BTreeMap<ConversationId, Conversation>,
    messages: Vec<Message>,
    polls: BTreeMap<PollId, Poll>,
}

/// Thread-safe in-memory implementation of [`ConversationStore`] and [`PollStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with conversations, messages and polls
    pub fn seeded(
        conversations: impl IntoIterator<Item = Conversation>,
        messages: impl IntoIterator<Item = Message>,
        polls: impl IntoIterator<Item = Poll>,
    ) -> Self {
        let state = MemoryState {
            conversations: conversations
                .into_iter()
                .map(|conversation| (conversation.id.clone(), conversation))
                .collect(),
            messages: messages.into_iter().collect(),
            polls: polls.into_iter().map(|poll| (poll.id.clone(), poll)).collect(),
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Number of stored conversations
    pub async fn conversation_count(&self) -> usize {
        self.state.lock().await.conversations.len()
    }

    /// Number of stored messages across all conversations
    pub async fn message_count(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    /// Number of stored polls
    pub async fn poll_count(&self) -> usize {
        self.state.lock().await.polls.len()
    }
}

impl ConversationStore for MemoryStore {
    async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        Ok(self.state.lock().await.conversations.get(id).cloned())
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        let state = self.state.lock().await;
        let mut conversations = state
            .conversations
            .values()
            .filter(|conversation| conversation.is_owned_by(owner_id))
            .cloned()
            .collect::<Vec<_>>();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<()> {
        self.state.lock().await.conversations.remove(id);
        Ok(())
    }

    async fn get_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let state = self.state.lock().await;
        let mut messages = state
            .messages
            .iter()
            .filter(|message| &message.conversation_id == conversation_id)
            .cloned()
            .collect::<Vec<_>>();
        messages.sort_by_key(|message| message.timestamp);
        Ok(messages)
    }

    async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<()> {
        self.state
            .lock()
            .await
            .messages
            .retain(|message| &message.conversation_id != conversation_id);
        Ok(())
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        let mut state = self.state.lock().await;
        let Some(existing) = state.conversations.get_mut(&conversation.id) else {
            return Err(Error::NotFound(conversation.id.to_string()));
        };
        existing.clone_from(conversation);
        Ok(conversation.clone())
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.state
            .lock()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn insert_messages(&self, messages: &[Message]) -> Result<()> {
        let mut state = self.state.lock().await;
        for message in messages {
            if !state.messages.iter().any(|existing| existing.id == message.id) {
                state.messages.push(message.clone());
            }
        }
        Ok(())
    }
}

impl PollStore for MemoryStore {
    async fn find_poll_by_conversation_id(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Poll>> {
        Ok(self
            .state
            .lock()
            .await
            .polls
            .values()
            .find(|poll| &poll.conversation_id == conversation_id)
            .cloned())
    }

    async fn get_poll(&self, id: &PollId) -> Result<Option<Poll>> {
        Ok(self.state.lock().await.polls.get(id).cloned())
    }

    async fn delete_poll(&self, id: &PollId) -> Result<()> {
        self.state.lock().await.polls.remove(id);
        Ok(())
    }

    async fn insert_poll(&self, poll: &Poll) -> Result<()> {
        self.state
            .lock()
            .await
            .polls
            .insert(poll.id.clone(), poll.clone());
        Ok(())
    }
}

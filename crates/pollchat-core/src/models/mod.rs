//! Data models for Pollchat

#[macro_use]
mod id;
mod conversation;
mod message;
mod poll;

pub use conversation::{Conversation, ConversationId, ConversationStatus};
pub use message::{Message, MessageId, MessageRole};
pub use poll::{Poll, PollId};

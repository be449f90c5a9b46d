//! pollchat-core - Core library for Pollchat
//!
//! Keeps one logical list of conversations consistent across a device-local
//! cache and a remote authoritative store: merging both sources without
//! duplicates, ordering the result favorites-first, and deleting a
//! conversation together with its messages and linked poll as one unit.

pub mod cascade;
pub mod db;
pub mod error;
pub mod identity;
pub mod merge;
pub mod models;
pub mod ranking;
pub mod services;
pub mod sort;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use models::{Conversation, ConversationId, Message, MessageId, Poll, PollId};

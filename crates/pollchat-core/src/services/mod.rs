//! Services shared by every host

mod conversations;

pub use conversations::ConversationService;

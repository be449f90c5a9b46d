use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pollchat_core::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Conversation ID cannot be empty")]
    EmptyConversationId,
    #[error("No owner configured. Pass --owner, set POLLCHAT_OWNER, or add ownerId to {0}")]
    MissingOwner(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Could not resolve the {0} directory for this platform")]
    NoPlatformDir(&'static str),
    #[error("Delete failed: {0}")]
    DeleteFailed(String),
}

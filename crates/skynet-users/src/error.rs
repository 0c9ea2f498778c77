use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found: {0}")]
    NotFound(String),

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("conversation {conversation_id} is bound to a different personality")]
    PersonalityMismatch { conversation_id: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;

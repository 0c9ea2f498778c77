use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersonalityError {
    #[error("personality not found: {0}")]
    NotFound(String),

    #[error("a personality named {0:?} already exists for this user")]
    DuplicateName(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, PersonalityError>;

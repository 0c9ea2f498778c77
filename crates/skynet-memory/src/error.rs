use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("memory not found: {0}")]
    NotFound(String),

    #[error("a supersedence edge from {0} would create a cycle")]
    CyclicSupersedence(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

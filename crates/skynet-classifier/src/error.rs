use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("judge error: {0}")]
    Judge(String),
    #[error("judge timed out")]
    JudgeTimeout,
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("llm inference failed: {0}")]
    Llm(String),

    #[error("llm response did not match the expected structured shape: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, DetectorError>;

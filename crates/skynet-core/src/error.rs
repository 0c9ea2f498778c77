use thiserror::Error;

/// Error taxonomy shared by every crate. The orchestrator is the single
/// funnel: no stage raises past it (see §7 of the spec this implements).
#[derive(Debug, Error)]
pub enum SkynetError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("dependency timed out after {ms}ms: {what}")]
    DependencyTimeout { what: String, ms: u64 },

    #[error("background task failure: {0}")]
    BackgroundFailure(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SkynetError {
    /// Short error code surfaced in `ChatEvent::Error` / HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SkynetError::Validation(_) => "VALIDATION_ERROR",
            SkynetError::AuthFailed(_) => "AUTH_FAILED",
            SkynetError::Config(_) => "CONFIG_ERROR",
            SkynetError::Database(_) => "DATABASE_ERROR",
            SkynetError::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            SkynetError::DependencyTimeout { .. } => "DEPENDENCY_TIMEOUT",
            SkynetError::BackgroundFailure(_) => "BACKGROUND_FAILURE",
            SkynetError::Serialization(_) => "SERIALIZATION_ERROR",
            SkynetError::Io(_) => "IO_ERROR",
            SkynetError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SkynetError>;

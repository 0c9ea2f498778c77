use skynet_protocol::ChatEvent;

/// Single funnel for every stage the pipeline touches (spec §7: "the
/// orchestrator is the single funnel; no stage raises past it"). Note that
/// `SessionRefusal` and `AgeGate` are deliberately absent here — spec §7
/// classes them as non-errors, handled inline in the pipeline as direct
/// `SessionAction::Refuse` / `SessionAction::AgeVerify` branches that emit
/// their own `ChatEvent` variants without ever becoming an `OrchestratorError`.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error(transparent)]
    User(#[from] skynet_users::UserError),

    #[error(transparent)]
    Session(#[from] skynet_sessions::SessionError),

    #[error(transparent)]
    Personality(#[from] skynet_personality::PersonalityError),

    #[error(transparent)]
    Memory(#[from] skynet_memory::MemoryError),

    #[error(transparent)]
    Provider(#[from] skynet_agent::ProviderError),

    #[error("dependency timed out after {ms}ms: {what}")]
    DependencyTimeout { what: String, ms: u64 },

    #[error("background task failure: {0}")]
    BackgroundFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "VALIDATION_ERROR",
            OrchestratorError::AuthFailed(_) => "AUTH_FAILED",
            OrchestratorError::User(_) => "USER_ERROR",
            OrchestratorError::Session(_) => "SESSION_ERROR",
            OrchestratorError::Personality(_) => "PERSONALITY_ERROR",
            OrchestratorError::Memory(_) => "MEMORY_ERROR",
            OrchestratorError::Provider(_) => "LLM_PROVIDER_ERROR",
            OrchestratorError::DependencyTimeout { .. } => "DEPENDENCY_TIMEOUT",
            OrchestratorError::BackgroundFailure(_) => "BACKGROUND_FAILURE",
            OrchestratorError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Render as the wire-level `error` event (spec §6). Always audited by
    /// the caller alongside this.
    pub fn to_event(&self) -> ChatEvent {
        ChatEvent::Error {
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

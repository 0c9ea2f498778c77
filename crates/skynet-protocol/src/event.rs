use serde::{Deserialize, Serialize};

/// One event in the streamed sequence returned by `POST /chat` (spec §6).
/// Wire shape: `{ "type": "chunk", "text": "..." }` etc — tagged enum,
/// same framing idiom the teacher uses for `skynet-agent::stream::StreamEvent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// One per pipeline stage: classification, routing, memory retrieval,
    /// personality, emotion, prompt assembly, generation start.
    Thinking { step: String, data: serde_json::Value },
    /// Incremental assistant text.
    Chunk { text: String },
    AgeVerificationRequired {
        conversation_id: String,
        route: String,
        api_endpoint: String,
        instructions: String,
    },
    Refusal { text: String, reason: String },
    Done { conversation_id: String, duration_ms: u64 },
    Error { message: String },
}

impl ChatEvent {
    pub fn thinking(step: impl Into<String>, data: impl Serialize) -> Self {
        ChatEvent::Thinking {
            step: step.into(),
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }
}

use serde::{Deserialize, Serialize};

/// `POST /chat` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
    pub personality_name: Option<String>,
}

/// `POST /age-verify` request/response (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct AgeVerifyRequest {
    pub conversation_id: String,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgeVerifyResponse {
    pub success: bool,
    pub age_verified: bool,
}

/// Personality endpoints (user-scoped).
#[derive(Debug, Clone, Serialize)]
pub struct PersonalityView {
    pub name: String,
    pub archetype: String,
    pub traits: TraitsView,
    pub behaviors: BehaviorsView,
    pub backstory: Option<String>,
    pub speaking_style: Option<String>,
    pub custom_instructions: Option<String>,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitsView {
    pub humor: f64,
    pub formality: f64,
    pub enthusiasm: f64,
    pub empathy: f64,
    pub directness: f64,
    pub curiosity: f64,
    pub supportiveness: f64,
    pub playfulness: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorsView {
    pub asks_questions: bool,
    pub uses_examples: bool,
    pub shares_opinions: bool,
    pub challenges_user: bool,
    pub celebrates_wins: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePersonalityRequest {
    pub name: String,
    pub archetype: String,
    #[serde(default)]
    pub traits: Option<TraitsView>,
    #[serde(default)]
    pub behaviors: Option<BehaviorsView>,
    pub backstory: Option<String>,
    pub speaking_style: Option<String>,
    pub custom_instructions: Option<String>,
}

/// `merge` keeps unspecified fields as-is; `replace` requires every field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    Merge,
    Replace,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePersonalityRequest {
    pub mode: UpdateMode,
    pub archetype: Option<String>,
    pub traits: Option<TraitsView>,
    pub behaviors: Option<BehaviorsView>,
    pub backstory: Option<String>,
    pub speaking_style: Option<String>,
    pub custom_instructions: Option<String>,
}

/// `GET /session` — read-only session view (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub conversation_id: String,
    pub current_route: String,
    pub route_lock_counter: u32,
    pub age_verified: bool,
}

/// `POST /classify-debug` — classify without generation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyDebugRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyDebugResponse {
    pub label: String,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub route: String,
}

/// `GET /audit/stats` — aggregate counts by label/route/action.
#[derive(Debug, Clone, Serialize)]
pub struct AuditStatsResponse {
    pub by_label: Vec<CountEntry>,
    pub by_route: Vec<CountEntry>,
    pub by_action: Vec<CountEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountEntry {
    pub key: String,
    pub count: u64,
}

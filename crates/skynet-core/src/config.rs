use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18080;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Top-level config (skynet.toml + SKYNET_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkynetConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub short_term: ShortTermConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub personality: PersonalityConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl Default for SkynetConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            embedding: EmbeddingConfig::default(),
            classifier: ClassifierConfig::default(),
            session: SessionConfig::default(),
            detector: DetectorConfig::default(),
            memory: MemoryConfig::default(),
            short_term: ShortTermConfig::default(),
            background: BackgroundConfig::default(),
            personality: PersonalityConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

/// Request-scoped deadlines (spec §5 Concurrency & Resource Model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Overall budget for one `stream_chat` call, start to `Done`.
    #[serde(default = "default_overall_timeout_secs")]
    pub overall_timeout_secs: u64,
    /// Per-detector budget in the step 6 fan-out; a detector that misses
    /// this degrades to `None` rather than failing the turn.
    #[serde(default = "default_detector_timeout_secs")]
    pub detector_timeout_secs: u64,
    /// Idle gap between streamed chunks before the LLM stream is
    /// considered stalled and torn down.
    #[serde(default = "default_llm_idle_timeout_secs")]
    pub llm_idle_timeout_secs: u64,
    /// Model name used for detector/judge structured-output calls — these
    /// are small, cheap classification prompts, deliberately independent
    /// of whatever model the route's generation call uses.
    #[serde(default = "default_detector_model")]
    pub detector_model: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            overall_timeout_secs: default_overall_timeout_secs(),
            detector_timeout_secs: default_detector_timeout_secs(),
            llm_idle_timeout_secs: default_llm_idle_timeout_secs(),
            detector_model: default_detector_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Non-production only: lets a header substitute the user id directly
    /// instead of resolving it from a bearer token (spec §6 Authentication).
    #[serde(default)]
    pub debug_user_header: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            auth: AuthConfig::default(),
            debug_user_header: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub require_token: bool,
    pub token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_token: true,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// `embedding.dimension` — dimensionality of the embedder output, fixed per
/// deployment (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: default_embedding_dimension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub llm_judge: LlmJudgeConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            llm_judge: LlmJudgeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmJudgeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_judge_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for LlmJudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: default_judge_confidence_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_route_lock_messages")]
    pub route_lock_messages: u32,
    #[serde(default = "default_timeout_hours")]
    pub timeout_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            route_lock_messages: default_route_lock_messages(),
            timeout_hours: default_timeout_hours(),
        }
    }
}

/// Per-detector method override, spec §6 `detector.*.method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMethod {
    Llm,
    Pattern,
    Hybrid,
}

impl Default for DetectorMethod {
    fn default() -> Self {
        DetectorMethod::Hybrid
    }
}

/// Open Question resolution: hybrid confidence thresholds differ per
/// detector in the source (0.5/0.6/0.7); exposed here per-detector with the
/// documented defaults (see SPEC_FULL.md §9 / DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub emotion: DetectorEntryConfig,
    #[serde(default)]
    pub personality: DetectorEntryConfig,
    #[serde(default)]
    pub preference: DetectorEntryConfig,
    #[serde(default = "goal_detector_defaults")]
    pub goal: DetectorEntryConfig,
    #[serde(default)]
    pub contradiction: DetectorEntryConfig,
    #[serde(default)]
    pub memory_extraction: DetectorEntryConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            emotion: DetectorEntryConfig {
                method: DetectorMethod::Hybrid,
                confidence_threshold: 0.7,
            },
            personality: DetectorEntryConfig::default(),
            preference: DetectorEntryConfig::default(),
            goal: goal_detector_defaults(),
            contradiction: DetectorEntryConfig::default(),
            memory_extraction: DetectorEntryConfig::default(),
        }
    }
}

fn goal_detector_defaults() -> DetectorEntryConfig {
    DetectorEntryConfig {
        method: DetectorMethod::Hybrid,
        confidence_threshold: 0.5,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorEntryConfig {
    #[serde(default)]
    pub method: DetectorMethod,
    #[serde(default = "default_detector_confidence")]
    pub confidence_threshold: f64,
}

impl Default for DetectorEntryConfig {
    fn default() -> Self {
        Self {
            method: DetectorMethod::Hybrid,
            confidence_threshold: default_detector_confidence(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub retrieval: MemoryRetrievalConfig,
    #[serde(default)]
    pub contradiction: MemoryContradictionConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            retrieval: MemoryRetrievalConfig::default(),
            contradiction: MemoryContradictionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f64,
    /// α·similarity + β·importance·temporal_decay blend weights (spec §4.5).
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_beta")]
    pub beta: f64,
}

impl Default for MemoryRetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_floor: default_similarity_floor(),
            alpha: default_alpha(),
            beta: default_beta(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryContradictionConfig {
    #[serde(default = "default_contradiction_similarity")]
    pub similarity_threshold: f64,
    #[serde(default = "default_contradiction_confidence")]
    pub confidence_threshold: f64,
}

impl Default for MemoryContradictionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_contradiction_similarity(),
            confidence_threshold: default_contradiction_confidence(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for ShortTermConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    #[serde(default = "default_memory_extraction_min_turns")]
    pub memory_extraction_min_turns: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_shutdown_drain_secs")]
    pub shutdown_drain_secs: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            memory_extraction_min_turns: default_memory_extraction_min_turns(),
            queue_capacity: default_queue_capacity(),
            shutdown_drain_secs: default_shutdown_drain_secs(),
        }
    }
}

/// Open Question resolution: relationship-depth milestones are a product
/// choice, exposed as config (see SPEC_FULL.md §9 / DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalityConfig {
    #[serde(default = "default_relationship_milestones")]
    pub relationship_milestones: Vec<u32>,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            relationship_milestones: default_relationship_milestones(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.skynet/skynet.db", home)
}
fn default_embedding_dimension() -> usize {
    256
}
fn default_judge_confidence_threshold() -> f64 {
    0.7
}
fn default_route_lock_messages() -> u32 {
    5
}
fn default_timeout_hours() -> i64 {
    24
}
fn default_detector_confidence() -> f64 {
    0.6
}
fn default_top_k() -> usize {
    5
}
fn default_similarity_floor() -> f64 {
    0.25
}
fn default_alpha() -> f64 {
    0.7
}
fn default_beta() -> f64 {
    0.3
}
fn default_contradiction_similarity() -> f64 {
    0.40
}
fn default_contradiction_confidence() -> f64 {
    0.70
}
fn default_max_messages() -> usize {
    20
}
fn default_memory_extraction_min_turns() -> usize {
    3
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_shutdown_drain_secs() -> u64 {
    10
}
fn default_relationship_milestones() -> Vec<u32> {
    vec![10, 50, 100, 250, 500, 1000]
}
fn default_overall_timeout_secs() -> u64 {
    60
}
fn default_detector_timeout_secs() -> u64 {
    5
}
fn default_llm_idle_timeout_secs() -> u64 {
    30
}
fn default_detector_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

impl SkynetConfig {
    /// Load config from a TOML file with SKYNET_* env var overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SkynetConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SKYNET_").split("_"))
            .extract()
            .map_err(|e| crate::error::SkynetError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.skynet/skynet.toml", home)
}

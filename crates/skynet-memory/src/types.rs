use serde::{Deserialize, Serialize};
use skynet_detectors::MemoryCategoryHint;

/// The nine memory categories (spec §3 Memory). Authoritative storage
/// enum; `skynet_detectors::MemoryCategoryHint` is the detector-side
/// counterpart, mapped in at the write boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    PersonalFact,
    Preference,
    Goal,
    Event,
    Relationship,
    Challenge,
    Achievement,
    Knowledge,
    Instruction,
}

impl From<MemoryCategoryHint> for MemoryCategory {
    fn from(hint: MemoryCategoryHint) -> Self {
        match hint {
            MemoryCategoryHint::PersonalFact => Self::PersonalFact,
            MemoryCategoryHint::Preference => Self::Preference,
            MemoryCategoryHint::Goal => Self::Goal,
            MemoryCategoryHint::Event => Self::Event,
            MemoryCategoryHint::Relationship => Self::Relationship,
            MemoryCategoryHint::Challenge => Self::Challenge,
            MemoryCategoryHint::Achievement => Self::Achievement,
            MemoryCategoryHint::Knowledge => Self::Knowledge,
            MemoryCategoryHint::Instruction => Self::Instruction,
        }
    }
}

impl MemoryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalFact => "personal_fact",
            Self::Preference => "preference",
            Self::Goal => "goal",
            Self::Event => "event",
            Self::Relationship => "relationship",
            Self::Challenge => "challenge",
            Self::Achievement => "achievement",
            Self::Knowledge => "knowledge",
            Self::Instruction => "instruction",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "personal_fact" => Self::PersonalFact,
            "preference" => Self::Preference,
            "goal" => Self::Goal,
            "event" => Self::Event,
            "relationship" => Self::Relationship,
            "challenge" => Self::Challenge,
            "achievement" => Self::Achievement,
            "knowledge" => Self::Knowledge,
            "instruction" => Self::Instruction,
            _ => return None,
        })
    }
}

/// Six sub-scores in [0,1] blended by fixed weights summing to 1
/// (spec §4.5 Importance scoring).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportanceSubscores {
    pub emotional_significance: f64,
    pub explicit_mention: f64,
    pub frequency_referenced: f64,
    pub recency: f64,
    pub specificity: f64,
    pub personal_relevance: f64,
}

impl ImportanceSubscores {
    pub const WEIGHT_EMOTIONAL: f64 = 0.30;
    pub const WEIGHT_EXPLICIT: f64 = 0.25;
    pub const WEIGHT_FREQUENCY: f64 = 0.15;
    pub const WEIGHT_RECENCY: f64 = 0.10;
    pub const WEIGHT_SPECIFICITY: f64 = 0.10;
    pub const WEIGHT_PERSONAL: f64 = 0.10;

    pub fn blend(&self) -> f64 {
        (self.emotional_significance * Self::WEIGHT_EMOTIONAL
            + self.explicit_mention * Self::WEIGHT_EXPLICIT
            + self.frequency_referenced * Self::WEIGHT_FREQUENCY
            + self.recency * Self::WEIGHT_RECENCY
            + self.specificity * Self::WEIGHT_SPECIFICITY
            + self.personal_relevance * Self::WEIGHT_PERSONAL)
            .clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelatedEntities {
    pub people: Vec<String>,
    pub places: Vec<String>,
    pub topics: Vec<String>,
    pub dates: Vec<String>,
}

/// A single long-term memory row (spec §3 Memory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub user_id: String,
    pub personality_id: String,
    pub conversation_id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub category: MemoryCategory,
    pub importance_subscores: ImportanceSubscores,
    pub importance: f64,
    pub created_at: String,
    pub updated_at: String,
    pub last_accessed: String,
    pub access_count: u32,
    pub decay_factor: f64,
    pub is_active: bool,
    pub superseded_by: Option<String>,
    pub consolidated_from: Vec<String>,
    pub related_entities: RelatedEntities,
    /// Cross-personality visibility (spec §3 invariant: retrieval filters
    /// `is_active ∧ user=U ∧ (personality=P ∨ is_shared)`).
    pub is_shared: bool,
}

/// One message in the short-term rolling window (C3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferedMessage {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// A persisted personal goal (spec §3 Goal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: String,
    pub confidence: f64,
    pub commitment_level: f64,
    pub target_timeframe: Option<String>,
    pub target_date: Option<String>,
    pub motivation: Option<String>,
    pub created_at: String,
    pub is_active: bool,
}

/// Coarse affect bucket (spec §3 EmotionRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionIntensity {
    Low,
    Med,
    High,
}

impl EmotionIntensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Med,
        }
    }
}

/// A detected-emotion log entry (spec §3 EmotionRecord). `snippet` is
/// truncated to 100 chars at write time (invariant I4) — this is the only
/// retained fragment of the originating message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub emotion: String,
    pub confidence: f64,
    pub intensity: EmotionIntensity,
    pub indicators: Vec<String>,
    pub snippet: String,
    pub detected_at: String,
}

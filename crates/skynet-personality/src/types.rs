use serde::{Deserialize, Serialize};

/// The nine named archetypes, or a custom one carrying its own label
/// (spec §3 Personality).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Archetype {
    WiseMentor,
    SupportiveFriend,
    Girlfriend,
    Boyfriend,
    LifeCoach,
    PlayfulCompanion,
    IntellectualSparringPartner,
    Caretaker,
    Adventurer,
    Custom(String),
}

impl Archetype {
    pub fn as_str(&self) -> &str {
        match self {
            Self::WiseMentor => "wise_mentor",
            Self::SupportiveFriend => "supportive_friend",
            Self::Girlfriend => "girlfriend",
            Self::Boyfriend => "boyfriend",
            Self::LifeCoach => "life_coach",
            Self::PlayfulCompanion => "playful_companion",
            Self::IntellectualSparringPartner => "intellectual_sparring_partner",
            Self::Caretaker => "caretaker",
            Self::Adventurer => "adventurer",
            Self::Custom(name) => name,
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "wise_mentor" => Self::WiseMentor,
            "supportive_friend" => Self::SupportiveFriend,
            "girlfriend" => Self::Girlfriend,
            "boyfriend" => Self::Boyfriend,
            "life_coach" => Self::LifeCoach,
            "playful_companion" => Self::PlayfulCompanion,
            "intellectual_sparring_partner" => Self::IntellectualSparringPartner,
            "caretaker" => Self::Caretaker,
            "adventurer" => Self::Adventurer,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Default trait/behavior bundle for a named archetype (custom
    /// archetypes start from `SupportiveFriend`'s neutral bundle and are
    /// expected to be tuned via `UpdatePersonalityRequest`).
    pub fn default_traits(&self) -> Traits {
        match self {
            Self::WiseMentor => Traits { humor: 3, formality: 7, enthusiasm: 4, empathy: 7, directness: 7, curiosity: 6, supportiveness: 7, playfulness: 2 },
            Self::SupportiveFriend => Traits { humor: 6, formality: 3, enthusiasm: 6, empathy: 9, directness: 4, curiosity: 5, supportiveness: 9, playfulness: 5 },
            Self::Girlfriend | Self::Boyfriend => Traits { humor: 7, formality: 2, enthusiasm: 8, empathy: 8, directness: 5, curiosity: 6, supportiveness: 8, playfulness: 7 },
            Self::LifeCoach => Traits { humor: 4, formality: 5, enthusiasm: 8, empathy: 6, directness: 9, curiosity: 5, supportiveness: 8, playfulness: 3 },
            Self::PlayfulCompanion => Traits { humor: 9, formality: 1, enthusiasm: 9, empathy: 5, directness: 4, curiosity: 7, supportiveness: 6, playfulness: 10 },
            Self::IntellectualSparringPartner => Traits { humor: 5, formality: 6, enthusiasm: 5, empathy: 4, directness: 8, curiosity: 10, supportiveness: 4, playfulness: 3 },
            Self::Caretaker => Traits { humor: 4, formality: 4, enthusiasm: 5, empathy: 10, directness: 3, curiosity: 4, supportiveness: 10, playfulness: 3 },
            Self::Adventurer => Traits { humor: 7, formality: 2, enthusiasm: 10, empathy: 5, directness: 6, curiosity: 9, supportiveness: 5, playfulness: 8 },
            Self::Custom(_) => Traits::default(),
        }
    }

    pub fn default_behaviors(&self) -> Behaviors {
        match self {
            Self::WiseMentor => Behaviors { asks_questions: true, uses_examples: true, shares_opinions: true, challenges_user: true, celebrates_wins: false },
            Self::SupportiveFriend => Behaviors { asks_questions: true, uses_examples: false, shares_opinions: true, challenges_user: false, celebrates_wins: true },
            Self::Girlfriend | Self::Boyfriend => Behaviors { asks_questions: true, uses_examples: false, shares_opinions: true, challenges_user: false, celebrates_wins: true },
            Self::LifeCoach => Behaviors { asks_questions: true, uses_examples: true, shares_opinions: true, challenges_user: true, celebrates_wins: true },
            Self::PlayfulCompanion => Behaviors { asks_questions: true, uses_examples: false, shares_opinions: false, challenges_user: false, celebrates_wins: true },
            Self::IntellectualSparringPartner => Behaviors { asks_questions: true, uses_examples: true, shares_opinions: true, challenges_user: true, celebrates_wins: false },
            Self::Caretaker => Behaviors { asks_questions: true, uses_examples: false, shares_opinions: false, challenges_user: false, celebrates_wins: true },
            Self::Adventurer => Behaviors { asks_questions: true, uses_examples: true, shares_opinions: true, challenges_user: false, celebrates_wins: true },
            Self::Custom(_) => Behaviors::default(),
        }
    }
}

/// Eight trait scalars in `[0, 10]` (spec §3 Personality).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub humor: u8,
    pub formality: u8,
    pub enthusiasm: u8,
    pub empathy: u8,
    pub directness: u8,
    pub curiosity: u8,
    pub supportiveness: u8,
    pub playfulness: u8,
}

impl Default for Traits {
    fn default() -> Self {
        Self { humor: 5, formality: 5, enthusiasm: 5, empathy: 5, directness: 5, curiosity: 5, supportiveness: 5, playfulness: 5 }
    }
}

/// Five behavior flags (spec §3 Personality).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behaviors {
    pub asks_questions: bool,
    pub uses_examples: bool,
    pub shares_opinions: bool,
    pub challenges_user: bool,
    pub celebrates_wins: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personality {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub archetype: Archetype,
    pub traits: Traits,
    pub behaviors: Behaviors,
    pub backstory: Option<String>,
    pub speaking_style: Option<String>,
    pub custom_instructions: Option<String>,
    /// Monotonically increasing on every update (spec §3).
    pub version: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// Merge keeps existing fields where the request leaves them unset;
/// Replace overwrites the entire trait/behavior/freeform bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    Merge,
    Replace,
}

/// Per (user, personality) relationship (spec §3 RelationshipState).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipState {
    pub user_id: String,
    pub personality_id: String,
    pub total_messages: u64,
    pub depth_score: f64,
    pub trust_level: f64,
    pub first_interaction: String,
    pub last_interaction: String,
    /// Message-count thresholds already crossed (spec §3, §9 config
    /// `personality.relationship_milestones`).
    pub milestones: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Positive,
    Negative,
}

/// Per-user communication preferences (spec §3 PreferenceProfile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub user_id: String,
    pub language: String,
    pub formality: String,
    pub tone: String,
    pub emoji_usage: String,
    pub response_length: String,
    pub explanation_style: String,
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            language: "en".to_string(),
            formality: "neutral".to_string(),
            tone: "warm".to_string(),
            emoji_usage: "occasional".to_string(),
            response_length: "medium".to_string(),
            explanation_style: "balanced".to_string(),
        }
    }
}

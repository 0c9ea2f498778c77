pub mod contradiction;
pub mod emotion;
pub mod error;
pub mod goal;
pub mod memory_extraction;
pub mod personality;
pub mod preference;
pub mod types;

pub use contradiction::{ContradictionDetector, ContradictionReason, ContradictionVerdict};
pub use emotion::{EmotionDetector, EmotionResult, Intensity};
pub use error::DetectorError;
pub use goal::{GoalCandidate, GoalDetector};
pub use memory_extraction::{ExtractedFact, MemoryCategoryHint, MemoryExtractionDetector};
pub use personality::{PersonalityDetector, PersonalitySuggestion, ARCHETYPES};
pub use preference::{PreferenceDetector, PreferenceField, PreferenceUpdate};
pub use types::{Detectable, DetectorContext, DetectorLlm, DetectorMethod, HybridDetector, Scored};

pub mod db;
pub mod error;
pub mod manager;
pub mod scoring;
pub mod types;

pub use error::MemoryError;
pub use manager::{EmotionLog, GoalStore, MemoryEngine, ShortTermBuffer};
pub use types::{
    BufferedMessage, EmotionIntensity, EmotionRecord, Goal, ImportanceSubscores, Memory, MemoryCategory, RelatedEntities,
};

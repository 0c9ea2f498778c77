pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::PersonalityError;
pub use manager::PersonalityManager;
pub use types::{
    Archetype, Behaviors, Personality, PreferenceProfile, Reaction, RelationshipState, Traits, UpdateMode,
};

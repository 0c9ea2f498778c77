use std::sync::Mutex;

use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::db;
use crate::error::{PersonalityError, Result};
use crate::types::{
    Archetype, Behaviors, Personality, PreferenceProfile, Reaction, RelationshipState, Traits, UpdateMode,
};

/// C-adjacent ambient crate: Personality / RelationshipState / PreferenceProfile
/// (spec §3), grounded on `skynet-users::resolver::UserResolver`'s
/// `Arc<Mutex<Connection>>` + db.rs/manager.rs split.
pub struct PersonalityManager {
    db: Mutex<Connection>,
    relationship_milestones: Vec<u32>,
}

impl PersonalityManager {
    pub fn new(conn: Connection, relationship_milestones: Vec<u32>) -> Self {
        Self {
            db: Mutex::new(conn),
            relationship_milestones,
        }
    }

    /// R2: creating a personality with an existing (user, name) fails
    /// without mutating state.
    #[instrument(skip(self), fields(user_id, name))]
    pub fn create(
        &self,
        user_id: &str,
        name: &str,
        archetype: Archetype,
        backstory: Option<String>,
        speaking_style: Option<String>,
        custom_instructions: Option<String>,
    ) -> Result<Personality> {
        let db = self.db.lock().unwrap();
        if db::find_by_name(&db, user_id, name)?.is_some() {
            return Err(PersonalityError::DuplicateName(name.to_string()));
        }
        let now = chrono::Utc::now().to_rfc3339();
        let personality = Personality {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            traits: archetype.default_traits(),
            behaviors: archetype.default_behaviors(),
            archetype,
            backstory,
            speaking_style,
            custom_instructions,
            version: 1,
            created_at: now.clone(),
            updated_at: now,
        };
        db::insert(&db, &personality)?;
        Ok(personality)
    }

    pub fn get_by_name(&self, user_id: &str, name: &str) -> Result<Option<Personality>> {
        let db = self.db.lock().unwrap();
        db::find_by_name(&db, user_id, name)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Personality>> {
        let db = self.db.lock().unwrap();
        db::find_by_id(&db, id)
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Personality>> {
        let db = self.db.lock().unwrap();
        db::list_for_user(&db, user_id)
    }

    /// `version` always increments, regardless of merge/replace.
    #[instrument(skip(self, traits, behaviors), fields(id))]
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &self,
        id: &str,
        mode: UpdateMode,
        archetype: Option<Archetype>,
        traits: Option<Traits>,
        behaviors: Option<Behaviors>,
        backstory: Option<String>,
        speaking_style: Option<String>,
        custom_instructions: Option<String>,
    ) -> Result<Personality> {
        let db = self.db.lock().unwrap();
        let mut p = db::find_by_id(&db, id)?.ok_or_else(|| PersonalityError::NotFound(id.to_string()))?;

        if let Some(a) = archetype {
            p.archetype = a;
        }

        match mode {
            UpdateMode::Replace => {
                if let Some(t) = traits {
                    p.traits = t;
                }
                if let Some(b) = behaviors {
                    p.behaviors = b;
                }
                p.backstory = backstory.or(None);
                p.speaking_style = speaking_style.or(None);
                p.custom_instructions = custom_instructions.or(None);
            }
            UpdateMode::Merge => {
                if let Some(t) = traits {
                    p.traits = t;
                }
                if let Some(b) = behaviors {
                    p.behaviors = b;
                }
                if backstory.is_some() {
                    p.backstory = backstory;
                }
                if speaking_style.is_some() {
                    p.speaking_style = speaking_style;
                }
                if custom_instructions.is_some() {
                    p.custom_instructions = custom_instructions;
                }
            }
        }
        p.version += 1;
        p.updated_at = chrono::Utc::now().to_rfc3339();
        db::update(&db, &p)?;
        Ok(p)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db::delete(&db, id)?;
        Ok(())
    }

    /// Loads (or creates) the relationship state, bumps `total_messages`,
    /// recomputes `depth_score`, applies a reaction's trust shift, and
    /// records any newly crossed milestone (spec §3 RelationshipState).
    #[instrument(skip(self), fields(user_id, personality_id))]
    pub fn record_interaction(
        &self,
        user_id: &str,
        personality_id: &str,
        reaction: Option<Reaction>,
    ) -> Result<RelationshipState> {
        let db = self.db.lock().unwrap();
        let now = chrono::Utc::now();
        let now_str = now.to_rfc3339();

        let mut state = db::find_relationship(&db, user_id, personality_id)?.unwrap_or(RelationshipState {
            user_id: user_id.to_string(),
            personality_id: personality_id.to_string(),
            total_messages: 0,
            depth_score: 0.0,
            trust_level: 0.0,
            first_interaction: now_str.clone(),
            last_interaction: now_str.clone(),
            milestones: Vec::new(),
        });

        state.total_messages += 1;
        state.last_interaction = now_str;

        match reaction {
            Some(Reaction::Positive) => state.trust_level = (state.trust_level + 0.1).min(10.0),
            Some(Reaction::Negative) => state.trust_level = (state.trust_level - 0.2).max(0.0),
            None => {}
        }

        let first = chrono::DateTime::parse_from_rfc3339(&state.first_interaction)
            .map(|d| d.with_timezone(&chrono::Utc))
            .unwrap_or(now);
        let days_known = now.signed_duration_since(first).num_seconds() as f64 / 86400.0;
        let pos_minus_neg = match reaction {
            Some(Reaction::Positive) => 1.0,
            Some(Reaction::Negative) => -1.0,
            None => 0.0,
        };
        state.depth_score = (1.5 * ((state.total_messages as f64) + 1.0).ln() + days_known / 30.0 + pos_minus_neg / 10.0)
            .min(10.0)
            .max(0.0);

        for &milestone in &self.relationship_milestones {
            if state.total_messages >= milestone as u64 && !state.milestones.contains(&milestone) {
                state.milestones.push(milestone);
            }
        }

        db::upsert_relationship(&db, &state)?;
        Ok(state)
    }

    pub fn get_relationship(&self, user_id: &str, personality_id: &str) -> Result<Option<RelationshipState>> {
        let db = self.db.lock().unwrap();
        db::find_relationship(&db, user_id, personality_id)
    }

    pub fn get_preferences(&self, user_id: &str) -> Result<PreferenceProfile> {
        let db = self.db.lock().unwrap();
        Ok(db::find_preferences(&db, user_id)?.unwrap_or_else(|| PreferenceProfile {
            user_id: user_id.to_string(),
            ..PreferenceProfile::default()
        }))
    }

    pub fn set_preferences(&self, preferences: &PreferenceProfile) -> Result<()> {
        let db = self.db.lock().unwrap();
        db::upsert_preferences(&db, preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> PersonalityManager {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        PersonalityManager::new(conn, vec![10, 50, 100, 250, 500, 1000])
    }

    #[test]
    fn duplicate_name_fails_without_mutating_state() {
        let mgr = setup();
        mgr.create("u1", "elara", Archetype::Girlfriend, None, None, None).unwrap();
        let err = mgr.create("u1", "elara", Archetype::WiseMentor, None, None, None);
        assert!(err.is_err());
        let list = mgr.list("u1").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].archetype, Archetype::Girlfriend);
    }

    #[test]
    fn update_always_bumps_version() {
        let mgr = setup();
        let p = mgr.create("u1", "elara", Archetype::Girlfriend, None, None, None).unwrap();
        let updated = mgr
            .update(&p.id, UpdateMode::Merge, None, None, None, Some("new backstory".into()), None, None)
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.backstory.as_deref(), Some("new backstory"));
    }

    #[test]
    fn depth_score_increases_with_messages_and_positive_reactions() {
        let mgr = setup();
        let p = mgr.create("u1", "elara", Archetype::Girlfriend, None, None, None).unwrap();
        let first = mgr.record_interaction("u1", &p.id, None).unwrap();
        let second = mgr.record_interaction("u1", &p.id, Some(Reaction::Positive)).unwrap();
        assert!(second.depth_score >= first.depth_score);
        assert!(second.trust_level > first.trust_level);
    }

    #[test]
    fn milestone_recorded_once_threshold_crossed() {
        let mgr = setup();
        let p = mgr.create("u1", "elara", Archetype::Girlfriend, None, None, None).unwrap();
        let mut state = None;
        for _ in 0..10 {
            state = Some(mgr.record_interaction("u1", &p.id, None).unwrap());
        }
        assert!(state.unwrap().milestones.contains(&10));
    }
}

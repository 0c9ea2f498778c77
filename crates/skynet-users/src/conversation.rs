use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::db;
use crate::error::{Result, UserError};
use crate::types::Conversation;

/// Orchestrator step 2 (spec §4.4): resolve or create the conversation a
/// turn belongs to, binding it to a personality on first creation.
///
/// Grounded on `UserResolver`'s db-backed store shape (same crate, same
/// `Mutex<Connection>` pattern), without its cache — conversations are
/// looked up by an id the caller already holds (or omits, to start a new
/// one), not by repeated external-id translation, so there is no hot path
/// worth caching.
pub struct ConversationStore {
    db: Mutex<Connection>,
}

impl ConversationStore {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    /// Resolve an existing conversation or start a new one.
    ///
    /// `conversation_id = None` always creates a fresh conversation bound to
    /// `personality_id`. `conversation_id = Some(id)` looks the id up; if it
    /// already exists it must be bound to `personality_id` (the binding is
    /// immutable, spec §3) or this returns `PersonalityMismatch`. If it
    /// doesn't exist yet, it is created with that id.
    #[instrument(skip(self), fields(user_id, personality_id))]
    pub fn get_or_create(
        &self,
        conversation_id: Option<&str>,
        user_id: &str,
        personality_id: &str,
    ) -> Result<Conversation> {
        let conn = self.db.lock().unwrap();

        if let Some(id) = conversation_id {
            if let Some(existing) = db::find_conversation(&conn, id)? {
                if existing.personality_id != personality_id {
                    return Err(UserError::PersonalityMismatch {
                        conversation_id: existing.id,
                    });
                }
                debug!(conversation_id = id, "conversation resolved");
                return Ok(existing);
            }

            let conversation = Conversation {
                id: id.to_string(),
                user_id: user_id.to_string(),
                personality_id: personality_id.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            db::insert_conversation(&conn, &conversation)?;
            info!(conversation_id = id, "created conversation with caller-supplied id");
            return Ok(conversation);
        }

        let conversation = Conversation {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            personality_id: personality_id.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        db::insert_conversation(&conn, &conversation)?;
        info!(conversation_id = %conversation.id, "created new conversation");
        Ok(conversation)
    }

    /// Look up a conversation by id without creating one.
    pub fn get(&self, conversation_id: &str) -> Result<Conversation> {
        let conn = self.db.lock().unwrap();
        db::find_conversation(&conn, conversation_id)?
            .ok_or_else(|| UserError::ConversationNotFound(conversation_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConversationStore {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        ConversationStore::new(conn)
    }

    #[test]
    fn none_id_always_creates_new_conversation() {
        let store = setup();
        let a = store.get_or_create(None, "u1", "p1").unwrap();
        let b = store.get_or_create(None, "u1", "p1").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn existing_id_with_matching_personality_resolves() {
        let store = setup();
        let created = store.get_or_create(Some("c1"), "u1", "p1").unwrap();
        let resolved = store.get_or_create(Some("c1"), "u1", "p1").unwrap();
        assert_eq!(created.id, resolved.id);
        assert_eq!(resolved.personality_id, "p1");
    }

    #[test]
    fn existing_id_with_different_personality_is_rejected() {
        let store = setup();
        store.get_or_create(Some("c1"), "u1", "p1").unwrap();
        let err = store.get_or_create(Some("c1"), "u1", "p2").unwrap_err();
        assert!(matches!(err, UserError::PersonalityMismatch { .. }));
    }

    #[test]
    fn unknown_id_is_created_with_that_id() {
        let store = setup();
        let conversation = store.get_or_create(Some("fixed-id"), "u1", "p1").unwrap();
        assert_eq!(conversation.id, "fixed-id");
    }

    #[test]
    fn get_returns_not_found_for_unknown_id() {
        let store = setup();
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, UserError::ConversationNotFound(_)));
    }
}

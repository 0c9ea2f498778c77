use std::collections::HashMap;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::db;
use crate::error::Result;
use crate::types::User;

/// Maximum number of `external_id -> User` pairs kept in the in-process
/// cache. Simple eviction: when full, drop the oldest half.
const CACHE_MAX: usize = 512;

/// Orchestrator step 1 (spec §4.4): translate an external user id to an
/// internal identity, creating the user on first sight.
///
/// Grounded on the teacher's `UserResolver` cache-with-eviction pattern,
/// simplified from multi-channel identity linking (no role hierarchy, no
/// approval queue, no budget tracking — none have a spec counterpart) down
/// to the single `external_id -> User` mapping spec §3 describes.
pub struct UserResolver {
    db: Mutex<Connection>,
    cache: Mutex<HashMap<String, User>>,
    cache_order: Mutex<Vec<String>>,
}

impl UserResolver {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
            cache: Mutex::new(HashMap::new()),
            cache_order: Mutex::new(Vec::new()),
        }
    }

    /// Resolve an external id to a user, auto-creating on first contact.
    #[instrument(skip(self), fields(external_id))]
    pub fn resolve(&self, external_id: &str) -> Result<User> {
        if let Some(user) = self.cache_lookup(external_id) {
            debug!(external_id, "user cache hit");
            return Ok(user);
        }

        let conn = self.db.lock().unwrap();
        if let Some(user) = db::find_by_external_id(&conn, external_id)? {
            drop(conn);
            self.cache_insert(user.clone());
            return Ok(user);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let user = User {
            id: Uuid::now_v7().to_string(),
            external_id: external_id.to_string(),
            created_at: now.clone(),
            last_seen_at: now,
        };
        db::insert(&conn, &user)?;
        drop(conn);
        info!(external_id, user_id = %user.id, "created new user on first sight");
        self.cache_insert(user.clone());
        Ok(user)
    }

    /// Look up a user by internal id (used when an auth token already
    /// carries a resolved internal id).
    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.db.lock().unwrap();
        db::find_by_id(&conn, user_id)
    }

    /// Bump `last_seen_at`. Called once per request after resolution.
    pub fn touch(&self, user_id: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.db.lock().unwrap();
        db::touch_last_seen(&conn, user_id, &now)
    }

    fn cache_lookup(&self, external_id: &str) -> Option<User> {
        self.cache.lock().unwrap().get(external_id).cloned()
    }

    fn cache_insert(&self, user: User) {
        let mut cache = self.cache.lock().unwrap();
        let mut order = self.cache_order.lock().unwrap();
        if !cache.contains_key(&user.external_id) && cache.len() >= CACHE_MAX {
            let evict_count = CACHE_MAX / 2;
            for k in order.drain(..evict_count) {
                cache.remove(&k);
            }
        }
        if !cache.contains_key(&user.external_id) {
            order.push(user.external_id.clone());
        }
        cache.insert(user.external_id.clone(), user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> UserResolver {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        UserResolver::new(conn)
    }

    #[test]
    fn resolve_creates_user_on_first_sight() {
        let r = setup();
        let u = r.resolve("ext-1").unwrap();
        assert_eq!(u.external_id, "ext-1");
    }

    #[test]
    fn resolve_is_idempotent_for_same_external_id() {
        let r = setup();
        let a = r.resolve("ext-2").unwrap();
        let b = r.resolve("ext-2").unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn distinct_external_ids_get_distinct_users() {
        let r = setup();
        let a = r.resolve("ext-3").unwrap();
        let b = r.resolve("ext-4").unwrap();
        assert_ne!(a.id, b.id);
    }
}

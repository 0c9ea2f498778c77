use rusqlite::{params, Connection, Result};

use crate::types::{label_to_str, route_to_str, str_to_label, str_to_route, SessionState};

/// Initialise the sessions table. Safe to call on every startup.
///
/// Spec §5 requires the session store to provide atomic read-modify-write
/// per conversation id; a single SQLite connection behind a `Mutex`
/// (see `SessionManager`) gives that for a single instance. Horizontal
/// scaling calls for externalising this table to a K/V with the same
/// contract (spec §9) — left to the deployment's persistence layer.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            conversation_id                        TEXT PRIMARY KEY NOT NULL,
            age_verified                           INTEGER NOT NULL DEFAULT 0,
            age_verified_at                        TEXT,
            current_route                          TEXT NOT NULL DEFAULT 'normal',
            route_lock_counter                     INTEGER NOT NULL DEFAULT 0,
            explicit_attempts_without_verification INTEGER NOT NULL DEFAULT 0,
            last_classification_label              TEXT,
            updated_at                              TEXT NOT NULL
        );",
    )
}

pub(crate) fn row_to_state(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionState> {
    let route_str: String = row.get(3)?;
    let label_str: Option<String> = row.get(5)?;
    Ok(SessionState {
        conversation_id: row.get(0)?,
        age_verified: row.get::<_, i64>(1)? != 0,
        age_verified_at: row.get(2)?,
        current_route: str_to_route(&route_str),
        route_lock_counter: row.get::<_, i64>(4)? as u32,
        explicit_attempts_without_verification: 0, // overwritten below
        last_classification_label: label_str.as_deref().and_then(str_to_label),
        updated_at: row.get(6)?,
    })
}

const SELECT_SQL: &str = "SELECT conversation_id, age_verified, age_verified_at, current_route,
            route_lock_counter, last_classification_label, updated_at,
            explicit_attempts_without_verification
     FROM sessions WHERE conversation_id = ?1";

pub(crate) fn find(conn: &Connection, conversation_id: &str) -> Result<Option<SessionState>> {
    match conn.query_row(SELECT_SQL, params![conversation_id], |row| {
        let mut state = row_to_state(row)?;
        state.explicit_attempts_without_verification = row.get::<_, i64>(7)? as u32;
        Ok(state)
    }) {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn upsert(conn: &Connection, state: &SessionState) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (conversation_id, age_verified, age_verified_at, current_route,
            route_lock_counter, explicit_attempts_without_verification,
            last_classification_label, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(conversation_id) DO UPDATE SET
            age_verified = excluded.age_verified,
            age_verified_at = excluded.age_verified_at,
            current_route = excluded.current_route,
            route_lock_counter = excluded.route_lock_counter,
            explicit_attempts_without_verification = excluded.explicit_attempts_without_verification,
            last_classification_label = excluded.last_classification_label,
            updated_at = excluded.updated_at",
        params![
            state.conversation_id,
            state.age_verified as i64,
            state.age_verified_at,
            route_to_str(state.current_route),
            state.route_lock_counter as i64,
            state.explicit_attempts_without_verification as i64,
            state.last_classification_label.map(label_to_str),
            state.updated_at,
        ],
    )?;
    Ok(())
}

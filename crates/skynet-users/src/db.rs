use rusqlite::{params, Connection, Result};

use crate::types::{Conversation, User};

/// Initialise the users and conversations tables. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY NOT NULL,
            external_id   TEXT NOT NULL UNIQUE,
            created_at    TEXT NOT NULL,
            last_seen_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_external_id ON users(external_id);

        CREATE TABLE IF NOT EXISTS conversations (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT NOT NULL,
            personality_id  TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id);",
    )
}

pub(crate) fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        personality_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn find_conversation(conn: &Connection, id: &str) -> Result<Option<Conversation>> {
    match conn.query_row(
        "SELECT id, user_id, personality_id, created_at FROM conversations WHERE id = ?1",
        params![id],
        row_to_conversation,
    ) {
        Ok(c) => Ok(Some(c)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn insert_conversation(conn: &Connection, conversation: &Conversation) -> Result<()> {
    conn.execute(
        "INSERT INTO conversations (id, user_id, personality_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            conversation.id,
            conversation.user_id,
            conversation.personality_id,
            conversation.created_at
        ],
    )?;
    Ok(())
}

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        external_id: row.get(1)?,
        created_at: row.get(2)?,
        last_seen_at: row.get(3)?,
    })
}

pub(crate) fn find_by_external_id(conn: &Connection, external_id: &str) -> Result<Option<User>> {
    match conn.query_row(
        "SELECT id, external_id, created_at, last_seen_at FROM users WHERE external_id = ?1",
        params![external_id],
        row_to_user,
    ) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn find_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    match conn.query_row(
        "SELECT id, external_id, created_at, last_seen_at FROM users WHERE id = ?1",
        params![id],
        row_to_user,
    ) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn insert(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, external_id, created_at, last_seen_at) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.external_id, user.created_at, user.last_seen_at],
    )?;
    Ok(())
}

pub(crate) fn touch_last_seen(conn: &Connection, id: &str, at: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET last_seen_at = ?1 WHERE id = ?2",
        params![at, id],
    )?;
    Ok(())
}

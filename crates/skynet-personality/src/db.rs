use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::types::{Archetype, Behaviors, Personality, PreferenceProfile, RelationshipState, Traits};

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS personalities (
            id                  TEXT PRIMARY KEY NOT NULL,
            user_id             TEXT NOT NULL,
            name                TEXT NOT NULL,
            archetype           TEXT NOT NULL,
            traits              TEXT NOT NULL,
            behaviors           TEXT NOT NULL,
            backstory           TEXT,
            speaking_style      TEXT,
            custom_instructions TEXT,
            version             INTEGER NOT NULL DEFAULT 1,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            UNIQUE(user_id, name)
        );
        CREATE INDEX IF NOT EXISTS idx_personalities_user ON personalities(user_id);

        CREATE TABLE IF NOT EXISTS relationship_state (
            user_id          TEXT NOT NULL,
            personality_id   TEXT NOT NULL,
            total_messages   INTEGER NOT NULL DEFAULT 0,
            depth_score      REAL NOT NULL DEFAULT 0,
            trust_level      REAL NOT NULL DEFAULT 0,
            first_interaction TEXT NOT NULL,
            last_interaction  TEXT NOT NULL,
            milestones        TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (user_id, personality_id)
        );

        CREATE TABLE IF NOT EXISTS preference_profiles (
            user_id          TEXT PRIMARY KEY NOT NULL,
            language         TEXT NOT NULL DEFAULT 'en',
            formality        TEXT NOT NULL DEFAULT 'neutral',
            tone             TEXT NOT NULL DEFAULT 'warm',
            emoji_usage      TEXT NOT NULL DEFAULT 'occasional',
            response_length  TEXT NOT NULL DEFAULT 'medium',
            explanation_style TEXT NOT NULL DEFAULT 'balanced'
        );",
    )
}

fn row_to_personality(row: &rusqlite::Row<'_>) -> rusqlite::Result<Personality> {
    let archetype: String = row.get(3)?;
    let traits_json: String = row.get(4)?;
    let behaviors_json: String = row.get(5)?;
    Ok(Personality {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        archetype: Archetype::from_str(&archetype),
        traits: serde_json::from_str(&traits_json).unwrap_or_default(),
        behaviors: serde_json::from_str(&behaviors_json).unwrap_or_default(),
        backstory: row.get(6)?,
        speaking_style: row.get(7)?,
        custom_instructions: row.get(8)?,
        version: row.get::<_, i64>(9)? as u32,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const SELECT_COLUMNS: &str = "id, user_id, name, archetype, traits, behaviors, backstory, \
    speaking_style, custom_instructions, version, created_at, updated_at";

pub(crate) fn find_by_name(conn: &Connection, user_id: &str, name: &str) -> Result<Option<Personality>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM personalities WHERE user_id = ?1 AND name = ?2"),
        params![user_id, name],
        row_to_personality,
    )
    .optional()
}

pub(crate) fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Personality>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM personalities WHERE id = ?1"),
        params![id],
        row_to_personality,
    )
    .optional()
}

pub(crate) fn list_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Personality>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM personalities WHERE user_id = ?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![user_id], row_to_personality)?;
    rows.collect()
}

pub(crate) fn insert(conn: &Connection, p: &Personality) -> Result<()> {
    conn.execute(
        "INSERT INTO personalities (id, user_id, name, archetype, traits, behaviors, backstory,
            speaking_style, custom_instructions, version, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            p.id,
            p.user_id,
            p.name,
            p.archetype.as_str(),
            serde_json::to_string(&p.traits).unwrap(),
            serde_json::to_string(&p.behaviors).unwrap(),
            p.backstory,
            p.speaking_style,
            p.custom_instructions,
            p.version as i64,
            p.created_at,
            p.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn update(conn: &Connection, p: &Personality) -> Result<()> {
    conn.execute(
        "UPDATE personalities SET archetype = ?2, traits = ?3, behaviors = ?4, backstory = ?5,
            speaking_style = ?6, custom_instructions = ?7, version = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            p.id,
            p.archetype.as_str(),
            serde_json::to_string(&p.traits).unwrap(),
            serde_json::to_string(&p.behaviors).unwrap(),
            p.backstory,
            p.speaking_style,
            p.custom_instructions,
            p.version as i64,
            p.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn delete(conn: &Connection, id: &str) -> Result<usize> {
    conn.execute("DELETE FROM personalities WHERE id = ?1", params![id])
}

fn row_to_relationship(row: &rusqlite::Row<'_>) -> rusqlite::Result<RelationshipState> {
    let milestones_json: String = row.get(7)?;
    Ok(RelationshipState {
        user_id: row.get(0)?,
        personality_id: row.get(1)?,
        total_messages: row.get::<_, i64>(2)? as u64,
        depth_score: row.get(3)?,
        trust_level: row.get(4)?,
        first_interaction: row.get(5)?,
        last_interaction: row.get(6)?,
        milestones: serde_json::from_str(&milestones_json).unwrap_or_default(),
    })
}

pub(crate) fn find_relationship(conn: &Connection, user_id: &str, personality_id: &str) -> Result<Option<RelationshipState>> {
    conn.query_row(
        "SELECT user_id, personality_id, total_messages, depth_score, trust_level,
            first_interaction, last_interaction, milestones
         FROM relationship_state WHERE user_id = ?1 AND personality_id = ?2",
        params![user_id, personality_id],
        row_to_relationship,
    )
    .optional()
}

pub(crate) fn upsert_relationship(conn: &Connection, r: &RelationshipState) -> Result<()> {
    conn.execute(
        "INSERT INTO relationship_state (user_id, personality_id, total_messages, depth_score,
            trust_level, first_interaction, last_interaction, milestones)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_id, personality_id) DO UPDATE SET
            total_messages = excluded.total_messages,
            depth_score = excluded.depth_score,
            trust_level = excluded.trust_level,
            last_interaction = excluded.last_interaction,
            milestones = excluded.milestones",
        params![
            r.user_id,
            r.personality_id,
            r.total_messages as i64,
            r.depth_score,
            r.trust_level,
            r.first_interaction,
            r.last_interaction,
            serde_json::to_string(&r.milestones).unwrap(),
        ],
    )?;
    Ok(())
}

fn row_to_preferences(row: &rusqlite::Row<'_>) -> rusqlite::Result<PreferenceProfile> {
    Ok(PreferenceProfile {
        user_id: row.get(0)?,
        language: row.get(1)?,
        formality: row.get(2)?,
        tone: row.get(3)?,
        emoji_usage: row.get(4)?,
        response_length: row.get(5)?,
        explanation_style: row.get(6)?,
    })
}

pub(crate) fn find_preferences(conn: &Connection, user_id: &str) -> Result<Option<PreferenceProfile>> {
    conn.query_row(
        "SELECT user_id, language, formality, tone, emoji_usage, response_length, explanation_style
         FROM preference_profiles WHERE user_id = ?1",
        params![user_id],
        row_to_preferences,
    )
    .optional()
}

pub(crate) fn upsert_preferences(conn: &Connection, p: &PreferenceProfile) -> Result<()> {
    conn.execute(
        "INSERT INTO preference_profiles (user_id, language, formality, tone, emoji_usage,
            response_length, explanation_style)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id) DO UPDATE SET
            language = excluded.language,
            formality = excluded.formality,
            tone = excluded.tone,
            emoji_usage = excluded.emoji_usage,
            response_length = excluded.response_length,
            explanation_style = excluded.explanation_style",
        params![
            p.user_id,
            p.language,
            p.formality,
            p.tone,
            p.emoji_usage,
            p.response_length,
            p.explanation_style,
        ],
    )?;
    Ok(())
}

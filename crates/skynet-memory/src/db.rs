use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::types::{EmotionIntensity, EmotionRecord, Goal, ImportanceSubscores, Memory, MemoryCategory, RelatedEntities};

/// Initialise the memory tables. Safe to call on every startup.
///
/// `embedding` is stored as a JSON array of f32 (spec §6: "memory
/// embeddings are stored in a vector-capable column allowing ANN search";
/// this deployment performs the ANN step in Rust over a SQL-prefiltered
/// candidate set — see `manager::MemoryEngine::retrieve`, SPEC_FULL §4.5).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memories (
            id                  TEXT PRIMARY KEY NOT NULL,
            user_id             TEXT NOT NULL,
            personality_id      TEXT NOT NULL,
            conversation_id     TEXT NOT NULL,
            content             TEXT NOT NULL,
            embedding           TEXT NOT NULL,
            category             TEXT NOT NULL,
            importance_subscores TEXT NOT NULL,
            importance           REAL NOT NULL,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL,
            last_accessed        TEXT NOT NULL,
            access_count         INTEGER NOT NULL DEFAULT 0,
            decay_factor         REAL NOT NULL DEFAULT 1.0,
            is_active            INTEGER NOT NULL DEFAULT 1,
            superseded_by        TEXT,
            consolidated_from    TEXT NOT NULL DEFAULT '[]',
            related_entities     TEXT NOT NULL DEFAULT '{}',
            is_shared            INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_memories_owner ON memories(user_id, personality_id, is_active);
        CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(user_id, personality_id, category, is_active);

        CREATE TABLE IF NOT EXISTS short_term_messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT NOT NULL,
            role            TEXT NOT NULL,
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_short_term_conv ON short_term_messages(conversation_id, id);

        CREATE TABLE IF NOT EXISTS goals (
            id               TEXT PRIMARY KEY NOT NULL,
            user_id          TEXT NOT NULL,
            title            TEXT NOT NULL,
            category         TEXT NOT NULL,
            confidence       REAL NOT NULL,
            commitment_level REAL NOT NULL,
            target_timeframe TEXT,
            target_date      TEXT,
            motivation       TEXT,
            created_at       TEXT NOT NULL,
            is_active        INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_goals_user ON goals(user_id, is_active);

        CREATE TABLE IF NOT EXISTS emotion_records (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT NOT NULL,
            conversation_id TEXT NOT NULL,
            emotion         TEXT NOT NULL,
            confidence      REAL NOT NULL,
            intensity       TEXT NOT NULL,
            indicators      TEXT NOT NULL DEFAULT '[]',
            snippet         TEXT NOT NULL,
            detected_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_emotion_user_conv ON emotion_records(user_id, conversation_id, detected_at);",
    )
}

const SELECT_COLUMNS: &str = "id, user_id, personality_id, conversation_id, content, embedding, \
    category, importance_subscores, importance, created_at, updated_at, last_accessed, \
    access_count, decay_factor, is_active, superseded_by, consolidated_from, related_entities, is_shared";

pub(crate) fn row_to_memory(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memory> {
    let embedding_json: String = row.get(5)?;
    let category_str: String = row.get(6)?;
    let subscores_json: String = row.get(7)?;
    let consolidated_json: String = row.get(16)?;
    let entities_json: String = row.get(17)?;
    Ok(Memory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        personality_id: row.get(2)?,
        conversation_id: row.get(3)?,
        content: row.get(4)?,
        embedding: serde_json::from_str(&embedding_json).unwrap_or_default(),
        category: MemoryCategory::from_str(&category_str).unwrap_or(MemoryCategory::Knowledge),
        importance_subscores: serde_json::from_str(&subscores_json).unwrap_or_default(),
        importance: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        last_accessed: row.get(11)?,
        access_count: row.get::<_, i64>(12)? as u32,
        decay_factor: row.get(13)?,
        is_active: row.get::<_, i64>(14)? != 0,
        superseded_by: row.get(15)?,
        consolidated_from: serde_json::from_str(&consolidated_json).unwrap_or_default(),
        related_entities: serde_json::from_str(&entities_json).unwrap_or_default(),
        is_shared: row.get::<_, i64>(18)? != 0,
    })
}

pub(crate) fn insert(conn: &Connection, m: &Memory) -> Result<()> {
    conn.execute(
        "INSERT INTO memories (id, user_id, personality_id, conversation_id, content, embedding,
            category, importance_subscores, importance, created_at, updated_at, last_accessed,
            access_count, decay_factor, is_active, superseded_by, consolidated_from,
            related_entities, is_shared)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)",
        params![
            m.id,
            m.user_id,
            m.personality_id,
            m.conversation_id,
            m.content,
            serde_json::to_string(&m.embedding).unwrap(),
            m.category.as_str(),
            serde_json::to_string(&m.importance_subscores).unwrap(),
            m.importance,
            m.created_at,
            m.updated_at,
            m.last_accessed,
            m.access_count as i64,
            m.decay_factor,
            m.is_active as i64,
            m.superseded_by,
            serde_json::to_string(&m.consolidated_from).unwrap(),
            serde_json::to_string(&m.related_entities).unwrap(),
            m.is_shared as i64,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Memory>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1"),
        params![id],
        row_to_memory,
    )
    .optional()
}

/// Candidates for the contradiction check: active memories of the same
/// category for the same (user, personality) (spec §4.5 step 2).
pub(crate) fn find_active_by_category(
    conn: &Connection,
    user_id: &str,
    personality_id: &str,
    category: MemoryCategory,
) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM memories
         WHERE user_id = ?1 AND personality_id = ?2 AND category = ?3 AND is_active = 1"
    ))?;
    let rows = stmt.query_map(params![user_id, personality_id, category.as_str()], row_to_memory)?;
    rows.collect()
}

/// SQL-side prefilter for retrieval (spec I3): `is_active ∧ user=U ∧
/// (personality=P ∨ is_shared)`. Fine-grained ranking happens in Rust.
pub(crate) fn find_retrieval_candidates(conn: &Connection, user_id: &str, personality_id: &str) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM memories
         WHERE user_id = ?1 AND is_active = 1 AND (personality_id = ?2 OR is_shared = 1)"
    ))?;
    let rows = stmt.query_map(params![user_id, personality_id], row_to_memory)?;
    rows.collect()
}

pub(crate) fn mark_superseded(conn: &Connection, id: &str, superseded_by: &str) -> Result<()> {
    conn.execute(
        "UPDATE memories SET is_active = 0, superseded_by = ?2 WHERE id = ?1",
        params![id, superseded_by],
    )?;
    Ok(())
}

pub(crate) fn touch_access(conn: &Connection, id: &str, accessed_at: &str) -> Result<()> {
    conn.execute(
        "UPDATE memories SET access_count = access_count + 1, last_accessed = ?2 WHERE id = ?1",
        params![id, accessed_at],
    )?;
    Ok(())
}

pub(crate) fn update_importance(conn: &Connection, id: &str, subscores: &ImportanceSubscores, importance: f64) -> Result<()> {
    conn.execute(
        "UPDATE memories SET importance_subscores = ?2, importance = ?3 WHERE id = ?1",
        params![id, serde_json::to_string(subscores).unwrap(), importance],
    )?;
    Ok(())
}

pub(crate) fn insert_short_term(conn: &Connection, conversation_id: &str, role: &str, content: &str, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO short_term_messages (conversation_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![conversation_id, role, content, created_at],
    )?;
    Ok(())
}

pub(crate) fn recent_short_term(conn: &Connection, conversation_id: &str, max_messages: u32) -> Result<Vec<(String, String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT role, content, created_at FROM short_term_messages
         WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![conversation_id, max_messages], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?;
    let mut out: Vec<(String, String, String)> = rows.collect::<Result<_>>()?;
    out.reverse();
    Ok(out)
}

pub(crate) fn count_short_term_turns(conn: &Connection, conversation_id: &str) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM short_term_messages WHERE conversation_id = ?1 AND role = 'user'",
        params![conversation_id],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n as u32)
}

const GOAL_COLUMNS: &str =
    "id, user_id, title, category, confidence, commitment_level, target_timeframe, target_date, motivation, created_at, is_active";

fn row_to_goal(row: &rusqlite::Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        category: row.get(3)?,
        confidence: row.get(4)?,
        commitment_level: row.get(5)?,
        target_timeframe: row.get(6)?,
        target_date: row.get(7)?,
        motivation: row.get(8)?,
        created_at: row.get(9)?,
        is_active: row.get::<_, i64>(10)? != 0,
    })
}

pub(crate) fn insert_goal(conn: &Connection, g: &Goal) -> Result<()> {
    conn.execute(
        "INSERT INTO goals (id, user_id, title, category, confidence, commitment_level,
            target_timeframe, target_date, motivation, created_at, is_active)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            g.id,
            g.user_id,
            g.title,
            g.category,
            g.confidence,
            g.commitment_level,
            g.target_timeframe,
            g.target_date,
            g.motivation,
            g.created_at,
            g.is_active as i64,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_active_goals(conn: &Connection, user_id: &str) -> Result<Vec<Goal>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = ?1 AND is_active = 1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], row_to_goal)?;
    rows.collect()
}

/// Active goals whose title already matches (case-insensitively), used to
/// avoid re-inserting the same goal on repeated mentions.
pub(crate) fn find_goal_by_title(conn: &Connection, user_id: &str, title: &str) -> Result<Option<Goal>> {
    conn.query_row(
        &format!(
            "SELECT {GOAL_COLUMNS} FROM goals
             WHERE user_id = ?1 AND is_active = 1 AND lower(title) = lower(?2)"
        ),
        params![user_id, title],
        row_to_goal,
    )
    .optional()
}

pub(crate) fn deactivate_goal(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("UPDATE goals SET is_active = 0 WHERE id = ?1", params![id])?;
    Ok(())
}

fn row_to_emotion_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmotionRecord> {
    let intensity_str: String = row.get(5)?;
    let indicators_json: String = row.get(6)?;
    Ok(EmotionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        conversation_id: row.get(2)?,
        emotion: row.get(3)?,
        confidence: row.get(4)?,
        intensity: EmotionIntensity::from_str(&intensity_str),
        indicators: serde_json::from_str(&indicators_json).unwrap_or_default(),
        snippet: row.get(7)?,
        detected_at: row.get(8)?,
    })
}

pub(crate) fn insert_emotion_record(conn: &Connection, e: &EmotionRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO emotion_records (id, user_id, conversation_id, emotion, confidence, intensity, indicators, snippet, detected_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![
            e.id,
            e.user_id,
            e.conversation_id,
            e.emotion,
            e.confidence,
            e.intensity.as_str(),
            serde_json::to_string(&e.indicators).unwrap(),
            e.snippet,
            e.detected_at,
        ],
    )?;
    Ok(())
}

/// Most recent records first, for trend computation (spec §4.6 emotion
/// detector context).
pub(crate) fn recent_emotion_records(conn: &Connection, user_id: &str, conversation_id: &str, limit: u32) -> Result<Vec<EmotionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, conversation_id, emotion, confidence, intensity, indicators, snippet, detected_at
         FROM emotion_records WHERE user_id = ?1 AND conversation_id = ?2 ORDER BY detected_at DESC LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![user_id, conversation_id, limit], row_to_emotion_record)?;
    rows.collect()
}

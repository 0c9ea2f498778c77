use std::sync::Mutex;

use rusqlite::Connection;
use skynet_detectors::{ContradictionDetector, DetectorLlm};
use skynet_embedder::Embedder;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db;
use crate::error::Result;
use crate::scoring;
use crate::types::{EmotionIntensity, EmotionRecord, Goal, ImportanceSubscores, Memory, MemoryCategory, RelatedEntities};

/// C8 — store + retrieve with importance scoring, categorization,
/// contradiction-driven supersedence (spec §4.5). Also owns C1's embedding
/// step for the write path (spec §4.5 step 1: "Embed the new memory").
pub struct MemoryEngine {
    db: Mutex<Connection>,
    embedder: Box<dyn Embedder>,
    contradiction_similarity_threshold: f64,
    contradiction_confidence_threshold: f64,
    retrieval_top_k: usize,
    retrieval_similarity_floor: f64,
    retrieval_alpha: f64,
    retrieval_beta: f64,
}

impl MemoryEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conn: Connection,
        embedder: Box<dyn Embedder>,
        contradiction_similarity_threshold: f64,
        contradiction_confidence_threshold: f64,
        retrieval_top_k: usize,
        retrieval_similarity_floor: f64,
        retrieval_alpha: f64,
        retrieval_beta: f64,
    ) -> Self {
        Self {
            db: Mutex::new(conn),
            embedder,
            contradiction_similarity_threshold,
            contradiction_confidence_threshold,
            retrieval_top_k,
            retrieval_similarity_floor,
            retrieval_alpha,
            retrieval_beta,
        }
    }

    /// Store a new memory, running the contradiction check against active
    /// memories of the same category for the same (user, personality)
    /// (spec §4.5 "Contradiction check (on write)").
    #[instrument(skip(self, llm), fields(user_id, personality_id, ?category))]
    pub async fn store(
        &self,
        user_id: &str,
        personality_id: &str,
        conversation_id: &str,
        content: &str,
        category: MemoryCategory,
        is_shared: bool,
        emotion_confidence: Option<f64>,
        llm: Option<&dyn DetectorLlm>,
    ) -> Result<Memory> {
        let embedding = self
            .embedder
            .embed(content)
            .await
            .map_err(|e| crate::error::MemoryError::NotFound(format!("embed failed: {e}")))?;

        let related_entities = scoring::extract_entities(content);
        let explicit_mention = scoring::explicit_mention(content);
        let subscores = ImportanceSubscores {
            emotional_significance: scoring::emotional_significance(content, emotion_confidence),
            explicit_mention,
            frequency_referenced: scoring::frequency_referenced(0),
            recency: scoring::recency_score(0.0, explicit_mention),
            specificity: scoring::specificity(content, &related_entities),
            personal_relevance: scoring::personal_relevance(content, &related_entities),
        };
        let importance = scoring::blend(subscores);

        let now = chrono::Utc::now().to_rfc3339();
        let new_id = Uuid::now_v7().to_string();

        let memory = Memory {
            id: new_id.clone(),
            user_id: user_id.to_string(),
            personality_id: personality_id.to_string(),
            conversation_id: conversation_id.to_string(),
            content: content.to_string(),
            embedding: embedding.0.clone(),
            category,
            importance_subscores: subscores,
            importance,
            created_at: now.clone(),
            updated_at: now.clone(),
            last_accessed: now,
            access_count: 0,
            decay_factor: 1.0,
            is_active: true,
            superseded_by: None,
            consolidated_from: Vec::new(),
            related_entities,
            is_shared,
        };

        self.check_contradiction_and_supersede(user_id, personality_id, category, &memory, llm)
            .await?;

        let db = self.db.lock().unwrap();
        db::insert(&db, &memory)?;
        Ok(memory)
    }

    /// Only the first matching candidate per new memory triggers
    /// supersedence (spec §4.5 step 4).
    async fn check_contradiction_and_supersede(
        &self,
        user_id: &str,
        personality_id: &str,
        category: MemoryCategory,
        new_memory: &Memory,
        llm: Option<&dyn DetectorLlm>,
    ) -> Result<()> {
        let candidates = {
            let db = self.db.lock().unwrap();
            db::find_active_by_category(&db, user_id, personality_id, category)?
        };

        let judge = ContradictionDetector;
        let new_embedding = skynet_embedder::Embedding(new_memory.embedding.clone());

        for candidate in candidates {
            let candidate_embedding = skynet_embedder::Embedding(candidate.embedding.clone());
            let similarity = new_embedding.cosine_similarity(&candidate_embedding);
            if similarity < self.contradiction_similarity_threshold {
                continue;
            }
            let verdict = judge.judge(llm, &candidate.content, &new_memory.content).await;
            if verdict.is_contradiction && verdict.confidence >= self.contradiction_confidence_threshold {
                let db = self.db.lock().unwrap();
                db::mark_superseded(&db, &candidate.id, &new_memory.id)?;
                info!(old = %candidate.id, new = %new_memory.id, "memory superseded");
                break;
            }
        }
        Ok(())
    }

    /// `retrieve(user, personality, query_text, k)` (spec §4.5 Retrieval).
    #[instrument(skip(self), fields(user_id, personality_id))]
    pub async fn retrieve(&self, user_id: &str, personality_id: &str, query_text: &str) -> Result<Vec<Memory>> {
        let query_embedding = self
            .embedder
            .embed(query_text)
            .await
            .map_err(|e| crate::error::MemoryError::NotFound(format!("embed failed: {e}")))?;

        let candidates = {
            let db = self.db.lock().unwrap();
            db::find_retrieval_candidates(&db, user_id, personality_id)?
        };

        let now = chrono::Utc::now();
        let mut scored: Vec<(f64, Memory)> = candidates
            .into_iter()
            .filter_map(|m| {
                let embedding = skynet_embedder::Embedding(m.embedding.clone());
                let similarity = query_embedding.cosine_similarity(&embedding);
                if similarity < self.retrieval_similarity_floor {
                    return None;
                }
                let days = chrono::DateTime::parse_from_rfc3339(&m.created_at)
                    .map(|d| now.signed_duration_since(d.with_timezone(&chrono::Utc)).num_seconds() as f64 / 86400.0)
                    .unwrap_or(0.0);
                let decay = scoring::temporal_decay(days.max(0.0));
                let score = self.retrieval_alpha * similarity + self.retrieval_beta * m.importance * decay;
                Some((score, m))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.retrieval_top_k);

        let results: Vec<Memory> = scored.into_iter().map(|(_, m)| m).collect();

        let db = self.db.lock().unwrap();
        let now_str = now.to_rfc3339();
        for m in &results {
            db::touch_access(&db, &m.id, &now_str)?;
        }
        Ok(results)
    }

    pub fn get(&self, id: &str) -> Result<Option<Memory>> {
        let db = self.db.lock().unwrap();
        db::find_by_id(&db, id)
    }
}

/// C3 — per-conversation rolling window of recent messages.
pub struct ShortTermBuffer {
    db: Mutex<Connection>,
    max_messages: u32,
}

impl ShortTermBuffer {
    pub fn new(conn: Connection, max_messages: u32) -> Self {
        Self {
            db: Mutex::new(conn),
            max_messages,
        }
    }

    pub fn append(&self, conversation_id: &str, role: &str, content: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db::insert_short_term(&db, conversation_id, role, content, &chrono::Utc::now().to_rfc3339())
    }

    /// Oldest-first, capped at `max_messages`.
    pub fn recent(&self, conversation_id: &str) -> Result<Vec<crate::types::BufferedMessage>> {
        let db = self.db.lock().unwrap();
        let rows = db::recent_short_term(&db, conversation_id, self.max_messages)?;
        Ok(rows
            .into_iter()
            .map(|(role, content, created_at)| crate::types::BufferedMessage { role, content, created_at })
            .collect())
    }

    /// Background extraction requires at least `min_turns` user turns
    /// (spec §6 `background.memory_extraction_min_turns`, default 3).
    pub fn turn_count(&self, conversation_id: &str) -> Result<u32> {
        let db = self.db.lock().unwrap();
        db::count_short_term_turns(&db, conversation_id)
    }
}

/// Persisted personal goals (spec §3 Goal). A thin store, not an
/// importance-scored engine like `MemoryEngine` — goals are detected
/// once and tracked to completion, not re-ranked or superseded.
pub struct GoalStore {
    db: Mutex<Connection>,
}

impl GoalStore {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    /// Record a detected goal. A repeated mention of the same (case
    /// insensitive) title for an active goal is a no-op, returning the
    /// existing row rather than duplicating it.
    #[instrument(skip(self), fields(user_id))]
    pub fn record(
        &self,
        user_id: &str,
        title: &str,
        category: &str,
        confidence: f64,
        commitment_level: f64,
        target_timeframe: Option<String>,
        motivation: Option<String>,
    ) -> Result<Goal> {
        let db = self.db.lock().unwrap();
        if let Some(existing) = db::find_goal_by_title(&db, user_id, title)? {
            return Ok(existing);
        }
        let goal = Goal {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            confidence,
            commitment_level,
            target_timeframe,
            target_date: None,
            motivation,
            created_at: chrono::Utc::now().to_rfc3339(),
            is_active: true,
        };
        db::insert_goal(&db, &goal)?;
        info!(goal_id = %goal.id, "goal recorded");
        Ok(goal)
    }

    pub fn list_active(&self, user_id: &str) -> Result<Vec<Goal>> {
        let db = self.db.lock().unwrap();
        db::find_active_goals(&db, user_id)
    }

    pub fn deactivate(&self, id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db::deactivate_goal(&db, id)
    }
}

/// Append-only log of detected emotions (spec §3 EmotionRecord). The
/// originating message is never stored in full — only a truncated
/// `snippet` (invariant I4).
pub struct EmotionLog {
    db: Mutex<Connection>,
}

const SNIPPET_MAX_CHARS: usize = 100;

impl EmotionLog {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    #[instrument(skip(self, source_message), fields(user_id, conversation_id))]
    pub fn record(
        &self,
        user_id: &str,
        conversation_id: &str,
        emotion: &str,
        confidence: f64,
        intensity: EmotionIntensity,
        indicators: Vec<String>,
        source_message: &str,
    ) -> Result<EmotionRecord> {
        let snippet: String = source_message.chars().take(SNIPPET_MAX_CHARS).collect();
        let record = EmotionRecord {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            conversation_id: conversation_id.to_string(),
            emotion: emotion.to_string(),
            confidence,
            intensity,
            indicators,
            snippet,
            detected_at: chrono::Utc::now().to_rfc3339(),
        };
        let db = self.db.lock().unwrap();
        db::insert_emotion_record(&db, &record)?;
        Ok(record)
    }

    /// Most recent first, for trend context fed back into the emotion
    /// detector (spec §4.6 `DetectorContext`).
    pub fn recent(&self, user_id: &str, conversation_id: &str, limit: u32) -> Result<Vec<EmotionRecord>> {
        let db = self.db.lock().unwrap();
        db::recent_emotion_records(&db, user_id, conversation_id, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skynet_embedder::DeterministicEmbedder;

    fn engine() -> MemoryEngine {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        MemoryEngine::new(conn, Box::new(DeterministicEmbedder::new(64)), 0.40, 0.70, 5, 0.25, 0.7, 0.3)
    }

    #[tokio::test]
    async fn contradiction_supersedes_the_older_memory() {
        let engine = engine();
        let first = engine
            .store("u1", "p1", "c1", "I like chocolate", MemoryCategory::Preference, false, None, None)
            .await
            .unwrap();
        let second = engine
            .store("u1", "p1", "c1", "I don't like chocolate", MemoryCategory::Preference, false, None, None)
            .await
            .unwrap();

        let reloaded_first = engine.get(&first.id).unwrap().unwrap();
        assert!(!reloaded_first.is_active);
        assert_eq!(reloaded_first.superseded_by.as_deref(), Some(second.id.as_str()));
    }

    #[tokio::test]
    async fn retrieval_only_returns_active_memories_for_owner() {
        let engine = engine();
        engine
            .store("u1", "p1", "c1", "I work at Google", MemoryCategory::PersonalFact, false, None, None)
            .await
            .unwrap();

        let results = engine.retrieve("u1", "p2", "where do I work?").await.unwrap();
        assert!(results.is_empty(), "different personality must not see the memory");

        let results = engine.retrieve("u1", "p1", "where do I work?").await.unwrap();
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn shared_memory_is_visible_across_personalities() {
        let engine = engine();
        engine
            .store("u1", "p1", "c1", "I was born in 1990", MemoryCategory::PersonalFact, true, None, None)
            .await
            .unwrap();

        let results = engine.retrieve("u1", "p2", "when was I born?").await.unwrap();
        assert!(!results.is_empty(), "is_shared memory must be visible under a different personality");
    }

    #[test]
    fn short_term_buffer_respects_max_messages() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        let buffer = ShortTermBuffer::new(conn, 2);
        buffer.append("c1", "user", "first").unwrap();
        buffer.append("c1", "assistant", "second").unwrap();
        buffer.append("c1", "user", "third").unwrap();

        let recent = buffer.recent("c1").unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "second");
        assert_eq!(recent[1].content, "third");
    }

    #[test]
    fn turn_count_only_counts_user_messages() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        let buffer = ShortTermBuffer::new(conn, 20);
        buffer.append("c1", "user", "hi").unwrap();
        buffer.append("c1", "assistant", "hello").unwrap();
        buffer.append("c1", "user", "how are you").unwrap();

        assert_eq!(buffer.turn_count("c1").unwrap(), 2);
    }

    fn goal_store() -> GoalStore {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        GoalStore::new(conn)
    }

    #[test]
    fn repeated_goal_title_does_not_duplicate() {
        let store = goal_store();
        let first = store.record("u1", "learn Spanish", "general", 0.7, 0.5, None, None).unwrap();
        let second = store.record("u1", "Learn Spanish", "general", 0.6, 0.4, None, None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_active("u1").unwrap().len(), 1);
    }

    #[test]
    fn deactivated_goal_is_excluded_from_active_list() {
        let store = goal_store();
        let goal = store.record("u1", "run a marathon", "health", 0.8, 0.9, None, None).unwrap();
        store.deactivate(&goal.id).unwrap();
        assert!(store.list_active("u1").unwrap().is_empty());
    }

    fn emotion_log() -> EmotionLog {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        EmotionLog::new(conn)
    }

    #[test]
    fn snippet_is_truncated_to_100_chars() {
        let log = emotion_log();
        let long_message = "a".repeat(500);
        let record = log
            .record("u1", "c1", "joy", 0.9, EmotionIntensity::High, vec!["thrilled".to_string()], &long_message)
            .unwrap();
        assert_eq!(record.snippet.chars().count(), 100);
    }

    #[test]
    fn recent_returns_newest_first() {
        let log = emotion_log();
        log.record("u1", "c1", "joy", 0.9, EmotionIntensity::High, vec![], "I'm so happy").unwrap();
        log.record("u1", "c1", "sadness", 0.8, EmotionIntensity::Med, vec![], "feeling down now").unwrap();

        let recent = log.recent("u1", "c1", 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].emotion, "sadness");
    }
}

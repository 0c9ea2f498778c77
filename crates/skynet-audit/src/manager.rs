use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{error, instrument};

use crate::db;
use crate::types::{AuditRecord, AuditStats};

/// C11 — append-only audit writer + aggregate read (spec §4.8).
///
/// Grounded on the teacher's per-concern small-crate split (`skynet-sessions`
/// is its own crate despite being small) and `skynet-memory`'s db.rs init
/// pattern: one `Mutex<Connection>`, no in-process cache (every write must
/// land, nothing here is safe to lose on restart).
pub struct AuditLog {
    db: Mutex<Connection>,
}

impl AuditLog {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    /// Spec §4.8: "Write must not fail the request (errors are logged, not
    /// propagated)". Callers in the orchestrator call this and ignore the
    /// return value other than for logging — it never surfaces as an
    /// `error` event.
    #[instrument(skip(self, record), fields(conversation_id = %record.conversation_id, ?record.label, ?record.action))]
    pub fn record(&self, mut record: AuditRecord) {
        record.original_text = AuditRecord::truncate_original_text(&record.original_text);
        let db = self.db.lock().unwrap();
        if let Err(e) = db::insert(&db, &record) {
            error!(error = %e, "failed to write audit record");
        }
    }

    pub fn recent_for_conversation(&self, conversation_id: &str, limit: u32) -> crate::error::Result<Vec<AuditRecord>> {
        let db = self.db.lock().unwrap();
        Ok(db::recent_for_conversation(&db, conversation_id, limit)?)
    }

    /// Aggregate counts by label/route/action (spec §6 "Audit stats endpoint").
    pub fn stats(&self) -> crate::error::Result<AuditStats> {
        let db = self.db.lock().unwrap();
        let (by_label, by_route, by_action) = db::stats(&db)?;
        Ok(AuditStats { by_label, by_route, by_action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuditAction;
    use skynet_classifier::types::{Label, Route};

    fn setup() -> AuditLog {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        AuditLog::new(conn)
    }

    fn sample(conversation_id: &str, label: Label, action: AuditAction) -> AuditRecord {
        AuditRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            conversation_id: conversation_id.to_string(),
            user_id: "u1".to_string(),
            original_text: "hello".to_string(),
            normalized_text: "hello".to_string(),
            label,
            confidence: 0.9,
            indicators: vec![],
            route: Route::Normal,
            route_locked: false,
            age_verified: false,
            action,
            layer_trace: vec!["pattern_score".to_string()],
        }
    }

    #[test]
    fn every_classification_is_recorded_and_retrievable() {
        let log = setup();
        log.record(sample("c1", Label::Safe, AuditAction::Generate));
        log.record(sample("c1", Label::MinorRisk, AuditAction::Refuse));

        let recent = log.recent_for_conversation("c1", 10).unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn stats_counts_by_label_route_action() {
        let log = setup();
        log.record(sample("c1", Label::Safe, AuditAction::Generate));
        log.record(sample("c1", Label::Safe, AuditAction::Generate));
        log.record(sample("c2", Label::MinorRisk, AuditAction::Refuse));

        let stats = log.stats().unwrap();
        let safe_count = stats.by_label.iter().find(|e| e.key == "safe").unwrap().count;
        assert_eq!(safe_count, 2);
        let refuse_count = stats.by_action.iter().find(|e| e.key == "refuse").unwrap().count;
        assert_eq!(refuse_count, 1);
    }

    #[test]
    fn original_text_is_truncated_on_write() {
        let log = setup();
        let mut rec = sample("c1", Label::Safe, AuditAction::Generate);
        rec.original_text = "x".repeat(1000);
        log.record(rec);

        let recent = log.recent_for_conversation("c1", 1).unwrap();
        assert!(recent[0].original_text.chars().count() <= 500);
    }
}

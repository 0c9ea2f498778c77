use rusqlite::{params, Connection, Result};
use skynet_classifier::types::{Label, Route};

use crate::types::{AuditAction, AuditRecord, CountEntry};

/// Initialise the audit table. Safe to call on every startup. Append-only
/// (spec §6: "the audit log is append-only (row per decision)") — no
/// update/delete statements exist anywhere in this module. `timestamp` is
/// indexed per spec §6's "required `timestamp` index".
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS audit_records (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp         TEXT NOT NULL,
            conversation_id   TEXT NOT NULL,
            user_id           TEXT NOT NULL,
            original_text     TEXT NOT NULL,
            normalized_text   TEXT NOT NULL,
            label             TEXT NOT NULL,
            confidence        REAL NOT NULL,
            indicators        TEXT NOT NULL,
            route             TEXT NOT NULL,
            route_locked      INTEGER NOT NULL,
            age_verified      INTEGER NOT NULL,
            action            TEXT NOT NULL,
            layer_trace       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_records(timestamp);
        CREATE INDEX IF NOT EXISTS idx_audit_conversation ON audit_records(conversation_id);",
    )
}

pub(crate) fn insert(conn: &Connection, record: &AuditRecord) -> Result<()> {
    let indicators_json = serde_json::to_string(&record.indicators).unwrap_or_else(|_| "[]".to_string());
    let layer_trace_json = serde_json::to_string(&record.layer_trace).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO audit_records
         (timestamp, conversation_id, user_id, original_text, normalized_text,
          label, confidence, indicators, route, route_locked, age_verified, action, layer_trace)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
        params![
            record.timestamp,
            record.conversation_id,
            record.user_id,
            record.original_text,
            record.normalized_text,
            record.label.to_string(),
            record.confidence,
            indicators_json,
            record.route.to_string(),
            record.route_locked as i64,
            record.age_verified as i64,
            record.action.as_str(),
            layer_trace_json,
        ],
    )?;
    Ok(())
}

fn label_from_str(s: &str) -> Option<Label> {
    Some(match s {
        "safe" => Label::Safe,
        "suggestive" => Label::Suggestive,
        "explicit_consensual_adult" => Label::ExplicitConsensualAdult,
        "explicit_fetish" => Label::ExplicitFetish,
        "nonconsensual" => Label::Nonconsensual,
        "minor_risk" => Label::MinorRisk,
        _ => return None,
    })
}

fn route_from_str(s: &str) -> Option<Route> {
    Some(match s {
        "normal" => Route::Normal,
        "romance" => Route::Romance,
        "explicit" => Route::Explicit,
        "fetish" => Route::Fetish,
        "refusal" => Route::Refusal,
        "hard_refusal" => Route::HardRefusal,
        _ => return None,
    })
}

pub(crate) fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    let label_str: String = row.get(5)?;
    let indicators_json: String = row.get(7)?;
    let route_str: String = row.get(8)?;
    let action_str: String = row.get(11)?;
    let layer_trace_json: String = row.get(12)?;
    Ok(AuditRecord {
        timestamp: row.get(0)?,
        conversation_id: row.get(1)?,
        user_id: row.get(2)?,
        original_text: row.get(3)?,
        normalized_text: row.get(4)?,
        label: label_from_str(&label_str).unwrap_or(Label::Safe),
        confidence: row.get(6)?,
        indicators: serde_json::from_str(&indicators_json).unwrap_or_default(),
        route: route_from_str(&route_str).unwrap_or(Route::Normal),
        route_locked: row.get::<_, i64>(9)? != 0,
        age_verified: row.get::<_, i64>(10)? != 0,
        action: AuditAction::from_str(&action_str).unwrap_or(AuditAction::Generate),
        layer_trace: serde_json::from_str(&layer_trace_json).unwrap_or_default(),
    })
}

pub(crate) fn recent_for_conversation(conn: &Connection, conversation_id: &str, limit: u32) -> Result<Vec<AuditRecord>> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, conversation_id, user_id, original_text, normalized_text,
                label, confidence, indicators, route, route_locked, age_verified, action, layer_trace
         FROM audit_records WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![conversation_id, limit], row_to_record)?;
    rows.collect()
}

fn count_by(conn: &Connection, column: &str) -> Result<Vec<CountEntry>> {
    // `column` is never user input — it's one of a fixed internal set
    // passed from `stats()` below, so string interpolation here is safe.
    let sql = format!("SELECT {column}, COUNT(*) FROM audit_records GROUP BY {column} ORDER BY {column}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(CountEntry {
            key: row.get(0)?,
            count: row.get::<_, i64>(1)? as u64,
        })
    })?;
    rows.collect()
}

pub(crate) fn stats(conn: &Connection) -> Result<(Vec<CountEntry>, Vec<CountEntry>, Vec<CountEntry>)> {
    Ok((
        count_by(conn, "label")?,
        count_by(conn, "route")?,
        count_by(conn, "action")?,
    ))
}

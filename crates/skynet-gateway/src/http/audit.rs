//! `GET /audit/stats` — aggregate counts by label/route/action (spec §6,
//! §4.8 "aggregate read for operational monitoring").

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use skynet_protocol::dto::{AuditStatsResponse, CountEntry};

use crate::app::AppState;
use crate::auth::resolve_external_user_id;

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub async fn audit_stats_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AuditStatsResponse>, (StatusCode, Json<ErrorBody>)> {
    if resolve_external_user_id(&state, &headers).is_none() {
        return Err((StatusCode::UNAUTHORIZED, Json(ErrorBody { error: "missing or invalid credentials".to_string() })));
    }

    let stats = state
        .orchestrator
        .audit
        .stats()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))?;

    let to_entries = |v: Vec<skynet_audit::CountEntry>| -> Vec<CountEntry> {
        v.into_iter().map(|e| CountEntry { key: e.key, count: e.count }).collect()
    };

    Ok(Json(AuditStatsResponse {
        by_label: to_entries(stats.by_label),
        by_route: to_entries(stats.by_route),
        by_action: to_entries(stats.by_action),
    }))
}

//! `GET /session/{conversation_id}` — read-only session view (spec §6).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use skynet_protocol::dto::SessionView;

use crate::app::AppState;
use crate::auth::resolve_external_user_id;

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<Json<SessionView>, (StatusCode, Json<ErrorBody>)> {
    let external_user_id = resolve_external_user_id(&state, &headers).ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, Json(ErrorBody { error: "missing or invalid credentials".to_string() }))
    })?;

    let user = state.orchestrator.users.resolve(&external_user_id).map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() }))
    })?;

    // spec §7 AuthError must "never leak whether the target resource
    // exists" — a missing conversation and one owned by another user
    // collapse into the same status/body.
    let not_authorized = || (StatusCode::FORBIDDEN, Json(ErrorBody { error: "not authorized for this conversation".to_string() }));
    let conversation = state.orchestrator.conversations.get(&conversation_id).map_err(|_| not_authorized())?;
    if conversation.user_id != user.id {
        return Err(not_authorized());
    }

    let session = state
        .orchestrator
        .sessions
        .peek(&conversation_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() })))?;

    let view = match session {
        Some(s) => SessionView {
            conversation_id: s.conversation_id,
            current_route: s.current_route.to_string(),
            route_lock_counter: s.route_lock_counter,
            age_verified: s.age_verified,
        },
        None => SessionView {
            conversation_id,
            current_route: "normal".to_string(),
            route_lock_counter: 0,
            age_verified: false,
        },
    };

    Ok(Json(view))
}

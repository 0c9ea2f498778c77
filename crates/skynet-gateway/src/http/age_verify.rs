//! `POST /age-verify` (spec §6). Flips `age_verified` for a conversation;
//! idempotent (R1: two consecutive `confirmed:true` calls yield the same
//! `age_verified_at`).

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use skynet_protocol::dto::{AgeVerifyRequest, AgeVerifyResponse};

use crate::app::AppState;
use crate::auth::resolve_external_user_id;

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub async fn age_verify_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AgeVerifyRequest>,
) -> Result<Json<AgeVerifyResponse>, (StatusCode, Json<ErrorBody>)> {
    let external_user_id = resolve_external_user_id(&state, &headers).ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, Json(ErrorBody { error: "missing or invalid credentials".to_string() }))
    })?;

    let user = state.orchestrator.users.resolve(&external_user_id).map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() }))
    })?;

    // spec §6: "requires that the session's owning user matches the
    // caller" — spec §7 AuthError must "never leak whether the target
    // resource exists", so a missing conversation and one owned by another
    // user collapse into the same status/body.
    let not_authorized = || (StatusCode::FORBIDDEN, Json(ErrorBody { error: "not authorized for this conversation".to_string() }));
    let conversation = state.orchestrator.conversations.get(&req.conversation_id).map_err(|_| not_authorized())?;
    if conversation.user_id != user.id {
        return Err(not_authorized());
    }

    let session = state.orchestrator.sessions.verify_age(&req.conversation_id, req.confirmed).map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() }))
    })?;

    Ok(Json(AgeVerifyResponse { success: true, age_verified: session.age_verified }))
}

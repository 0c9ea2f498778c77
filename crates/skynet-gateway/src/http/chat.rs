//! `POST /chat` — the streaming chat endpoint (spec §6).
//!
//! Response body is a stream of newline-delimited JSON `ChatEvent`
//! records (`thinking`/`chunk`/`age_verification_required`/`refusal`/
//! `done`/`error`), one per line, flushed as the orchestrator produces
//! them — no buffering of the whole response.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use futures_util::StreamExt;
use skynet_protocol::dto::ChatRequest;
use tracing::warn;

use crate::app::AppState;
use crate::auth::resolve_external_user_id;

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let external_user_id = resolve_external_user_id(&state, &headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody { error: "missing or invalid credentials".to_string() }),
        )
    })?;

    // B2: empty/whitespace-only message rejected before classification.
    if req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody { error: "message cannot be empty".to_string() }),
        ));
    }

    let orchestrator = state.orchestrator.clone();
    let events = skynet_orchestrator::stream_chat(
        orchestrator,
        external_user_id,
        req.conversation_id,
        req.personality_name,
        req.message,
    );

    let body_stream = events.map(|event| {
        let mut line = serde_json::to_vec(&event).unwrap_or_default();
        line.push(b'\n');
        Ok::<_, std::io::Error>(line)
    });

    let response = axum::response::Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/x-ndjson")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build streaming response");
            axum::response::Response::new(Body::empty())
        });

    Ok(response)
}

//! `POST /classify-debug` — classify without generation (spec §6, "for
//! platform review"). Does not touch session state: the chosen route here
//! reflects today's fresh label, not any route lock in force for a real
//! conversation.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use skynet_classifier::router::label_to_route;
use skynet_protocol::dto::{ClassifyDebugRequest, ClassifyDebugResponse};

use crate::app::AppState;
use crate::auth::resolve_external_user_id;

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub async fn classify_debug_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ClassifyDebugRequest>,
) -> Result<Json<ClassifyDebugResponse>, (StatusCode, Json<ErrorBody>)> {
    if resolve_external_user_id(&state, &headers).is_none() {
        return Err((StatusCode::UNAUTHORIZED, Json(ErrorBody { error: "missing or invalid credentials".to_string() })));
    }

    if req.text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(ErrorBody { error: "text cannot be empty".to_string() })));
    }

    let result = state.orchestrator.classifier.classify(&req.text).await;
    let route = label_to_route(result.label);

    Ok(Json(ClassifyDebugResponse {
        label: result.label.to_string(),
        confidence: result.confidence,
        indicators: result.indicators,
        route: route.to_string(),
    }))
}

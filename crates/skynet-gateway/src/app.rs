use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use skynet_core::config::SkynetConfig;
use skynet_orchestrator::OrchestratorState;

/// Central shared state — every handler receives `Arc<AppState>` (spec §5:
/// "shared behind `Arc` across requests"). `config` carries the auth
/// settings the gateway itself owns (bearer token, debug header); every
/// other concern lives behind `orchestrator`.
pub struct AppState {
    pub config: SkynetConfig,
    pub orchestrator: Arc<OrchestratorState>,
}

impl AppState {
    pub fn new(config: SkynetConfig, orchestrator: Arc<OrchestratorState>) -> Self {
        Self { config, orchestrator }
    }
}

/// Assemble the full Axum router — one route per spec §6 external interface.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/chat", post(crate::http::chat::chat_handler))
        .route("/age-verify", post(crate::http::age_verify::age_verify_handler))
        .route(
            "/personalities",
            get(crate::http::personality::list_handler).post(crate::http::personality::create_handler),
        )
        .route(
            "/personalities/{name}",
            get(crate::http::personality::get_handler)
                .put(crate::http::personality::update_handler)
                .delete(crate::http::personality::delete_handler),
        )
        .route("/session/{conversation_id}", get(crate::http::session::session_handler))
        .route("/classify-debug", post(crate::http::classify_debug::classify_debug_handler))
        .route("/audit/stats", get(crate::http::audit::audit_stats_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

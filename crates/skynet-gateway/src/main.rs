use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use skynet_agent::anthropic::AnthropicProvider;
use skynet_agent::provider::LlmProvider;
use skynet_agent::router::{ProviderRouter, ProviderSlot};
use skynet_audit::AuditLog;
use skynet_background::BackgroundEngine;
use skynet_classifier::judge::JudgeProvider;
use skynet_classifier::ContentClassifier;
use skynet_embedder::DeterministicEmbedder;
use skynet_memory::{EmotionLog, GoalStore, MemoryEngine, ShortTermBuffer};
use skynet_orchestrator::{AgentLlmAdapter, OrchestratorState, RouteProviders};
use skynet_personality::PersonalityManager;
use skynet_sessions::SessionManager;
use skynet_users::{ConversationStore, UserResolver};

mod app;
mod auth;
mod http;

/// Opens a fresh connection to the single configured sqlite file, creating
/// its parent directory on first run. Every manager gets its own
/// `Connection` (rusqlite connections aren't `Sync`) onto the same file —
/// sqlite tolerates multiple connections to one database.
fn open_connection(path: &str) -> rusqlite::Result<Connection> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    Connection::open(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skynet_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path > SKYNET_CONFIG env > ~/.skynet/skynet.toml
    let config_path = std::env::var("SKYNET_CONFIG").ok();
    let config = skynet_core::config::SkynetConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        skynet_core::config::SkynetConfig::default()
    });

    let db_path = config.database.path.clone();

    let users = Arc::new(UserResolver::new(open_connection(&db_path)?));
    skynet_users::db::init_db(&open_connection(&db_path)?)?;
    let conversations = Arc::new(ConversationStore::new(open_connection(&db_path)?));

    let sessions_conn = open_connection(&db_path)?;
    skynet_sessions::db::init_db(&sessions_conn)?;
    let sessions = Arc::new(SessionManager::new(
        sessions_conn,
        config.session.route_lock_messages,
        config.session.timeout_hours,
    ));

    let personality_conn = open_connection(&db_path)?;
    skynet_personality::db::init_db(&personality_conn)?;
    let personalities = Arc::new(PersonalityManager::new(
        personality_conn,
        config.personality.relationship_milestones.clone(),
    ));

    let memory_conn = open_connection(&db_path)?;
    skynet_memory::db::init_db(&memory_conn)?;
    let embedder: Box<dyn skynet_embedder::Embedder> = Box::new(DeterministicEmbedder::new(config.embedding.dimension));
    let memory = Arc::new(MemoryEngine::new(
        memory_conn,
        embedder,
        config.memory.contradiction.similarity_threshold,
        config.memory.contradiction.confidence_threshold,
        config.memory.retrieval.top_k,
        config.memory.retrieval.similarity_floor,
        config.memory.retrieval.alpha,
        config.memory.retrieval.beta,
    ));

    let short_term_conn = open_connection(&db_path)?;
    skynet_memory::db::init_db(&short_term_conn)?;
    let short_term = Arc::new(ShortTermBuffer::new(short_term_conn, config.short_term.max_messages as u32));

    let goals_conn = open_connection(&db_path)?;
    skynet_memory::db::init_db(&goals_conn)?;
    let goals = Arc::new(GoalStore::new(goals_conn));

    let emotions_conn = open_connection(&db_path)?;
    skynet_memory::db::init_db(&emotions_conn)?;
    let emotions = Arc::new(EmotionLog::new(emotions_conn));

    let audit_conn = open_connection(&db_path)?;
    skynet_audit::db::init_db(&audit_conn)?;
    let audit = Arc::new(AuditLog::new(audit_conn));

    let (background, background_engine) =
        BackgroundEngine::new(config.background.queue_capacity, num_cpus_hint());
    let background_shutdown = CancellationToken::new();
    {
        let shutdown = background_shutdown.clone();
        let drain = Duration::from_secs(config.background.shutdown_drain_secs);
        tokio::spawn(background_engine.run(shutdown, drain));
    }

    let anthropic_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    if anthropic_key.is_empty() {
        warn!("ANTHROPIC_API_KEY not set — generation calls will fail until configured");
    }
    let anthropic = AnthropicProvider::new(anthropic_key, std::env::var("ANTHROPIC_BASE_URL").ok());
    let provider: Arc<dyn LlmProvider> =
        Arc::new(ProviderRouter::new(vec![ProviderSlot::new(Box::new(anthropic), 1)]));
    let providers = RouteProviders::uniform(provider.clone());

    let judge: Option<Arc<dyn JudgeProvider>> = if config.classifier.llm_judge.enabled {
        Some(Arc::new(AgentLlmAdapter::new(provider.clone(), config.orchestrator.detector_model.clone())))
    } else {
        None
    };
    let classifier = Arc::new(ContentClassifier::new(
        judge,
        config.classifier.llm_judge.enabled,
        config.classifier.llm_judge.confidence_threshold,
        2048,
    ));

    let orchestrator = Arc::new(OrchestratorState::new(
        users,
        conversations,
        short_term,
        classifier,
        sessions,
        personalities,
        memory,
        goals,
        emotions,
        audit,
        background,
        providers,
        "claude-3-5-sonnet-20241022".to_string(),
        config.detector.clone(),
        config.orchestrator.clone(),
        config.background.memory_extraction_min_turns,
    ));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, orchestrator));
    let router = app::build_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Skynet gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    background_shutdown.cancel();

    Ok(())
}

fn num_cpus_hint() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

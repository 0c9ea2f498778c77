use std::sync::Arc;

use skynet_agent::provider::LlmProvider;
use skynet_audit::AuditLog;
use skynet_background::BackgroundHandle;
use skynet_classifier::types::Route;
use skynet_classifier::ContentClassifier;
use skynet_core::config::{DetectorConfig as CoreDetectorConfig, DetectorMethod as CoreDetectorMethod, OrchestratorConfig};
use skynet_detectors::types::DetectorMethod;
use skynet_detectors::{
    DetectorLlm, EmotionDetector, EmotionResult, ExtractedFact, GoalCandidate, GoalDetector, HybridDetector,
    MemoryExtractionDetector, PersonalityDetector, PersonalitySuggestion, PreferenceDetector, PreferenceUpdate,
};
use skynet_memory::{EmotionLog, GoalStore, MemoryEngine, ShortTermBuffer};
use skynet_personality::PersonalityManager;
use skynet_sessions::SessionManager;
use skynet_users::{ConversationStore, UserResolver};

use crate::llm_adapter::AgentLlmAdapter;

fn convert_method(m: CoreDetectorMethod) -> DetectorMethod {
    match m {
        CoreDetectorMethod::Llm => DetectorMethod::Llm,
        CoreDetectorMethod::Pattern => DetectorMethod::Pattern,
        CoreDetectorMethod::Hybrid => DetectorMethod::Hybrid,
    }
}

/// Route-specific generation backends (spec §4.4 step 10: "the LLM
/// capability selected by the route"). A deployment that uses one backend
/// for everything constructs this with `uniform`; one that routes
/// romance/explicit traffic to a different model/provider sets the other
/// fields independently.
#[derive(Clone)]
pub struct RouteProviders {
    pub normal: Arc<dyn LlmProvider>,
    pub romance: Arc<dyn LlmProvider>,
    pub explicit: Arc<dyn LlmProvider>,
    pub fetish: Arc<dyn LlmProvider>,
}

impl RouteProviders {
    pub fn uniform(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            normal: provider.clone(),
            romance: provider.clone(),
            explicit: provider.clone(),
            fetish: provider,
        }
    }

    pub fn for_route(&self, route: Route) -> Arc<dyn LlmProvider> {
        match route {
            Route::Normal => self.normal.clone(),
            Route::Romance => self.romance.clone(),
            Route::Explicit => self.explicit.clone(),
            Route::Fetish => self.fetish.clone(),
            // Unreachable in practice — refusal routes never reach generation
            // (spec §4.4 step 5 stops the pipeline before step 10).
            Route::Refusal | Route::HardRefusal => self.normal.clone(),
        }
    }
}

/// Everything `stream_chat` (and the gateway's thin CRUD handlers) need,
/// wired once at startup and shared behind `Arc` across requests (spec §5).
/// Grounded on `skynet-gateway::app::AppState`'s "one struct, one Arc,
/// cloned per request" shape.
pub struct OrchestratorState {
    pub users: Arc<UserResolver>,
    pub conversations: Arc<ConversationStore>,
    pub short_term: Arc<ShortTermBuffer>,
    pub classifier: Arc<ContentClassifier>,
    pub sessions: Arc<SessionManager>,
    pub personalities: Arc<PersonalityManager>,
    pub memory: Arc<MemoryEngine>,
    pub goals: Arc<GoalStore>,
    pub emotions: Arc<EmotionLog>,
    pub audit: Arc<AuditLog>,
    pub background: BackgroundHandle,
    pub providers: RouteProviders,
    pub generation_model: String,
    pub detector_llm: Arc<dyn DetectorLlm>,
    pub emotion_detector: HybridDetector<EmotionResult>,
    pub personality_detector: HybridDetector<PersonalitySuggestion>,
    pub preference_detector: HybridDetector<PreferenceUpdate>,
    pub goal_detector: HybridDetector<GoalCandidate>,
    pub memory_extraction_detector: HybridDetector<ExtractedFact>,
    pub config: OrchestratorConfig,
    pub memory_extraction_min_turns: usize,
    pub personality_detector_confidence_threshold: f64,
}

impl OrchestratorState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<UserResolver>,
        conversations: Arc<ConversationStore>,
        short_term: Arc<ShortTermBuffer>,
        classifier: Arc<ContentClassifier>,
        sessions: Arc<SessionManager>,
        personalities: Arc<PersonalityManager>,
        memory: Arc<MemoryEngine>,
        goals: Arc<GoalStore>,
        emotions: Arc<EmotionLog>,
        audit: Arc<AuditLog>,
        background: BackgroundHandle,
        providers: RouteProviders,
        generation_model: String,
        detector_config: CoreDetectorConfig,
        orchestrator_config: OrchestratorConfig,
        memory_extraction_min_turns: usize,
    ) -> Self {
        let detector_llm: Arc<dyn DetectorLlm> = Arc::new(AgentLlmAdapter::new(
            providers.normal.clone(),
            orchestrator_config.detector_model.clone(),
        ));
        let personality_detector_confidence_threshold = detector_config.personality.confidence_threshold;

        Self {
            emotion_detector: HybridDetector::new(Box::new(EmotionDetector), convert_method(detector_config.emotion.method)),
            personality_detector: HybridDetector::new(
                Box::new(PersonalityDetector),
                convert_method(detector_config.personality.method),
            ),
            preference_detector: HybridDetector::new(
                Box::new(PreferenceDetector),
                convert_method(detector_config.preference.method),
            ),
            goal_detector: HybridDetector::new(Box::new(GoalDetector), convert_method(detector_config.goal.method)),
            memory_extraction_detector: HybridDetector::new(
                Box::new(MemoryExtractionDetector),
                convert_method(detector_config.memory_extraction.method),
            ),
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
            generation_model,
            detector_llm,
            config: orchestrator_config,
            memory_extraction_min_turns,
            personality_detector_confidence_threshold,
        }
    }
}

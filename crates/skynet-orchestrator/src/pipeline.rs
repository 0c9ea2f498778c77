use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::Stream;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use skynet_agent::{ChatRequest, GoalInput, Message as AgentMessage, MemoryInput, PersonaInput, PreferencesInput, PromptBuilder, Role as AgentRole, SessionInfo, StreamEvent};
use skynet_audit::AuditRecord;
use skynet_classifier::types::{ClassificationResult, Route};
use skynet_detectors::types::{DetectorContext, DetectorLlm};
use skynet_detectors::{EmotionResult, Intensity as DetectorIntensity, PreferenceField};
use skynet_memory::{EmotionIntensity as MemoryEmotionIntensity, MemoryCategory};
use skynet_personality::{Archetype, Behaviors, Traits};
use skynet_protocol::ChatEvent;
use skynet_sessions::SessionAction;

use crate::audit as audit_util;
use crate::error::OrchestratorError;
use crate::state::OrchestratorState;

/// C10 — the 13-step streamed conversation turn (spec §4.4). Every
/// fallible step is resolved into either a yielded `ChatEvent::Error` (via
/// `try_step!`, which stops the generator) or the value it produced; there
/// is no outer `Result` because this function never returns one — it
/// streams its own outcome.
pub fn stream_chat(
    state: Arc<OrchestratorState>,
    external_user_id: String,
    conversation_id: Option<String>,
    personality_name: Option<String>,
    message: String,
) -> impl Stream<Item = ChatEvent> {
    async_stream::stream! {
        let start = Instant::now();
        let overall_deadline = start + Duration::from_secs(state.config.overall_timeout_secs);

        macro_rules! try_step {
            ($expr:expr) => {
                match $expr {
                    Ok(v) => v,
                    Err(e) => {
                        let err: OrchestratorError = e.into();
                        tracing::warn!(error = %err, "pipeline step failed");
                        yield err.to_event();
                        return;
                    }
                }
            };
        }

        // Step 1 — resolve identity.
        let user = try_step!(state.users.resolve(&external_user_id));

        // Step 2 — resolve/create conversation bound to a personality.
        let requested_personality = personality_name.is_some();
        let personality_name = personality_name.unwrap_or_else(|| "default".to_string());
        let personality = match try_step!(state.personalities.get_by_name(&user.id, &personality_name)) {
            Some(p) => p,
            None if requested_personality => {
                yield OrchestratorError::Validation(format!("unknown personality: {personality_name}")).to_event();
                return;
            }
            None => try_step!(state.personalities.create(
                &user.id,
                &personality_name,
                Archetype::SupportiveFriend,
                None,
                None,
                None,
            )),
        };
        let conversation = try_step!(state.conversations.get_or_create(
            conversation_id.as_deref(),
            &user.id,
            &personality.id,
        ));

        yield ChatEvent::thinking("resolve_identity", json!({
            "user_id": user.id,
            "conversation_id": conversation.id,
            "personality_id": personality.id,
        }));

        // Step 3 — append user message to the short-term buffer.
        try_step!(state.short_term.append(&conversation.id, "user", &message));

        // Step 4 — classify, unconditionally (lets SAFE break a locked route).
        let classification: ClassificationResult = state.classifier.classify(&message).await;
        yield ChatEvent::thinking("classify", json!({
            "label": classification.label.to_string(),
            "confidence": classification.confidence,
        }));

        // Step 5 — session decision.
        let decision = try_step!(state.sessions.record_classification(&conversation.id, classification.label));

        state.audit.record(AuditRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            conversation_id: conversation.id.clone(),
            user_id: user.id.clone(),
            original_text: message.clone(),
            normalized_text: classification.layer_trace.normalized_text.clone(),
            label: classification.label,
            confidence: classification.confidence,
            indicators: classification.indicators.clone(),
            route: decision.route,
            route_locked: decision.state.route_lock_counter > 0,
            age_verified: decision.state.age_verified,
            action: audit_util::session_action_to_audit_action(decision.action),
            layer_trace: audit_util::layer_trace_strings(&classification.layer_trace),
        });

        match decision.action {
            SessionAction::AgeVerify => {
                yield ChatEvent::AgeVerificationRequired {
                    conversation_id: conversation.id.clone(),
                    route: decision.route.to_string(),
                    api_endpoint: "/age-verify".to_string(),
                    instructions: "Confirm you are 18 or older via POST /age-verify to continue.".to_string(),
                };
                yield ChatEvent::Done { conversation_id: conversation.id.clone(), duration_ms: start.elapsed().as_millis() as u64 };
                return;
            }
            SessionAction::Refuse => {
                yield ChatEvent::Refusal {
                    text: decision.refusal_text.unwrap_or_default().to_string(),
                    reason: classification.label.to_string(),
                };
                yield ChatEvent::Done { conversation_id: conversation.id.clone(), duration_ms: start.elapsed().as_millis() as u64 };
                return;
            }
            SessionAction::Generate => {}
        }

        if Instant::now() > overall_deadline {
            yield OrchestratorError::DependencyTimeout { what: "pre-generation pipeline".to_string(), ms: state.config.overall_timeout_secs * 1000 }.to_event();
            return;
        }

        // Step 6 — parallel fan-out.
        let recent_buffered = try_step!(state.short_term.recent(&conversation.id));
        let mut recent_texts: Vec<String> = recent_buffered.iter().map(|m| m.content.clone()).collect();
        recent_texts.reverse();
        let detector_ctx = DetectorContext { recent_messages: recent_texts };

        let detector_llm: Option<&dyn DetectorLlm> = Some(state.detector_llm.as_ref());
        let detector_timeout = Duration::from_secs(state.config.detector_timeout_secs);

        let (emotion, personality_suggestion, preference_update) = tokio::join!(
            timeout(detector_timeout, state.emotion_detector.run(detector_llm, &message, &detector_ctx)),
            timeout(detector_timeout, state.personality_detector.run(detector_llm, &message, &detector_ctx)),
            timeout(detector_timeout, state.preference_detector.run(detector_llm, &message, &detector_ctx)),
        );
        let emotion: Option<EmotionResult> = emotion.ok().flatten();
        let personality_suggestion = personality_suggestion.ok().flatten();
        let preference_update = preference_update.ok().flatten();

        let relationship = try_step!(state.personalities.record_interaction(&user.id, &personality.id, None));
        let mut preferences = try_step!(state.personalities.get_preferences(&user.id));

        yield ChatEvent::thinking("detect", json!({
            "emotion": emotion.as_ref().map(|e| e.emotion.clone()),
            "personality_suggestion": personality_suggestion.as_ref().map(|p| p.archetype.clone()),
            "preference_update": preference_update.is_some(),
        }));

        // Step 7 — detected-personality precedence: use what the fan-out
        // just found instead of the config loaded before it ran, to avoid
        // a read-after-write race against this same turn. A write is also
        // issued so the next turn's load sees the detected config durably
        // persisted (spec §8 scenario 5), not just this turn's prompt.
        let (effective_archetype, effective_traits, effective_behaviors): (String, Traits, Behaviors) =
            match &personality_suggestion {
                Some(suggestion) if suggestion.confidence >= state.personality_detector_confidence_threshold => {
                    let archetype = Archetype::from_str(&suggestion.archetype);
                    let traits = archetype.default_traits();
                    let behaviors = archetype.default_behaviors();
                    try_step!(state.personalities.update(
                        &personality.id,
                        skynet_personality::UpdateMode::Merge,
                        Some(archetype.clone()),
                        Some(traits),
                        Some(behaviors),
                        None,
                        None,
                        None,
                    ));
                    (archetype.as_str().to_string(), traits, behaviors)
                }
                _ => (personality.archetype.as_str().to_string(), personality.traits, personality.behaviors),
            };

        if let Some(update) = &preference_update {
            match update.field {
                PreferenceField::Formality => preferences.formality = update.value.clone(),
                PreferenceField::Tone => preferences.tone = update.value.clone(),
                PreferenceField::EmojiUsage => preferences.emoji_usage = update.value.clone(),
                PreferenceField::ResponseLength => preferences.response_length = update.value.clone(),
                PreferenceField::ExplanationStyle => preferences.explanation_style = update.value.clone(),
            }
            try_step!(state.personalities.set_preferences(&preferences));
        }

        let mut emotion_trend: Option<String> = None;
        if let Some(e) = &emotion {
            let history = try_step!(state.emotions.recent(&user.id, &conversation.id, 5));
            emotion_trend = describe_emotion_trend(&history, &e.emotion);
            try_step!(state.emotions.record(
                &user.id,
                &conversation.id,
                &e.emotion,
                e.confidence,
                map_intensity(e.intensity),
                e.indicators.clone(),
                &message,
            ));
        }

        // Step 8 — memory retrieval.
        let memories = try_step!(state.memory.retrieve(&user.id, &personality.id, &message).await);
        let goals = try_step!(state.goals.list_active(&user.id));

        // Step 9 — prompt assembly.
        let route_template = route_system_prompt_template(decision.route);
        let persona_input = PersonaInput {
            archetype: effective_archetype,
            traits_description: render_traits(&effective_traits),
            behaviors_description: render_behaviors(&effective_behaviors),
            backstory: personality.backstory.clone(),
            speaking_style: personality.speaking_style.clone(),
            custom_instructions: personality.custom_instructions.clone(),
            relationship_depth: relationship.depth_score,
            trust_level: relationship.trust_level,
        };
        let emotion_input = emotion.as_ref().map(|e| skynet_agent::EmotionInput {
            emotion: e.emotion.clone(),
            intensity: map_intensity(e.intensity).as_str().to_string(),
            trend: emotion_trend.clone(),
        });
        let preferences_input = PreferencesInput {
            formality: Some(preferences.formality.clone()),
            tone: Some(preferences.tone.clone()),
            emoji_usage: Some(preferences.emoji_usage.clone()),
            response_length: Some(preferences.response_length.clone()),
            explanation_style: Some(preferences.explanation_style.clone()),
        };
        let memory_inputs: Vec<MemoryInput> = memories
            .iter()
            .map(|m| MemoryInput { content: m.content.clone(), importance: m.importance })
            .collect();
        let goal_inputs: Vec<GoalInput> = goals
            .iter()
            .map(|g| GoalInput { title: g.title.clone(), category: g.category.clone() })
            .collect();
        let session_info = SessionInfo {
            conversation_id: conversation.id.clone(),
            turn_count: relationship.total_messages.min(u32::MAX as u64) as u32,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let system_prompt = PromptBuilder::new(route_template).build(
            &persona_input,
            emotion_input.as_ref(),
            &preferences_input,
            &memory_inputs,
            &goal_inputs,
            Some(&session_info),
        );

        let mut messages: Vec<AgentMessage> = recent_buffered
            .iter()
            .map(|m| AgentMessage {
                role: if m.role == "assistant" { AgentRole::Assistant } else { AgentRole::User },
                content: m.content.clone(),
            })
            .collect();
        if messages.is_empty() {
            messages.push(AgentMessage { role: AgentRole::User, content: message.clone() });
        }

        if Instant::now() > overall_deadline {
            yield OrchestratorError::DependencyTimeout { what: "prompt assembly".to_string(), ms: state.config.overall_timeout_secs * 1000 }.to_event();
            return;
        }

        // Step 10 — stream generation through the route-selected backend.
        let provider = state.providers.for_route(decision.route);
        let chat_request = ChatRequest {
            model: state.generation_model.clone(),
            system: system_prompt.to_plain_text(),
            system_prompt: Some(system_prompt),
            messages,
            max_tokens: 1024,
            stream: true,
            thinking: None,
            tools: Vec::new(),
            raw_messages: None,
        };

        let (tx, mut rx) = mpsc::channel::<StreamEvent>(32);
        let send_task = tokio::spawn(async move { provider.send_stream(&chat_request, tx).await });

        let idle_timeout = Duration::from_secs(state.config.llm_idle_timeout_secs);
        let mut assistant_text = String::new();
        let mut stream_error: Option<String> = None;

        loop {
            match timeout(idle_timeout, rx.recv()).await {
                Ok(Some(StreamEvent::TextDelta { text })) => {
                    assistant_text.push_str(&text);
                    yield ChatEvent::Chunk { text };
                }
                Ok(Some(StreamEvent::Thinking { .. })) => {}
                Ok(Some(StreamEvent::ToolUse { .. })) => {}
                Ok(Some(StreamEvent::Done { .. })) => break,
                Ok(Some(StreamEvent::Error { message })) => {
                    stream_error = Some(message);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    stream_error = Some("LLM stream idle timeout".to_string());
                    break;
                }
            }
        }
        match send_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if stream_error.is_none() => stream_error = Some(e.to_string()),
            Ok(Err(_)) => {}
            Err(e) => tracing::error!(error = %e, "generation task panicked"),
        }

        // Step 11 — persist assistant message (whatever was accumulated,
        // even on a mid-stream error — the client already rendered it).
        if !assistant_text.is_empty() {
            try_step!(state.short_term.append(&conversation.id, "assistant", &assistant_text));
        }

        if let Some(err) = stream_error {
            yield ChatEvent::Error { message: err };
            return;
        }

        // Step 12 — background fan-out (fire-and-forget, bounded).
        let turn_count = try_step!(state.short_term.turn_count(&conversation.id));
        if turn_count as usize >= state.memory_extraction_min_turns {
            spawn_background_fanout(&state, &user.id, &personality.id, &conversation.id, &message, &detector_ctx, &emotion);
        }

        // Step 13 — done.
        yield ChatEvent::Done {
            conversation_id: conversation.id.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
    }
}

fn spawn_background_fanout(
    state: &Arc<OrchestratorState>,
    user_id: &str,
    personality_id: &str,
    conversation_id: &str,
    message: &str,
    ctx: &DetectorContext,
    emotion: &Option<EmotionResult>,
) {
    let emotion_confidence = emotion.as_ref().map(|e| e.confidence);

    {
        let job_state = state.clone();
        let user_id = user_id.to_string();
        let personality_id = personality_id.to_string();
        let conversation_id = conversation_id.to_string();
        let message = message.to_string();
        let ctx = ctx.clone();
        let job = async move {
            let llm: Option<&dyn DetectorLlm> = Some(job_state.detector_llm.as_ref());
            if let Some(fact) = job_state.memory_extraction_detector.run(llm, &message, &ctx).await {
                let category = MemoryCategory::from(fact.category);
                if let Err(e) = job_state
                    .memory
                    .store(&user_id, &personality_id, &conversation_id, &fact.content, category, false, emotion_confidence, llm)
                    .await
                {
                    tracing::warn!(error = %e, "background memory extraction store failed");
                }
            }
        };
        if let Err(e) = state.background.spawn(job) {
            tracing::warn!(error = %e, "background memory extraction enqueue failed");
        }
    }

    {
        let job_state = state.clone();
        let user_id = user_id.to_string();
        let message = message.to_string();
        let ctx = ctx.clone();
        let job = async move {
            let llm: Option<&dyn DetectorLlm> = Some(job_state.detector_llm.as_ref());
            if let Some(goal) = job_state.goal_detector.run(llm, &message, &ctx).await {
                if let Err(e) = job_state.goals.record(
                    &user_id,
                    &goal.title,
                    &goal.category,
                    goal.confidence,
                    goal.commitment_level,
                    goal.target_timeframe,
                    goal.motivation,
                ) {
                    tracing::warn!(error = %e, "background goal record failed");
                }
            }
        };
        if let Err(e) = state.background.spawn(job) {
            tracing::warn!(error = %e, "background goal detection enqueue failed");
        }
    }
}

/// Notes a recurring emotion across the last few turns, for the prompt's
/// "trend" hint (spec §4.7 emotional-context section). `history` is
/// newest-first (`EmotionLog::recent`'s ordering).
fn describe_emotion_trend(history: &[skynet_memory::EmotionRecord], current_emotion: &str) -> Option<String> {
    let repeat_count = history.iter().take(3).filter(|r| r.emotion == current_emotion).count();
    if repeat_count >= 2 {
        Some(format!("This has been a recurring {current_emotion} across the last few turns."))
    } else {
        None
    }
}

fn map_intensity(i: DetectorIntensity) -> MemoryEmotionIntensity {
    match i {
        DetectorIntensity::Low => MemoryEmotionIntensity::Low,
        DetectorIntensity::Med => MemoryEmotionIntensity::Med,
        DetectorIntensity::High => MemoryEmotionIntensity::High,
    }
}

/// Mirrors `skynet_classifier::router::route`'s system prompt templates,
/// re-keyed by `Route` since the session manager already decided the route
/// (it may differ from a fresh `label_to_route` if locked) — the
/// orchestrator must render the prompt for the route actually in force,
/// not recompute one from today's label.
fn route_system_prompt_template(route: Route) -> &'static str {
    match route {
        Route::Normal => "You are a helpful, friendly companion.",
        Route::Romance => "You are a warm, romantically affectionate companion. Keep content suggestive, not explicit.",
        Route::Explicit => {
            "You are an intimate companion for a verified adult user. Explicit consensual-adult content is permitted."
        }
        Route::Fetish => {
            "You are an intimate companion for a verified adult user exploring a specific kink or fetish context, \
             consensually and safely."
        }
        Route::Refusal | Route::HardRefusal => "",
    }
}

fn render_traits(t: &Traits) -> String {
    format!(
        "Traits (0-10): humor {}, formality {}, enthusiasm {}, empathy {}, directness {}, curiosity {}, supportiveness {}, playfulness {}.",
        t.humor, t.formality, t.enthusiasm, t.empathy, t.directness, t.curiosity, t.supportiveness, t.playfulness
    )
}

fn render_behaviors(b: &Behaviors) -> String {
    let mut flags = Vec::new();
    if b.asks_questions {
        flags.push("asks questions");
    }
    if b.uses_examples {
        flags.push("uses examples");
    }
    if b.shares_opinions {
        flags.push("shares opinions");
    }
    if b.challenges_user {
        flags.push("challenges the user");
    }
    if b.celebrates_wins {
        flags.push("celebrates wins");
    }
    if flags.is_empty() {
        "Behaviors: none notable.".to_string()
    } else {
        format!("Behaviors: {}.", flags.join(", "))
    }
}

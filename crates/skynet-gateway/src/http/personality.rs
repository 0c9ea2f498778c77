//! Personality endpoints (user-scoped): list, get by name, create, update,
//! delete (spec §6).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use skynet_personality::{Archetype, Behaviors, Personality, PersonalityError, Traits, UpdateMode as PersonalityUpdateMode};
use skynet_protocol::dto::{
    BehaviorsView, CreatePersonalityRequest, PersonalityView, TraitsView, UpdateMode, UpdatePersonalityRequest,
};

use crate::app::AppState;
use crate::auth::resolve_external_user_id;

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type HandlerError = (StatusCode, Json<ErrorBody>);

fn err(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (status, Json(ErrorBody { error: message.into() }))
}

fn to_view(p: &Personality) -> PersonalityView {
    PersonalityView {
        name: p.name.clone(),
        archetype: p.archetype.as_str().to_string(),
        traits: traits_to_view(&p.traits),
        behaviors: behaviors_to_view(&p.behaviors),
        backstory: p.backstory.clone(),
        speaking_style: p.speaking_style.clone(),
        custom_instructions: p.custom_instructions.clone(),
        version: p.version as u64,
    }
}

fn traits_to_view(t: &Traits) -> TraitsView {
    TraitsView {
        humor: t.humor as f64,
        formality: t.formality as f64,
        enthusiasm: t.enthusiasm as f64,
        empathy: t.empathy as f64,
        directness: t.directness as f64,
        curiosity: t.curiosity as f64,
        supportiveness: t.supportiveness as f64,
        playfulness: t.playfulness as f64,
    }
}

fn traits_from_view(v: &TraitsView) -> Traits {
    let clamp = |x: f64| x.clamp(0.0, 10.0).round() as u8;
    Traits {
        humor: clamp(v.humor),
        formality: clamp(v.formality),
        enthusiasm: clamp(v.enthusiasm),
        empathy: clamp(v.empathy),
        directness: clamp(v.directness),
        curiosity: clamp(v.curiosity),
        supportiveness: clamp(v.supportiveness),
        playfulness: clamp(v.playfulness),
    }
}

fn behaviors_to_view(b: &Behaviors) -> BehaviorsView {
    BehaviorsView {
        asks_questions: b.asks_questions,
        uses_examples: b.uses_examples,
        shares_opinions: b.shares_opinions,
        challenges_user: b.challenges_user,
        celebrates_wins: b.celebrates_wins,
    }
}

fn behaviors_from_view(v: &BehaviorsView) -> Behaviors {
    Behaviors {
        asks_questions: v.asks_questions,
        uses_examples: v.uses_examples,
        shares_opinions: v.shares_opinions,
        challenges_user: v.challenges_user,
        celebrates_wins: v.celebrates_wins,
    }
}

fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<skynet_users::User, HandlerError> {
    let external_user_id =
        resolve_external_user_id(state, headers).ok_or_else(|| err(StatusCode::UNAUTHORIZED, "missing or invalid credentials"))?;
    state
        .orchestrator
        .users
        .resolve(&external_user_id)
        .map_err(|e| err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Looks a personality up by name and confirms it belongs to `user_id`,
/// returning a flat 404 either way (spec §7 AuthError: "never leaks
/// whether the target resource exists").
fn find_owned(state: &AppState, user_id: &str, name: &str) -> Result<Personality, HandlerError> {
    let personality = state
        .orchestrator
        .personalities
        .get_by_name(user_id, name)
        .map_err(|e| err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "personality not found"))?;
    Ok(personality)
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PersonalityView>>, HandlerError> {
    let user = resolve_user(&state, &headers)?;
    let list = state
        .orchestrator
        .personalities
        .list(&user.id)
        .map_err(|e| err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(list.iter().map(to_view).collect()))
}

pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<PersonalityView>, HandlerError> {
    let user = resolve_user(&state, &headers)?;
    let personality = find_owned(&state, &user.id, &name)?;
    Ok(Json(to_view(&personality)))
}

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreatePersonalityRequest>,
) -> Result<Json<PersonalityView>, HandlerError> {
    let user = resolve_user(&state, &headers)?;
    if req.name.trim().is_empty() {
        return Err(err(StatusCode::BAD_REQUEST, "name cannot be empty"));
    }

    let archetype = Archetype::from_str(&req.archetype);
    let personality = state
        .orchestrator
        .personalities
        .create(&user.id, &req.name, archetype, req.backstory, req.speaking_style, req.custom_instructions)
        .map_err(|e| match e {
            // R2: duplicate (user, name) fails without mutating state.
            PersonalityError::DuplicateName(_) => err(StatusCode::CONFLICT, e.to_string()),
            other => err(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    // Trait/behavior overrides apply as an immediate follow-up update so
    // `create` always records the archetype defaults as version 1 first.
    let personality = if req.traits.is_some() || req.behaviors.is_some() {
        state
            .orchestrator
            .personalities
            .update(
                &personality.id,
                PersonalityUpdateMode::Merge,
                None,
                req.traits.as_ref().map(traits_from_view),
                req.behaviors.as_ref().map(behaviors_from_view),
                None,
                None,
                None,
            )
            .map_err(|e| err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    } else {
        personality
    };

    Ok(Json(to_view(&personality)))
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(req): Json<UpdatePersonalityRequest>,
) -> Result<Json<PersonalityView>, HandlerError> {
    let user = resolve_user(&state, &headers)?;
    let existing = find_owned(&state, &user.id, &name)?;

    let mode = match req.mode {
        UpdateMode::Merge => PersonalityUpdateMode::Merge,
        UpdateMode::Replace => PersonalityUpdateMode::Replace,
    };

    let updated = state
        .orchestrator
        .personalities
        .update(
            &existing.id,
            mode,
            req.archetype.as_deref().map(Archetype::from_str),
            req.traits.as_ref().map(traits_from_view),
            req.behaviors.as_ref().map(behaviors_from_view),
            req.backstory,
            req.speaking_style,
            req.custom_instructions,
        )
        .map_err(|e| err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(to_view(&updated)))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<StatusCode, HandlerError> {
    let user = resolve_user(&state, &headers)?;
    let existing = find_owned(&state, &user.id, &name)?;
    state
        .orchestrator
        .personalities
        .delete(&existing.id)
        .map_err(|e| err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

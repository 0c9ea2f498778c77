use serde::{Deserialize, Serialize};
use skynet_classifier::types::{Label, Route};

/// Per-conversation state machine record (spec §3 SessionState, §4.3).
///
/// Keyed by conversation id (`skynet_core::types::SessionKey`). Expires
/// after `session.timeout_hours` of inactivity — on next access a fresh
/// record is created with `age_verified = false` (spec §4.3 step 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub conversation_id: String,
    pub age_verified: bool,
    pub age_verified_at: Option<String>,
    pub current_route: Route,
    /// Invariant I7: always in `[0, route_lock_messages]`.
    pub route_lock_counter: u32,
    pub explicit_attempts_without_verification: u32,
    pub last_classification_label: Option<Label>,
    pub updated_at: String,
}

impl SessionState {
    pub fn fresh(conversation_id: impl Into<String>, now: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            age_verified: false,
            age_verified_at: None,
            current_route: Route::Normal,
            route_lock_counter: 0,
            explicit_attempts_without_verification: 0,
            last_classification_label: None,
            updated_at: now.into(),
        }
    }
}

/// What the orchestrator should do with this message (spec §4.3/§4.4 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Proceed to generation under `SessionDecision::route`.
    Generate,
    /// Emit `age_verification_required`; no generation.
    AgeVerify,
    /// Emit `refusal`; no generation.
    Refuse,
}

#[derive(Debug, Clone)]
pub struct SessionDecision {
    pub action: SessionAction,
    pub route: Route,
    pub refusal_text: Option<&'static str>,
    pub state: SessionState,
}

pub(crate) fn label_to_str(l: Label) -> &'static str {
    match l {
        Label::Safe => "safe",
        Label::Suggestive => "suggestive",
        Label::ExplicitConsensualAdult => "explicit_consensual_adult",
        Label::ExplicitFetish => "explicit_fetish",
        Label::Nonconsensual => "nonconsensual",
        Label::MinorRisk => "minor_risk",
    }
}

pub(crate) fn str_to_label(s: &str) -> Option<Label> {
    Some(match s {
        "safe" => Label::Safe,
        "suggestive" => Label::Suggestive,
        "explicit_consensual_adult" => Label::ExplicitConsensualAdult,
        "explicit_fetish" => Label::ExplicitFetish,
        "nonconsensual" => Label::Nonconsensual,
        "minor_risk" => Label::MinorRisk,
        _ => return None,
    })
}

pub(crate) fn route_to_str(r: Route) -> &'static str {
    match r {
        Route::Normal => "normal",
        Route::Romance => "romance",
        Route::Explicit => "explicit",
        Route::Fetish => "fetish",
        Route::Refusal => "refusal",
        Route::HardRefusal => "hard_refusal",
    }
}

pub(crate) fn str_to_route(s: &str) -> Route {
    match s {
        "romance" => Route::Romance,
        "explicit" => Route::Explicit,
        "fetish" => Route::Fetish,
        "refusal" => Route::Refusal,
        "hard_refusal" => Route::HardRefusal,
        _ => Route::Normal,
    }
}

use crate::types::{Label, Route};

/// C5 — fixed label→route mapping (spec §4.2). Grounded on the teacher's
/// `skynet-agent::router::ProviderSlot` selection-by-priority idiom, applied
/// here to a plain lookup table instead of a prioritized provider list.
pub fn label_to_route(label: Label) -> Route {
    match label {
        Label::Safe => Route::Normal,
        Label::Suggestive => Route::Romance,
        Label::ExplicitConsensualAdult => Route::Explicit,
        Label::ExplicitFetish => Route::Fetish,
        Label::Nonconsensual => Route::Refusal,
        Label::MinorRisk => Route::HardRefusal,
    }
}

pub enum RouteAction {
    Generate,
    Refuse,
}

pub struct RouteDecision {
    pub route: Route,
    pub system_prompt_template: &'static str,
    pub action: RouteAction,
    pub refusal_text: Option<&'static str>,
}

const REFUSAL_TEXT: &str =
    "I can't help with that. If you or someone else is in danger, please reach out to a crisis line or local authorities.";
const HARD_REFUSAL_TEXT: &str =
    "I can't engage with that request. Content involving minors is never appropriate here.";

/// Each route carries a canonical system-prompt template (persona + safety
/// rules); `REFUSAL`/`HARD_REFUSAL` additionally emit fixed refusal text
/// and set `action = refuse` (spec §4.2).
pub fn route(label: Label) -> RouteDecision {
    let r = label_to_route(label);
    match r {
        Route::Normal => RouteDecision {
            route: r,
            system_prompt_template: "You are a helpful, friendly companion.",
            action: RouteAction::Generate,
            refusal_text: None,
        },
        Route::Romance => RouteDecision {
            route: r,
            system_prompt_template: "You are a warm, romantically affectionate companion. Keep content suggestive, not explicit.",
            action: RouteAction::Generate,
            refusal_text: None,
        },
        Route::Explicit => RouteDecision {
            route: r,
            system_prompt_template: "You are an intimate companion for a verified adult user. Explicit consensual-adult content is permitted.",
            action: RouteAction::Generate,
            refusal_text: None,
        },
        Route::Fetish => RouteDecision {
            route: r,
            system_prompt_template: "You are an intimate companion for a verified adult user exploring a specific kink/fetish context, consensually and safely.",
            action: RouteAction::Generate,
            refusal_text: None,
        },
        Route::Refusal => RouteDecision {
            route: r,
            system_prompt_template: "",
            action: RouteAction::Refuse,
            refusal_text: Some(REFUSAL_TEXT),
        },
        Route::HardRefusal => RouteDecision {
            route: r,
            system_prompt_template: "",
            action: RouteAction::Refuse,
            refusal_text: Some(HARD_REFUSAL_TEXT),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_matches_spec_table() {
        assert_eq!(label_to_route(Label::Safe), Route::Normal);
        assert_eq!(label_to_route(Label::Suggestive), Route::Romance);
        assert_eq!(label_to_route(Label::ExplicitConsensualAdult), Route::Explicit);
        assert_eq!(label_to_route(Label::ExplicitFetish), Route::Fetish);
        assert_eq!(label_to_route(Label::Nonconsensual), Route::Refusal);
        assert_eq!(label_to_route(Label::MinorRisk), Route::HardRefusal);
    }

    #[test]
    fn refusal_routes_set_action_refuse_with_text() {
        let d = route(Label::MinorRisk);
        assert!(matches!(d.action, RouteAction::Refuse));
        assert!(d.refusal_text.is_some());
    }
}

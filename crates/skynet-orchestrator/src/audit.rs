use skynet_audit::AuditAction;
use skynet_classifier::types::{DecidingLayer, LayerTrace};
use skynet_sessions::SessionAction;

/// `SessionAction` and `AuditAction` are separate enums owned by separate
/// crates (sessions decides behavior, audit records it) — this is the one
/// place that maps between them.
pub fn session_action_to_audit_action(action: SessionAction) -> AuditAction {
    match action {
        SessionAction::Generate => AuditAction::Generate,
        SessionAction::AgeVerify => AuditAction::AgeVerify,
        SessionAction::Refuse => AuditAction::Refuse,
    }
}

/// Flattens a `LayerTrace` into the `Vec<String>` shape `AuditRecord`
/// stores (spec §3: "layer_trace: which layers ran and what they said").
pub fn layer_trace_strings(trace: &LayerTrace) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(hit) = &trace.fast_rule_hit {
        out.push(format!("fast_rule:{hit}"));
    }
    if let Some(label) = trace.pattern_label {
        out.push(format!("pattern:{label}:{:.2}", trace.pattern_confidence.unwrap_or(0.0)));
    }
    if trace.judge_invoked {
        match trace.judge_label {
            Some(label) => out.push(format!("judge:{label}:{:.2}", trace.judge_confidence.unwrap_or(0.0))),
            None => out.push("judge:invoked_no_verdict".to_string()),
        }
    }
    out.push(format!("deciding:{:?}", trace.deciding_layer));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_session_action() {
        assert!(matches!(session_action_to_audit_action(SessionAction::Generate), AuditAction::Generate));
        assert!(matches!(session_action_to_audit_action(SessionAction::AgeVerify), AuditAction::AgeVerify));
        assert!(matches!(session_action_to_audit_action(SessionAction::Refuse), AuditAction::Refuse));
    }

    #[test]
    fn trace_includes_deciding_layer() {
        let trace = LayerTrace {
            normalized_text: "hi".to_string(),
            fast_rule_hit: None,
            pattern_label: None,
            pattern_confidence: None,
            judge_invoked: false,
            judge_label: None,
            judge_confidence: None,
            deciding_layer: DecidingLayer::PatternScore,
        };
        let rendered = layer_trace_strings(&trace);
        assert!(rendered.iter().any(|s| s.contains("PatternScore")));
    }
}

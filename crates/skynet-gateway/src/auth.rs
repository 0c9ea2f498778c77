use axum::http::HeaderMap;

use crate::app::AppState;

/// Spec §6 Authentication: "Bearer token or api-key header; opaque
/// external user id extracted from the token. A debug header (disabled in
/// production) may substitute the user id directly."
///
/// Never leaks whether the target resource exists on failure (spec §7
/// AuthError) — callers get a flat `None` and turn that into a generic
/// 401, not a reason.
pub fn resolve_external_user_id(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if state.config.gateway.debug_user_header {
        if let Some(id) = header_str(headers, "x-debug-user-id") {
            return Some(id.to_string());
        }
    }

    let token = extract_bearer(headers).or_else(|| header_str(headers, "x-api-key"));

    match token {
        Some(t) if !t.is_empty() => Some(t.to_string()),
        _ => {
            if state.config.gateway.auth.require_token {
                None
            } else {
                // Auth not required and no credential supplied — fall back
                // to a single anonymous identity rather than rejecting.
                Some("anonymous".to_string())
            }
        }
    }
}

/// A caller is authorised for a conversation only if they resolve to the
/// same external user id that owns it (spec §6 Age-verification endpoint:
/// "Requires that the session's owning user matches the caller").
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

use std::sync::Mutex;

use rusqlite::Connection;
use skynet_classifier::types::{Label, Route};
use tracing::{debug, instrument};

use crate::db;
use crate::error::Result;
use crate::types::{SessionAction, SessionDecision, SessionState};

const EXPLICIT_REFUSAL_TEXT: &str =
    "I can't help with that. If you or someone else is in danger, please reach out to a crisis line or local authorities.";
const HARD_REFUSAL_TEXT: &str =
    "I can't engage with that request. Content involving minors is never appropriate here.";

/// C6 — the session state machine (spec §4.3).
///
/// Grounded on the teacher's `get_or_create` atomic-upsert pattern (a
/// single `Mutex<Connection>`, read-then-insert-if-absent) which satisfies
/// spec §5's "atomic read-modify-write per conversation id" requirement for
/// a single instance; horizontal scaling externalises this table to a K/V
/// with the same contract (spec §9).
pub struct SessionManager {
    db: Mutex<Connection>,
    route_lock_messages: u32,
    timeout_hours: i64,
}

impl SessionManager {
    pub fn new(conn: Connection, route_lock_messages: u32, timeout_hours: i64) -> Self {
        Self {
            db: Mutex::new(conn),
            route_lock_messages,
            timeout_hours,
        }
    }

    /// Load a session, discarding it (and returning a fresh one) if it has
    /// been idle for more than `timeout_hours` (spec §4.3 step 6).
    #[instrument(skip(self), fields(conversation_id))]
    pub fn get_or_create(&self, conversation_id: &str) -> Result<SessionState> {
        let now = chrono::Utc::now();
        let db = self.db.lock().unwrap();
        if let Some(state) = db::find(&db, conversation_id)? {
            if let Ok(updated_at) = chrono::DateTime::parse_from_rfc3339(&state.updated_at) {
                let idle_hours = now
                    .signed_duration_since(updated_at.with_timezone(&chrono::Utc))
                    .num_hours();
                if idle_hours < self.timeout_hours {
                    return Ok(state);
                }
                debug!(conversation_id, idle_hours, "session expired, resetting");
            } else {
                return Ok(state);
            }
        }
        let fresh = SessionState::fresh(conversation_id, now.to_rfc3339());
        db::upsert(&db, &fresh)?;
        Ok(fresh)
    }

    /// Read-only view for `GET /session` (spec §6). Does not mutate or
    /// apply the 24h timeout reset — callers that need the authoritative
    /// current state should use `get_or_create`.
    pub fn peek(&self, conversation_id: &str) -> Result<Option<SessionState>> {
        let db = self.db.lock().unwrap();
        db::find(&db, conversation_id)
    }

    /// Evaluate the classifier's label against the session state machine
    /// and persist the transition (spec §4.3 steps 1-4).
    ///
    /// Classification always happens before this call (spec §5: "lock
    /// decrement happens on successful use of the route, not on
    /// classification") — this is the single mutation point.
    #[instrument(skip(self), fields(conversation_id, ?label))]
    pub fn record_classification(&self, conversation_id: &str, label: Label) -> Result<SessionDecision> {
        let mut state = self.get_or_create(conversation_id)?;
        let now = chrono::Utc::now().to_rfc3339();

        let is_explicit = matches!(label, Label::ExplicitConsensualAdult | Label::ExplicitFetish);

        // Step 1: age gate. Takes priority over everything else, including
        // an active lock — an unverified user never sees explicit content
        // regardless of how they got into this conversation.
        if is_explicit && !state.age_verified {
            state.explicit_attempts_without_verification += 1;
            state.last_classification_label = Some(label);
            state.updated_at = now;
            self.persist(&state)?;
            return Ok(SessionDecision {
                action: SessionAction::AgeVerify,
                route: state.current_route,
                refusal_text: None,
                state,
            });
        }

        // Step 2: refusal gate. Always audited by the caller; route is not
        // advanced and the lock counter is untouched (spec §4.3 step 2).
        if matches!(label, Label::Nonconsensual | Label::MinorRisk) {
            state.last_classification_label = Some(label);
            state.updated_at = now;
            self.persist(&state)?;
            let refusal_text = if label == Label::MinorRisk {
                HARD_REFUSAL_TEXT
            } else {
                EXPLICIT_REFUSAL_TEXT
            };
            let route = if label == Label::MinorRisk {
                Route::HardRefusal
            } else {
                Route::Refusal
            };
            return Ok(SessionDecision {
                action: SessionAction::Refuse,
                route,
                refusal_text: Some(refusal_text),
                state,
            });
        }

        // Steps 3-4: lock enforcement and lock set.
        let new_route = if state.route_lock_counter > 0 {
            let continues_lock = matches!(
                label,
                Label::Suggestive | Label::ExplicitConsensualAdult | Label::ExplicitFetish
            );
            if continues_lock {
                // B3 / I7: the locked route is retained verbatim, not
                // recomputed from this message's (possibly milder) label.
                state.route_lock_counter -= 1;
                state.current_route
            } else {
                // label must be Safe here (Nonconsensual/MinorRisk already
                // returned above) — the lock breaks immediately.
                state.route_lock_counter = 0;
                Route::Normal
            }
        } else {
            let route = skynet_classifier::router::label_to_route(label);
            if route == Route::Explicit || route == Route::Fetish {
                state.route_lock_counter = self.route_lock_messages;
            }
            route
        };

        state.current_route = new_route;
        state.last_classification_label = Some(label);
        state.updated_at = now;
        self.persist(&state)?;

        Ok(SessionDecision {
            action: SessionAction::Generate,
            route: new_route,
            refusal_text: None,
            state,
        })
    }

    /// R1: idempotent — a second call with `confirmed=true` does not move
    /// `age_verified_at`.
    #[instrument(skip(self), fields(conversation_id))]
    pub fn verify_age(&self, conversation_id: &str, confirmed: bool) -> Result<SessionState> {
        let mut state = self.get_or_create(conversation_id)?;
        if confirmed {
            if !state.age_verified {
                state.age_verified = true;
                state.age_verified_at = Some(chrono::Utc::now().to_rfc3339());
            }
            state.explicit_attempts_without_verification = 0;
        }
        state.updated_at = chrono::Utc::now().to_rfc3339();
        self.persist(&state)?;
        Ok(state)
    }

    fn persist(&self, state: &SessionState) -> Result<()> {
        let db = self.db.lock().unwrap();
        db::upsert(&db, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(route_lock_messages: u32) -> SessionManager {
        let conn = Connection::open_in_memory().unwrap();
        db::init_db(&conn).unwrap();
        SessionManager::new(conn, route_lock_messages, 24)
    }

    #[test]
    fn explicit_without_verification_triggers_age_gate() {
        let mgr = setup(5);
        let d = mgr
            .record_classification("c1", Label::ExplicitConsensualAdult)
            .unwrap();
        assert_eq!(d.action, SessionAction::AgeVerify);
        assert_eq!(d.state.explicit_attempts_without_verification, 1);
    }

    #[test]
    fn minor_risk_is_hard_refusal_even_when_locked() {
        let mgr = setup(5);
        mgr.verify_age("c2", true).unwrap();
        mgr.record_classification("c2", Label::ExplicitConsensualAdult)
            .unwrap();
        let d = mgr.record_classification("c2", Label::MinorRisk).unwrap();
        assert_eq!(d.action, SessionAction::Refuse);
        assert_eq!(d.route, Route::HardRefusal);
    }

    #[test]
    fn lock_set_on_entering_explicit_then_decrements() {
        let mgr = setup(5);
        mgr.verify_age("c3", true).unwrap();
        let d1 = mgr
            .record_classification("c3", Label::ExplicitConsensualAdult)
            .unwrap();
        assert_eq!(d1.route, Route::Explicit);
        assert_eq!(d1.state.route_lock_counter, 5);

        let d2 = mgr.record_classification("c3", Label::Suggestive).unwrap();
        assert_eq!(d2.route, Route::Explicit, "locked route retained");
        assert_eq!(d2.state.route_lock_counter, 4);
    }

    #[test]
    fn lock_breaks_on_safe_classification() {
        let mgr = setup(5);
        mgr.verify_age("c4", true).unwrap();
        mgr.record_classification("c4", Label::ExplicitConsensualAdult)
            .unwrap();
        let d = mgr.record_classification("c4", Label::Safe).unwrap();
        assert_eq!(d.route, Route::Normal);
        assert_eq!(d.state.route_lock_counter, 0);
    }

    #[test]
    fn age_verification_is_idempotent() {
        let mgr = setup(5);
        let a = mgr.verify_age("c5", true).unwrap();
        let b = mgr.verify_age("c5", true).unwrap();
        assert_eq!(a.age_verified_at, b.age_verified_at);
    }
}

use serde::{Deserialize, Serialize};

/// Stable external identifier mapped to an internal identity (spec §3
/// User). Created on first authenticated use; owns all downstream
/// entities (conversations, personalities, memories).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7 primary key — time-sortable.
    pub id: String,
    /// The opaque external identifier extracted from the auth token.
    pub external_id: String,
    pub created_at: String,
    pub last_seen_at: String,
}

/// Ordered sequence of messages under one user; bound to exactly one
/// personality (spec §3 Conversation). Owner and personality binding are
/// both immutable after creation — only set at row insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub personality_id: String,
    pub created_at: String,
}

use serde::{Deserialize, Serialize};
use skynet_classifier::types::{Label, Route};

/// What the orchestrator did with the classified message (spec §3
/// AuditRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Generate,
    Refuse,
    AgeVerify,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Refuse => "refuse",
            Self::AgeVerify => "age_verify",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "generate" => Self::Generate,
            "refuse" => Self::Refuse,
            "age_verify" => Self::AgeVerify,
            _ => return None,
        })
    }
}

/// One row per classification (spec §4.8: "Every invocation of C4
/// produces exactly one record"). `layer_trace` records which of the
/// classifier's 4 layers produced the final verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: String,
    pub conversation_id: String,
    pub user_id: String,
    pub original_text: String,
    pub normalized_text: String,
    pub label: Label,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub route: Route,
    pub route_locked: bool,
    pub age_verified: bool,
    pub action: AuditAction,
    pub layer_trace: Vec<String>,
}

const MAX_ORIGINAL_TEXT_CHARS: usize = 500;

impl AuditRecord {
    /// Truncates `original_text` to a bounded length before persistence
    /// (spec §3: "original_text (truncated)").
    pub fn truncate_original_text(text: &str) -> String {
        if text.chars().count() <= MAX_ORIGINAL_TEXT_CHARS {
            text.to_string()
        } else {
            text.chars().take(MAX_ORIGINAL_TEXT_CHARS).collect()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountEntry {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditStats {
    pub by_label: Vec<CountEntry>,
    pub by_route: Vec<CountEntry>,
    pub by_action: Vec<CountEntry>,
}

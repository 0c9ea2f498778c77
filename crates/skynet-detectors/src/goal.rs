use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{DetectorError, Result};
use crate::types::{Detectable, DetectorContext, DetectorLlm, Scored};

/// A candidate goal (spec §3 Goal), emitted before persistence — the
/// orchestrator assigns `created_at`/`is_active` on write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalCandidate {
    pub title: String,
    pub category: String,
    pub confidence: f64,
    pub commitment_level: f64,
    pub target_timeframe: Option<String>,
    pub motivation: Option<String>,
}

fn goal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(i (?:want|need|plan|hope|am trying|would like) to|my goal is to|i'm working on)\s+(.+)")
            .unwrap()
    })
}

const STRONG_COMMITMENT_MARKERS: &[&str] = &["i will", "i'm going to", "i've decided", "starting today"];

/// Goal detector (spec §4.6). Per spec §9's open question on per-detector
/// thresholds, goal uses a lower bar (0.5) than the 0.6 default — these
/// statements are inherently softer ("I hope to...") than factual claims.
pub struct GoalDetector;

#[async_trait]
impl Detectable<GoalCandidate> for GoalDetector {
    fn min_confidence(&self) -> f64 {
        0.5
    }

    async fn detect_llm(
        &self,
        llm: &dyn DetectorLlm,
        message: &str,
        _context: &DetectorContext,
    ) -> Result<Option<Scored<GoalCandidate>>> {
        let prompt = format!(
            "Does this message state a personal goal or intention? If so extract it. \
             Respond as JSON {{\"title\":string|null,\"category\":string,\"confidence\":0-1,\
             \"commitment_level\":0-1,\"target_timeframe\":string|null,\"motivation\":string|null}}.\n\nMessage: {message}"
        );
        let raw = llm.infer(&prompt).await?;
        let parsed: RawGoal = serde_json::from_str(&raw)
            .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;
        let Some(title) = parsed.title else {
            return Ok(None);
        };
        Ok(Some(Scored {
            confidence: parsed.confidence,
            value: GoalCandidate {
                title,
                category: parsed.category,
                confidence: parsed.confidence,
                commitment_level: parsed.commitment_level,
                target_timeframe: parsed.target_timeframe,
                motivation: parsed.motivation,
            },
        }))
    }

    fn detect_pattern(&self, message: &str, _context: &DetectorContext) -> Option<Scored<GoalCandidate>> {
        if message.trim_end().ends_with('?') {
            return None;
        }
        let caps = goal_pattern().captures(message)?;
        let title = caps.get(2)?.as_str().trim().trim_end_matches('.').to_string();
        if title.is_empty() {
            return None;
        }
        let lower = message.to_lowercase();
        let commitment_level = if STRONG_COMMITMENT_MARKERS.iter().any(|m| lower.contains(m)) {
            0.8
        } else {
            0.5
        };
        Some(Scored {
            confidence: 0.55,
            value: GoalCandidate {
                title,
                category: "general".to_string(),
                confidence: 0.55,
                commitment_level,
                target_timeframe: None,
                motivation: None,
            },
        })
    }
}

#[derive(Deserialize)]
struct RawGoal {
    title: Option<String>,
    category: String,
    confidence: f64,
    commitment_level: f64,
    target_timeframe: Option<String>,
    motivation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_want_to_goal() {
        let d = GoalDetector;
        let r = d
            .detect_pattern("I want to learn Spanish this year", &DetectorContext::default())
            .unwrap();
        assert!(r.value.title.contains("learn Spanish"));
    }

    #[test]
    fn question_is_not_a_goal() {
        let d = GoalDetector;
        assert!(d
            .detect_pattern("do I want to learn Spanish?", &DetectorContext::default())
            .is_none());
    }
}

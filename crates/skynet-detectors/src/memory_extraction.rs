use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};
use crate::types::{Detectable, DetectorContext, DetectorLlm, Scored};

/// The nine memory categories (spec §3 Memory). Owned here as a detector
/// output hint rather than depending on `skynet-memory`'s `Memory` type,
/// to keep C7 free of a dependency on C8 (`skynet-memory` depends on
/// `skynet-detectors`, not the reverse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategoryHint {
    PersonalFact,
    Preference,
    Goal,
    Event,
    Relationship,
    Challenge,
    Achievement,
    Knowledge,
    Instruction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub content: String,
    pub category: MemoryCategoryHint,
    pub confidence: f64,
}

const INTERROGATIVE_PREFIXES: &[&str] = &[
    "do ", "did ", "can ", "could ", "what ", "how ", "why ", "when ", "where ", "who ", "is ", "are ", "will ",
];
const COMMAND_PREFIXES: &[&str] = &["tell me about", "tell me", "show me", "explain"];

/// The known pre-existing question-as-memory bug (spec §9): a bare
/// question must never be stored as a fact. Applied before any
/// categorization so both llm and pattern paths inherit the filter.
fn is_question_or_command(message: &str) -> bool {
    let trimmed = message.trim();
    if trimmed.ends_with('?') {
        return true;
    }
    let lower = trimmed.to_lowercase();
    if INTERROGATIVE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    if COMMAND_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    false
}

const PREFERENCE_MARKERS: &[&str] = &["i like", "i love", "i enjoy", "i prefer", "i hate", "i don't like", "i dislike"];
const PERSONAL_FACT_MARKERS: &[&str] = &["i work at", "i am a", "i'm a", "my name is", "i live in", "i was born"];
const GOAL_MARKERS: &[&str] = &["i want to", "my goal is", "i'm trying to", "i plan to"];
const RELATIONSHIP_MARKERS: &[&str] = &["my wife", "my husband", "my partner", "my friend", "my mom", "my dad", "my sister", "my brother"];
const EVENT_MARKERS: &[&str] = &["yesterday", "last week", "tomorrow", "next week", "today i"];
const INSTRUCTION_MARKERS: &[&str] = &["remember that", "don't forget", "always", "never do"];

/// Memory-extraction detector (spec §4.5, §4.6, §9). Output feeds
/// `MemoryEngine::store` in `skynet-memory`, which computes importance and
/// runs the contradiction check separately.
pub struct MemoryExtractionDetector;

#[async_trait]
impl Detectable<ExtractedFact> for MemoryExtractionDetector {
    async fn detect_llm(
        &self,
        llm: &dyn DetectorLlm,
        message: &str,
        _context: &DetectorContext,
    ) -> Result<Option<Scored<ExtractedFact>>> {
        if is_question_or_command(message) {
            return Ok(None);
        }
        let prompt = format!(
            "Extract a durable fact about the user from this message, if any. \
             Never extract questions or commands directed at the assistant. \
             Respond as JSON {{\"content\":string|null,\"category\":string,\"confidence\":0-1}}.\n\nMessage: {message}"
        );
        let raw = llm.infer(&prompt).await?;
        let parsed: RawFact = serde_json::from_str(&raw)
            .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;
        let Some(content) = parsed.content else {
            return Ok(None);
        };
        Ok(Some(Scored {
            confidence: parsed.confidence,
            value: ExtractedFact {
                content,
                category: parsed.category,
                confidence: parsed.confidence,
            },
        }))
    }

    fn detect_pattern(&self, message: &str, _context: &DetectorContext) -> Option<Scored<ExtractedFact>> {
        if is_question_or_command(message) {
            return None;
        }
        let lower = message.to_lowercase();
        let category = if INSTRUCTION_MARKERS.iter().any(|m| lower.contains(m)) {
            MemoryCategoryHint::Instruction
        } else if GOAL_MARKERS.iter().any(|m| lower.contains(m)) {
            MemoryCategoryHint::Goal
        } else if RELATIONSHIP_MARKERS.iter().any(|m| lower.contains(m)) {
            MemoryCategoryHint::Relationship
        } else if EVENT_MARKERS.iter().any(|m| lower.contains(m)) {
            MemoryCategoryHint::Event
        } else if PERSONAL_FACT_MARKERS.iter().any(|m| lower.contains(m)) {
            MemoryCategoryHint::PersonalFact
        } else if PREFERENCE_MARKERS.iter().any(|m| lower.contains(m)) {
            MemoryCategoryHint::Preference
        } else {
            return None;
        };
        let confidence = if INSTRUCTION_MARKERS.iter().any(|m| lower.contains(m)) {
            1.0
        } else {
            0.55
        };
        Some(Scored {
            confidence,
            value: ExtractedFact {
                content: message.trim().to_string(),
                category,
                confidence,
            },
        })
    }
}

#[derive(Deserialize)]
struct RawFact {
    content: Option<String>,
    category: MemoryCategoryHint,
    confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_is_never_extracted() {
        let d = MemoryExtractionDetector;
        assert!(d
            .detect_pattern("do I like chocolate?", &DetectorContext::default())
            .is_none());
        assert!(d
            .detect_pattern("what is my favorite color", &DetectorContext::default())
            .is_none());
    }

    #[test]
    fn command_to_assistant_is_not_extracted() {
        let d = MemoryExtractionDetector;
        assert!(d
            .detect_pattern("tell me about dinosaurs", &DetectorContext::default())
            .is_none());
    }

    #[test]
    fn statement_of_preference_is_extracted() {
        let d = MemoryExtractionDetector;
        let r = d
            .detect_pattern("I like chocolate", &DetectorContext::default())
            .unwrap();
        assert_eq!(r.value.category, MemoryCategoryHint::Preference);
    }

    #[test]
    fn explicit_mention_saturates_confidence() {
        let d = MemoryExtractionDetector;
        let r = d
            .detect_pattern("remember that I'm allergic to peanuts", &DetectorContext::default())
            .unwrap();
        assert_eq!(r.confidence, 1.0);
    }
}

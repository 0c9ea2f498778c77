use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{DetectorError, Result};
use crate::types::DetectorLlm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionReason {
    /// Opposite sentiment on the same topic.
    Opposite,
    /// "used to like X" vs "don't like X now" — agreement, not contradiction.
    Temporal,
    /// Different specificity ("like reading" vs "dislike romance novels").
    Specificity,
    Unrelated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionVerdict {
    pub is_contradiction: bool,
    pub confidence: f64,
    pub reason: ContradictionReason,
}

const POSITIVE_MARKERS: &[&str] = &["like", "love", "enjoy", "prefer", "glad", "happy with"];
const NEGATIVE_MARKERS: &[&str] = &["don't like", "doesn't like", "dislike", "hate", "no longer", "not a fan", "can't stand"];
const TEMPORAL_MARKERS: &[&str] = &["used to", "no longer", "not anymore", "anymore"];

const STOPWORDS: &[&str] = &[
    "i", "a", "an", "the", "to", "of", "dont", "doesnt", "do", "does", "not", "am", "is", "are",
    "my", "with", "used", "anymore", "now",
];

/// Tokenizes on non-alphanumeric boundaries after dropping apostrophes, so
/// a contraction like "don't" survives as a single stopword token ("dont")
/// instead of splitting into "don" + "t" — the latter would shrink topic
/// overlap for every contracted-negative sentence and starve the temporal
/// guard below of the agreement it's meant to catch.
fn topic_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .replace('\'', "")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn polarity(text: &str) -> i8 {
    let lower = text.to_lowercase();
    if NEGATIVE_MARKERS.iter().any(|m| lower.contains(m)) {
        -1
    } else if POSITIVE_MARKERS.iter().any(|m| lower.contains(m)) {
        1
    } else {
        0
    }
}

/// MemoryEngine's contradiction check (spec §4.5 step 3). This is not a
/// single-message `Detectable<T>` — it judges a *pair* of texts (an
/// existing memory vs a candidate new one) — so it follows the same
/// hybrid contract (LLM-first, pattern-fallback) by hand rather than
/// through the generic wrapper.
pub struct ContradictionDetector;

impl ContradictionDetector {
    pub const MIN_CONFIDENCE: f64 = 0.7;

    pub async fn judge(
        &self,
        llm: Option<&dyn DetectorLlm>,
        existing_text: &str,
        new_text: &str,
    ) -> ContradictionVerdict {
        if let Some(llm) = llm {
            match self.judge_llm(llm, existing_text, new_text).await {
                Ok(Some(v)) if v.confidence >= Self::MIN_CONFIDENCE => return v,
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "contradiction judge llm call failed"),
            }
        }
        self.judge_pattern(existing_text, new_text)
    }

    async fn judge_llm(
        &self,
        llm: &dyn DetectorLlm,
        existing_text: &str,
        new_text: &str,
    ) -> Result<Option<ContradictionVerdict>> {
        let prompt = format!(
            "Do these two statements about the same user contradict each other? \
             Distinguish opposite sentiment (contradiction) from a temporal change \
             (\"used to like X\" vs \"don't like X now\" — not a contradiction, both \
             agree on the current state) and from a difference in specificity \
             (\"like reading\" vs \"dislike romance novels\" — not a contradiction). \
             Respond as JSON {{\"is_contradiction\":bool,\"confidence\":0-1,\"reason\":\
             \"opposite\"|\"temporal\"|\"specificity\"|\"unrelated\"}}.\n\n\
             Existing: {existing_text}\nNew: {new_text}"
        );
        let raw = llm.infer(&prompt).await?;
        let parsed: ContradictionVerdict = serde_json::from_str(&raw)
            .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;
        Ok(Some(parsed))
    }

    fn judge_pattern(&self, existing_text: &str, new_text: &str) -> ContradictionVerdict {
        let existing_lower = existing_text.to_lowercase();
        let old_topics = topic_words(existing_text);
        let new_topics = topic_words(new_text);
        let intersection = old_topics.intersection(&new_topics).count();
        let union = old_topics.union(&new_topics).count().max(1);
        let overlap = intersection as f64 / union as f64;

        if TEMPORAL_MARKERS.iter().any(|m| existing_lower.contains(m)) && overlap >= 0.5 {
            return ContradictionVerdict {
                is_contradiction: false,
                confidence: 0.8,
                reason: ContradictionReason::Temporal,
            };
        }

        let old_pol = polarity(existing_text);
        let new_pol = polarity(new_text);

        if old_pol == 0 || new_pol == 0 {
            return ContradictionVerdict {
                is_contradiction: false,
                confidence: 0.3,
                reason: ContradictionReason::Unrelated,
            };
        }

        if overlap < 0.5 {
            return ContradictionVerdict {
                is_contradiction: false,
                confidence: 0.6,
                reason: ContradictionReason::Specificity,
            };
        }

        if old_pol != new_pol {
            ContradictionVerdict {
                is_contradiction: true,
                confidence: 0.85,
                reason: ContradictionReason::Opposite,
            }
        } else {
            ContradictionVerdict {
                is_contradiction: false,
                confidence: 0.7,
                reason: ContradictionReason::Unrelated,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge(old: &str, new: &str) -> ContradictionVerdict {
        ContradictionDetector.judge_pattern(old, new)
    }

    #[test]
    fn opposite_sentiment_is_contradiction() {
        let v = judge("I like chocolate", "I don't like chocolate");
        assert!(v.is_contradiction);
        assert_eq!(v.reason, ContradictionReason::Opposite);
    }

    #[test]
    fn temporal_change_is_not_contradiction() {
        let v = judge("I used to smoke", "I don't smoke");
        assert!(!v.is_contradiction);
        assert_eq!(v.reason, ContradictionReason::Temporal);
    }

    #[test]
    fn specificity_mismatch_is_not_contradiction() {
        let v = judge("I enjoy reading", "I don't like romance novels");
        assert!(!v.is_contradiction);
        assert_eq!(v.reason, ContradictionReason::Specificity);
    }
}

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::types::{ClassificationResult, JudgeVerdict, Label};

/// Narrow interface to the optional Layer-4 LLM judge — the same shape as
/// `skynet-agent::provider::LlmProvider` so this crate depends on an
/// interface, not a concrete HTTP client (spec §1 "external collaborators
/// with contracts").
#[async_trait]
pub trait JudgeProvider: Send + Sync {
    async fn judge(
        &self,
        normalized_text: &str,
        pattern_label: Label,
        pattern_confidence: f64,
    ) -> Result<JudgeVerdict, crate::error::ClassifierError>;
}

/// Bounded, process-local memoization cache keyed by normalized-text hash
/// (spec §9 "LLM-judge result caching"). Eviction pattern grounded on
/// `skynet-users::resolver::UserResolver`'s bounded cache (half-evict
/// oldest insertions once the cap is hit).
pub struct JudgeCache {
    entries: DashMap<u64, JudgeVerdict>,
    insert_order: std::sync::Mutex<Vec<u64>>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl JudgeCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            insert_order: std::sync::Mutex::new(Vec::new()),
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn hash_of(normalized_text: &str) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for b in normalized_text.as_bytes() {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    pub fn get(&self, normalized_text: &str) -> Option<JudgeVerdict> {
        let key = Self::hash_of(normalized_text);
        let hit = self.entries.get(&key).map(|v| v.clone());
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn insert(&self, normalized_text: &str, verdict: JudgeVerdict) {
        let key = Self::hash_of(normalized_text);
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            let mut order = self.insert_order.lock().unwrap();
            let evict_count = (self.max_entries / 2).max(1);
            for _ in 0..evict_count {
                if let Some(oldest) = order.first().copied() {
                    order.remove(0);
                    self.entries.remove(&oldest);
                } else {
                    break;
                }
            }
        }
        self.entries.insert(key, verdict);
        self.insert_order.lock().unwrap().push(key);
    }
}

impl Default for JudgeCache {
    fn default() -> Self {
        Self::new(2048)
    }
}

/// When the judge is consulted (spec §4.1 Layer 4 trigger conditions).
pub fn should_invoke_judge(
    confidence_threshold: f64,
    pattern_confidence: f64,
    indicator_family_count: usize,
    explicit_score_band: bool,
    suggestive_score_band: bool,
) -> bool {
    pattern_confidence < confidence_threshold
        || indicator_family_count >= 3
        || explicit_score_band
        || suggestive_score_band
}

/// Blending rule (Layer 3 ⊕ Layer 4), spec §4.1. `judge_confidence_floor` is
/// the fixed 0.85 threshold at which the judge always wins outright.
pub fn blend(
    pattern_label: Label,
    pattern_confidence: f64,
    judge: &JudgeVerdict,
) -> (Label, f64) {
    const JUDGE_WINS_FLOOR: f64 = 0.85;
    if judge.confidence >= JUDGE_WINS_FLOOR {
        return (judge.label, judge.confidence);
    }
    if judge.label == pattern_label {
        return (pattern_label, (pattern_confidence + 0.15).min(1.0));
    }
    if judge.label.is_more_restrictive_than(&pattern_label) {
        return (judge.label, judge.confidence);
    }
    (pattern_label, pattern_confidence)
}

/// Applies an already-computed judge verdict onto a Layer-3-only result,
/// recording the blended outcome. Used by `classify_with_judge`.
pub(crate) fn apply_judge(
    mut result: ClassificationResult,
    judge: JudgeVerdict,
) -> ClassificationResult {
    let (label, confidence) = blend(result.label, result.confidence, &judge);
    result.label = label;
    result.confidence = confidence;
    result.layer_trace.judge_invoked = true;
    result.layer_trace.judge_label = Some(judge.label);
    result.layer_trace.judge_confidence = Some(judge.confidence);
    if label == judge.label && confidence == judge.confidence {
        result.layer_trace.deciding_layer = crate::types::DecidingLayer::LlmJudge;
    }
    result
}

pub use std::sync::Arc as JudgeProviderHandle;
pub type SharedJudgeProvider = Arc<dyn JudgeProvider>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn judge_wins_outright_above_floor() {
        let v = JudgeVerdict { label: Label::Safe, confidence: 0.9, reasoning: "ok".into() };
        let (label, conf) = blend(Label::Suggestive, 0.5, &v);
        assert_eq!(label, Label::Safe);
        assert_eq!(conf, 0.9);
    }

    #[test]
    fn agreement_boosts_pattern_confidence() {
        let v = JudgeVerdict { label: Label::Suggestive, confidence: 0.6, reasoning: "agree".into() };
        let (label, conf) = blend(Label::Suggestive, 0.5, &v);
        assert_eq!(label, Label::Suggestive);
        assert!((conf - 0.65).abs() < 1e-9);
    }

    #[test]
    fn more_restrictive_judge_wins_safety_bias() {
        let v = JudgeVerdict { label: Label::ExplicitFetish, confidence: 0.6, reasoning: "worse".into() };
        let (label, _) = blend(Label::Suggestive, 0.5, &v);
        assert_eq!(label, Label::ExplicitFetish);
    }

    #[test]
    fn less_restrictive_judge_never_silently_downgrades() {
        let v = JudgeVerdict { label: Label::Safe, confidence: 0.5, reasoning: "less".into() };
        let (label, conf) = blend(Label::ExplicitConsensualAdult, 0.8, &v);
        assert_eq!(label, Label::ExplicitConsensualAdult);
        assert_eq!(conf, 0.8);
    }

    #[test]
    fn cache_evicts_half_when_full() {
        let cache = JudgeCache::new(4);
        for i in 0..4 {
            cache.insert(
                &format!("text-{i}"),
                JudgeVerdict { label: Label::Safe, confidence: 0.5, reasoning: String::new() },
            );
        }
        cache.insert(
            "text-overflow",
            JudgeVerdict { label: Label::Safe, confidence: 0.5, reasoning: String::new() },
        );
        assert!(cache.entries.len() <= 4);
        assert!(cache.get("text-overflow").is_some());
    }
}

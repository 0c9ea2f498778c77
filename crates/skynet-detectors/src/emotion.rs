use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};
use crate::types::{Detectable, DetectorContext, DetectorLlm, Scored};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Med,
    High,
}

/// Output of the emotion detector; trimmed to `EmotionRecord`'s shape by
/// the orchestrator before persistence (spec §3 EmotionRecord, I4: snippet
/// retention is capped at 100 chars there, not here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionResult {
    pub emotion: String,
    pub confidence: f64,
    pub intensity: Intensity,
    pub indicators: Vec<String>,
}

const KEYWORDS: &[(&str, &str, Intensity)] = &[
    ("thrilled", "joy", Intensity::High),
    ("excited", "joy", Intensity::High),
    ("happy", "joy", Intensity::Med),
    ("glad", "joy", Intensity::Low),
    ("devastated", "sadness", Intensity::High),
    ("heartbroken", "sadness", Intensity::High),
    ("sad", "sadness", Intensity::Med),
    ("down", "sadness", Intensity::Low),
    ("furious", "anger", Intensity::High),
    ("pissed", "anger", Intensity::High),
    ("angry", "anger", Intensity::Med),
    ("annoyed", "anger", Intensity::Low),
    ("terrified", "fear", Intensity::High),
    ("scared", "fear", Intensity::Med),
    ("nervous", "fear", Intensity::Low),
    ("anxious", "fear", Intensity::Low),
    ("grateful", "gratitude", Intensity::Med),
    ("thankful", "gratitude", Intensity::Med),
    ("lonely", "loneliness", Intensity::Med),
    ("alone", "loneliness", Intensity::Low),
];

/// Pattern-fallback emotion detector (spec §4.6). Keyword-table scoring
/// grounded on the shape of `skynet-classifier::rules`'s fast-rule keyword
/// table, applied to a different vocabulary (affect terms instead of
/// safety markers).
pub struct EmotionDetector;

#[async_trait]
impl Detectable<EmotionResult> for EmotionDetector {
    fn min_confidence(&self) -> f64 {
        0.7
    }

    async fn detect_llm(
        &self,
        llm: &dyn DetectorLlm,
        message: &str,
        _context: &DetectorContext,
    ) -> Result<Option<Scored<EmotionResult>>> {
        let prompt = format!(
            "Classify the primary emotion expressed in this message. \
             Respond as JSON {{\"emotion\":string,\"confidence\":0-1,\"intensity\":\"low\"|\"med\"|\"high\",\"indicators\":[string]}}.\n\nMessage: {message}"
        );
        let raw = llm.infer(&prompt).await?;
        let parsed: RawEmotion = serde_json::from_str(&raw)
            .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;
        Ok(Some(Scored {
            confidence: parsed.confidence,
            value: EmotionResult {
                emotion: parsed.emotion,
                confidence: parsed.confidence,
                intensity: parsed.intensity,
                indicators: parsed.indicators,
            },
        }))
    }

    fn detect_pattern(&self, message: &str, _context: &DetectorContext) -> Option<Scored<EmotionResult>> {
        let lower = message.to_lowercase();
        let mut hits: Vec<(&str, &str, Intensity)> = Vec::new();
        for &(kw, emotion, intensity) in KEYWORDS {
            if lower.contains(kw) {
                hits.push((kw, emotion, intensity));
            }
        }
        let (_, emotion, intensity) = hits.first().copied()?;
        let indicators = hits.iter().map(|(kw, ..)| kw.to_string()).collect::<Vec<_>>();
        let confidence = 0.4 + 0.1 * (hits.len().min(3) as f64);
        Some(Scored {
            confidence,
            value: EmotionResult {
                emotion: emotion.to_string(),
                confidence,
                intensity,
                indicators,
            },
        })
    }
}

#[derive(Deserialize)]
struct RawEmotion {
    emotion: String,
    confidence: f64,
    intensity: Intensity,
    indicators: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_joy_keyword() {
        let d = EmotionDetector;
        let r = d
            .detect_pattern("I'm so thrilled about this!", &DetectorContext::default())
            .unwrap();
        assert_eq!(r.value.emotion, "joy");
        assert_eq!(r.value.intensity, Intensity::High);
    }

    #[test]
    fn no_keyword_returns_none() {
        let d = EmotionDetector;
        assert!(d
            .detect_pattern("the weather is cloudy today", &DetectorContext::default())
            .is_none());
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};
use crate::types::{Detectable, DetectorContext, DetectorLlm, Scored};

/// The nine named archetypes (spec §3 Personality, glossary). Kept as a
/// plain string in the wire/storage layer (`skynet-personality` owns the
/// authoritative enum); this detector only needs to name a suggestion.
pub const ARCHETYPES: &[&str] = &[
    "wise_mentor",
    "supportive_friend",
    "girlfriend",
    "boyfriend",
    "life_coach",
    "playful_companion",
    "intellectual_sparring_partner",
    "caretaker",
    "adventurer",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalitySuggestion {
    pub archetype: String,
    pub confidence: f64,
}

const TRIGGERS: &[(&str, &str)] = &[
    ("be my girlfriend", "girlfriend"),
    ("be my gf", "girlfriend"),
    ("be my boyfriend", "boyfriend"),
    ("be my bf", "boyfriend"),
    ("be my mentor", "wise_mentor"),
    ("be my coach", "life_coach"),
    ("be my friend", "supportive_friend"),
    ("be my companion", "playful_companion"),
];

/// Personality-preference detector (spec §4.4 step 6/7): infers a
/// requested archetype switch from the user's own words. The orchestrator
/// treats its output as taking precedence over the pre-fan-out loaded
/// config for the current turn (spec §4.4 step 7, scenario 5).
pub struct PersonalityDetector;

#[async_trait]
impl Detectable<PersonalitySuggestion> for PersonalityDetector {
    async fn detect_llm(
        &self,
        llm: &dyn DetectorLlm,
        message: &str,
        _context: &DetectorContext,
    ) -> Result<Option<Scored<PersonalitySuggestion>>> {
        let prompt = format!(
            "Does this message request a companion persona/archetype switch? \
             Known archetypes: {}. Respond as JSON {{\"archetype\":string|null,\"confidence\":0-1}}.\n\nMessage: {message}",
            ARCHETYPES.join(", ")
        );
        let raw = llm.infer(&prompt).await?;
        let parsed: RawSuggestion = serde_json::from_str(&raw)
            .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;
        let Some(archetype) = parsed.archetype else {
            return Ok(None);
        };
        Ok(Some(Scored {
            confidence: parsed.confidence,
            value: PersonalitySuggestion {
                archetype,
                confidence: parsed.confidence,
            },
        }))
    }

    fn detect_pattern(
        &self,
        message: &str,
        _context: &DetectorContext,
    ) -> Option<Scored<PersonalitySuggestion>> {
        let lower = message.to_lowercase();
        TRIGGERS
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|(_, archetype)| Scored {
                confidence: 0.75,
                value: PersonalitySuggestion {
                    archetype: archetype.to_string(),
                    confidence: 0.75,
                },
            })
    }
}

#[derive(Deserialize)]
struct RawSuggestion {
    archetype: Option<String>,
    confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_my_girlfriend_suggests_girlfriend_archetype() {
        let d = PersonalityDetector;
        let r = d
            .detect_pattern("be my girlfriend please", &DetectorContext::default())
            .unwrap();
        assert_eq!(r.value.archetype, "girlfriend");
        assert!(r.value.confidence >= 0.7);
    }

    #[test]
    fn unrelated_message_yields_none() {
        let d = PersonalityDetector;
        assert!(d
            .detect_pattern("what's 2 + 2?", &DetectorContext::default())
            .is_none());
    }
}

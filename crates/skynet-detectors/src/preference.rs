use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};
use crate::types::{Detectable, DetectorContext, DetectorLlm, Scored};

/// One field of `PreferenceProfile` (spec §3) the user asked to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    pub field: PreferenceField,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceField {
    Formality,
    Tone,
    EmojiUsage,
    ResponseLength,
    ExplanationStyle,
}

const TRIGGERS: &[(&str, PreferenceField, &str)] = &[
    ("be more formal", PreferenceField::Formality, "formal"),
    ("be less formal", PreferenceField::Formality, "casual"),
    ("talk casually", PreferenceField::Formality, "casual"),
    ("stop using emoji", PreferenceField::EmojiUsage, "none"),
    ("no emojis", PreferenceField::EmojiUsage, "none"),
    ("use more emoji", PreferenceField::EmojiUsage, "frequent"),
    ("keep it short", PreferenceField::ResponseLength, "short"),
    ("keep responses brief", PreferenceField::ResponseLength, "short"),
    ("give me more detail", PreferenceField::ResponseLength, "long"),
    ("explain like i'm five", PreferenceField::ExplanationStyle, "simple"),
    ("eli5", PreferenceField::ExplanationStyle, "simple"),
    ("be blunt", PreferenceField::Tone, "blunt"),
    ("be gentle", PreferenceField::Tone, "gentle"),
];

/// Communication-preference detector (spec §4.4 step 6). May update
/// `PreferenceProfile` for the current user.
pub struct PreferenceDetector;

#[async_trait]
impl Detectable<PreferenceUpdate> for PreferenceDetector {
    async fn detect_llm(
        &self,
        llm: &dyn DetectorLlm,
        message: &str,
        _context: &DetectorContext,
    ) -> Result<Option<Scored<PreferenceUpdate>>> {
        let prompt = format!(
            "Does this message ask to change how the assistant communicates \
             (formality, tone, emoji usage, response length, explanation style)? \
             Respond as JSON {{\"field\":string|null,\"value\":string|null,\"confidence\":0-1}}.\n\nMessage: {message}"
        );
        let raw = llm.infer(&prompt).await?;
        let parsed: RawUpdate = serde_json::from_str(&raw)
            .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;
        let (Some(field), Some(value)) = (parsed.field, parsed.value) else {
            return Ok(None);
        };
        Ok(Some(Scored {
            confidence: parsed.confidence,
            value: PreferenceUpdate { field, value },
        }))
    }

    fn detect_pattern(&self, message: &str, _context: &DetectorContext) -> Option<Scored<PreferenceUpdate>> {
        let lower = message.to_lowercase();
        TRIGGERS
            .iter()
            .find(|(phrase, ..)| lower.contains(phrase))
            .map(|(_, field, value)| Scored {
                confidence: 0.7,
                value: PreferenceUpdate {
                    field: *field,
                    value: value.to_string(),
                },
            })
    }
}

#[derive(Deserialize)]
struct RawUpdate {
    field: Option<PreferenceField>,
    value: Option<String>,
    confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formality_request() {
        let d = PreferenceDetector;
        let r = d
            .detect_pattern("can you be more formal please", &DetectorContext::default())
            .unwrap();
        assert_eq!(r.value.field, PreferenceField::Formality);
        assert_eq!(r.value.value, "formal");
    }
}

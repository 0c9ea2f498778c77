use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use skynet_agent::provider::{ChatRequest, LlmProvider, Message, Role};
use skynet_classifier::error::ClassifierError;
use skynet_classifier::judge::JudgeProvider;
use skynet_classifier::types::{JudgeVerdict, Label};
use skynet_detectors::error::DetectorError;
use skynet_detectors::types::DetectorLlm;

const STRUCTURED_OUTPUT_SYSTEM: &str =
    "Respond with exactly one JSON object matching the requested shape. No prose, no markdown fences, no explanation.";

const JUDGE_SYSTEM: &str = "You are a content-safety re-classifier, a second opinion after a pattern-matching \
     layer. Respond with exactly one JSON object: {\"label\":\"safe\"|\"suggestive\"|\
     \"explicit_consensual_adult\"|\"explicit_fetish\"|\"nonconsensual\"|\"minor_risk\",\"confidence\":0-1,\
     \"reasoning\":string}.";

/// Adapts `skynet_agent::LlmProvider` to the narrow interfaces
/// `skynet-detectors` (`DetectorLlm`) and `skynet-classifier`
/// (`JudgeProvider`) depend on, so neither crate needs a dependency on the
/// concrete provider/router stack — the same "capability trait, not a
/// concrete client" framing those crates already use for their own traits.
///
/// One adapter instance is shared across every detector and the
/// classifier's Layer 4 judge; `model` is deliberately independent of
/// whichever model the route's generation call picks (spec §6
/// `orchestrator.detector_model`).
pub struct AgentLlmAdapter {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl AgentLlmAdapter {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, skynet_agent::provider::ProviderError> {
        let req = ChatRequest {
            model: self.model.clone(),
            system: system.to_string(),
            system_prompt: None,
            messages: vec![Message { role: Role::User, content: user.to_string() }],
            max_tokens: 512,
            stream: false,
            thinking: None,
            tools: Vec::new(),
            raw_messages: None,
        };
        let resp = self.llm.send(&req).await?;
        Ok(resp.content)
    }
}

#[async_trait]
impl DetectorLlm for AgentLlmAdapter {
    async fn infer(&self, prompt: &str) -> Result<String, DetectorError> {
        self.complete(STRUCTURED_OUTPUT_SYSTEM, prompt)
            .await
            .map_err(|e| DetectorError::Llm(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    label: Label,
    confidence: f64,
    reasoning: String,
}

#[async_trait]
impl JudgeProvider for AgentLlmAdapter {
    async fn judge(
        &self,
        normalized_text: &str,
        pattern_label: Label,
        pattern_confidence: f64,
    ) -> Result<JudgeVerdict, ClassifierError> {
        let prompt = format!(
            "A pattern-matching layer already classified this text as {pattern_label} \
             (confidence {pattern_confidence:.2}). Re-classify it independently.\n\nText: {normalized_text}"
        );
        let raw = self
            .complete(JUDGE_SYSTEM, &prompt)
            .await
            .map_err(|e| ClassifierError::Judge(e.to_string()))?;
        let parsed: RawVerdict = serde_json::from_str(&raw)
            .map_err(|e| ClassifierError::Judge(format!("malformed judge response: {e}")))?;
        Ok(JudgeVerdict {
            label: parsed.label,
            confidence: parsed.confidence,
            reasoning: parsed.reasoning,
        })
    }
}

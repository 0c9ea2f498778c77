use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a detector should resolve its verdict (spec §4.6, §6 `detector.*.method`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMethod {
    Llm,
    Pattern,
    Hybrid,
}

impl Default for DetectorMethod {
    fn default() -> Self {
        Self::Hybrid
    }
}

/// Recent conversation context handed to every detector. Read-only.
#[derive(Debug, Clone, Default)]
pub struct DetectorContext {
    /// Most recent messages first, oldest last — callers truncate to
    /// whatever window they keep (the orchestrator passes the short-term
    /// buffer's tail).
    pub recent_messages: Vec<String>,
}

/// A detector result paired with the confidence that produced it.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub value: T,
    pub confidence: f64,
}

/// Narrow capability interface for the "LLM" half of a hybrid detector.
/// Shaped like `skynet_agent::provider::LlmProvider` — a single
/// structured-output call, so this crate has no dependency on any
/// concrete provider client.
#[async_trait]
pub trait DetectorLlm: Send + Sync {
    async fn infer(&self, prompt: &str) -> Result<String>;
}

/// Capability set every detector exposes (spec §4.6, §9 "Polymorphic
/// detector contract" — composition over inheritance).
#[async_trait]
pub trait Detectable<T>: Send + Sync {
    /// Detector-specific minimum confidence for accepting the LLM result
    /// before falling back to pattern scoring (spec §9: 0.5 for goal, 0.7
    /// for emotion, 0.6 default).
    fn min_confidence(&self) -> f64 {
        0.6
    }

    async fn detect_llm(
        &self,
        llm: &dyn DetectorLlm,
        message: &str,
        context: &DetectorContext,
    ) -> Result<Option<Scored<T>>>;

    fn detect_pattern(&self, message: &str, context: &DetectorContext) -> Option<Scored<T>>;
}

/// Generic hybrid wrapper (spec §4.6 steps 1-3), implemented once over any
/// `Detectable<T>` instead of per-detector. Detectors are side-effect-free;
/// the orchestrator performs the persistence step after merging results.
pub struct HybridDetector<T> {
    inner: Box<dyn Detectable<T>>,
    method: DetectorMethod,
}

impl<T> HybridDetector<T> {
    pub fn new(inner: Box<dyn Detectable<T>>, method: DetectorMethod) -> Self {
        Self { inner, method }
    }

    /// Timeouts are applied by the caller (spec §5: per-detector deadline,
    /// default 5s, degrade to `None` on expiry) via `tokio::time::timeout`
    /// wrapping this call — this method itself never times out.
    pub async fn run(
        &self,
        llm: Option<&dyn DetectorLlm>,
        message: &str,
        context: &DetectorContext,
    ) -> Option<T> {
        match self.method {
            DetectorMethod::Pattern => self.inner.detect_pattern(message, context).map(|s| s.value),
            DetectorMethod::Llm => match llm {
                Some(llm) => self
                    .inner
                    .detect_llm(llm, message, context)
                    .await
                    .ok()
                    .flatten()
                    .map(|s| s.value),
                None => None,
            },
            DetectorMethod::Hybrid => {
                if let Some(llm) = llm {
                    match self.inner.detect_llm(llm, message, context).await {
                        Ok(Some(scored)) if scored.confidence >= self.inner.min_confidence() => {
                            return Some(scored.value);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::debug!(error = %e, "detector llm call failed, falling back to pattern");
                        }
                    }
                }
                self.inner.detect_pattern(message, context).map(|s| s.value)
            }
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier verdict. Ordered least → most restrictive; the ordering is
/// load-bearing for the Layer 3/4 blending rule (`Label::is_more_restrictive_than`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Safe,
    Suggestive,
    ExplicitConsensualAdult,
    ExplicitFetish,
    Nonconsensual,
    MinorRisk,
}

impl Label {
    pub fn is_more_restrictive_than(&self, other: &Label) -> bool {
        self > other
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Label::Safe => "safe",
            Label::Suggestive => "suggestive",
            Label::ExplicitConsensualAdult => "explicit_consensual_adult",
            Label::ExplicitFetish => "explicit_fetish",
            Label::Nonconsensual => "nonconsensual",
            Label::MinorRisk => "minor_risk",
        };
        write!(f, "{}", s)
    }
}

/// Downstream behaviour selected for a single response (glossary: Route).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Normal,
    Romance,
    Explicit,
    Fetish,
    Refusal,
    HardRefusal,
}

impl Route {
    /// `route_lock_messages` is set on entering these two routes (spec §4.3 step 4).
    pub fn triggers_lock(&self) -> bool {
        matches!(self, Route::Explicit | Route::Fetish)
    }

    pub fn is_refusal(&self) -> bool {
        matches!(self, Route::Refusal | Route::HardRefusal)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::Normal => "normal",
            Route::Romance => "romance",
            Route::Explicit => "explicit",
            Route::Fetish => "fetish",
            Route::Refusal => "refusal",
            Route::HardRefusal => "hard_refusal",
        };
        write!(f, "{}", s)
    }
}

/// Which layer ultimately produced the verdict — part of `layer_trace` for
/// the audit record (spec §3 AuditRecord.layer_trace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidingLayer {
    FastRule,
    PatternScore,
    LlmJudge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerTrace {
    pub normalized_text: String,
    pub fast_rule_hit: Option<String>,
    pub pattern_label: Option<Label>,
    pub pattern_confidence: Option<f64>,
    pub judge_invoked: bool,
    pub judge_label: Option<Label>,
    pub judge_confidence: Option<f64>,
    pub deciding_layer: DecidingLayer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub layer_trace: LayerTrace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub label: Label,
    pub confidence: f64,
    pub reasoning: String,
}

pub mod classifier;
pub mod error;
pub mod judge;
pub mod normalize;
pub mod router;
pub mod rules;
pub mod types;

pub use classifier::{classify_layers_1_to_3, ContentClassifier};
pub use judge::{JudgeCache, JudgeProvider, SharedJudgeProvider};
pub use router::{route, RouteAction, RouteDecision};
pub use types::{ClassificationResult, DecidingLayer, JudgeVerdict, Label, LayerTrace, Route};

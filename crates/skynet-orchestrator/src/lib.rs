//! C10 — the single funnel every conversation turn passes through (spec
//! §4.4, §7). `pipeline::stream_chat` is the only code path that touches
//! the session/classifier/personality/memory/detector stack on the
//! request side; everything else in the gateway is a thin CRUD wrapper
//! over the managers held in `OrchestratorState`.

pub mod audit;
pub mod error;
pub mod llm_adapter;
pub mod pipeline;
pub mod state;

pub use error::{OrchestratorError, Result};
pub use llm_adapter::AgentLlmAdapter;
pub use pipeline::stream_chat;
pub use state::{OrchestratorState, RouteProviders};

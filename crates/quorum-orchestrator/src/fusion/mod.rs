//! Multi-agent fusion mode: several providers answer independently under
//! assigned roles, and one synthesizes the combined result.

pub mod agents;
pub mod classifier;
pub mod engine;

pub use agents::{Agent, AgentResponse, AgentRole};
pub use classifier::{classify, PromptAnalysis, PromptCategory};
pub use engine::{FusionConfig, FusionEngine, FusionError, FusionProviderConfig, FusionResponse};

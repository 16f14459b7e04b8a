//! Types for the provider routing system.

use quorum_abstraction::ProviderError;
use quorum_models::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The kind of answer a request expects.
///
/// Drives both capability filtering and strength scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// General conversation and Q&A.
    General,
    /// Code generation and debugging.
    Coding,
    /// Creative writing.
    Creative,
    /// Data analysis and transformation.
    Data,
    /// Technical explanation.
    Technical,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResponseType::General => "general",
            ResponseType::Coding => "coding",
            ResponseType::Creative => "creative",
            ResponseType::Data => "data",
            ResponseType::Technical => "technical",
        };
        f.write_str(s)
    }
}

impl ResponseType {
    /// Parses a lowercase name into a `ResponseType`.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "general" => Some(Self::General),
            "coding" => Some(Self::Coding),
            "creative" => Some(Self::Creative),
            "data" => Some(Self::Data),
            "technical" => Some(Self::Technical),
            _ => None,
        }
    }
}

/// Ordered prompt complexity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskComplexity {
    /// Short factual or conversational prompts.
    Simple,
    /// Prompts needing some structure or comparison.
    Moderate,
    /// Multi-constraint design or implementation prompts.
    Complex,
    /// Prompts demanding deep domain expertise.
    Expert,
}

impl TaskComplexity {
    /// Fixed confidence penalty applied by the router for this tier.
    #[must_use]
    pub fn confidence_penalty(&self) -> f64 {
        match self {
            TaskComplexity::Simple => 0.0,
            TaskComplexity::Moderate => -0.05,
            TaskComplexity::Complex => -0.1,
            TaskComplexity::Expert => -0.15,
        }
    }
}

impl fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskComplexity::Simple => "simple",
            TaskComplexity::Moderate => "moderate",
            TaskComplexity::Complex => "complex",
            TaskComplexity::Expert => "expert",
        };
        f.write_str(s)
    }
}

/// Whether the caller wants the fastest answer, the best answer, or a
/// balance of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutePriority {
    /// Minimize latency.
    Speed,
    /// Maximize answer quality.
    Quality,
    /// Default trade-off.
    Balanced,
}

/// The analyzer's reading of a single prompt.
///
/// Created fresh per request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAnalysis {
    /// The analyzed prompt, lowercased scans are done against this.
    pub prompt: String,
    /// The requested response type, passed through.
    pub response_type: ResponseType,
    /// Estimated complexity tier.
    pub complexity: TaskComplexity,
    /// Provider features the prompt appears to need.
    pub required_features: Vec<crate::registry::Feature>,
    /// Crude token estimate: `ceil(words * 1.3)`.
    pub estimated_tokens: u32,
    /// Speed/quality priority derived from the prompt.
    pub priority: RoutePriority,
}

/// Caller constraints and inputs for a single-provider routed request.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// The user message to send upstream.
    pub message: String,
    /// The kind of answer expected.
    pub response_type: ResponseType,
    /// Maximum acceptable per-token cost, if any.
    pub max_cost_per_token: Option<f64>,
    /// Maximum acceptable latency in milliseconds. Used both as a
    /// pre-filter against historical average latency and as an enforced
    /// deadline on the dispatched call.
    pub max_latency_ms: Option<u64>,
    /// Minimum acceptable tracked success rate, if any. Untracked
    /// providers pass with an optimistic default of 1.0.
    pub min_reliability: Option<f64>,
    /// Provider to pin to the front of the ranked list, if present among
    /// the candidates. Used by the failover step.
    pub preferred_provider: Option<ProviderId>,
}

impl RouteRequest {
    /// Creates a request with no constraints.
    #[must_use]
    pub fn new(message: impl Into<String>, response_type: ResponseType) -> Self {
        Self {
            message: message.into(),
            response_type,
            max_cost_per_token: None,
            max_latency_ms: None,
            min_reliability: None,
            preferred_provider: None,
        }
    }
}

/// Result of a successfully routed request.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// The provider that produced the answer.
    pub provider: ProviderId,
    /// The answer text.
    pub response: String,
    /// Human-readable explanation of why this provider was chosen.
    pub explanation: String,
    /// Router confidence in the choice, in [0, 1].
    pub confidence: f64,
}

/// Errors produced by the routing path.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The suitability gate left no candidates. Fatal.
    #[error("No suitable provider for this request: {0}")]
    NoSuitableProvider(String),

    /// The dispatched call (and the one failover attempt, if any) failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

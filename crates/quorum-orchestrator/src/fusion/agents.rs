//! Fusion agents: role-assigned provider/model pairings.

use quorum_models::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Analytical stance assigned to one fusion agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Breaks the problem down and surfaces considerations.
    Analyst,
    /// Produces a direct, concrete answer.
    Implementer,
    /// Looks for flaws, gaps, and edge cases.
    Reviewer,
    /// Polishes for clarity and brevity.
    Optimizer,
}

impl AgentRole {
    /// Role rotation order for round-robin assignment.
    pub const ROTATION: [AgentRole; 4] =
        [AgentRole::Analyst, AgentRole::Implementer, AgentRole::Reviewer, AgentRole::Optimizer];

    /// Role assigned to the agent at the given dispatch index.
    #[must_use]
    pub fn for_index(index: usize) -> Self {
        Self::ROTATION[index % Self::ROTATION.len()]
    }

    /// Fixed instruction string describing the role's stance.
    #[must_use]
    pub fn instruction(&self) -> &'static str {
        match self {
            AgentRole::Analyst => {
                "You are an analyst. Break the request down, identify the key considerations, and answer with structured reasoning."
            }
            AgentRole::Implementer => {
                "You are an implementer. Give a direct, concrete, actionable answer to the request."
            }
            AgentRole::Reviewer => {
                "You are a reviewer. Answer the request while pointing out pitfalls, edge cases, and common mistakes."
            }
            AgentRole::Optimizer => {
                "You are an optimizer. Answer the request as clearly and concisely as possible, trimming anything inessential."
            }
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentRole::Analyst => "analyst",
            AgentRole::Implementer => "implementer",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Optimizer => "optimizer",
        };
        f.write_str(s)
    }
}

/// One configured fusion participant.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Upstream provider.
    pub provider: ProviderId,
    /// Model selection for the provider.
    pub model: String,
    /// Credential for the provider.
    pub api_key: String,
    /// Assigned analytical stance.
    pub role: AgentRole,
}

/// One agent's successful answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The provider that answered.
    pub provider: ProviderId,
    /// The role the agent held.
    pub role: AgentRole,
    /// The answer text.
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_rotation_wraps() {
        assert_eq!(AgentRole::for_index(0), AgentRole::Analyst);
        assert_eq!(AgentRole::for_index(3), AgentRole::Optimizer);
        assert_eq!(AgentRole::for_index(4), AgentRole::Analyst);
        assert_eq!(AgentRole::for_index(6), AgentRole::Reviewer);
    }

    #[test]
    fn test_each_role_has_distinct_instructions() {
        let instructions: Vec<&str> =
            AgentRole::ROTATION.iter().map(AgentRole::instruction).collect();
        for (i, a) in instructions.iter().enumerate() {
            for b in &instructions[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

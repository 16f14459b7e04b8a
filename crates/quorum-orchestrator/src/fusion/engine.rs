//! Multi-agent fusion: dispatch one prompt to several providers under
//! distinct roles, then have one of them synthesize a combined answer.

use crate::fusion::agents::{Agent, AgentResponse, AgentRole};
use crate::fusion::classifier::{classify, PromptAnalysis, PromptCategory};
use crate::settings::{api_key_setting, enabled_setting, model_setting, SettingsStore};
use crate::source::ModelSource;
use futures::future::join_all;
use quorum_abstraction::{ChatMessage, ProviderError};
use quorum_models::{ModelConfig, ProviderId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Minimum number of fully configured providers fusion requires.
const MIN_AGENTS: usize = 3;

/// Errors produced by the fusion path.
#[derive(Debug, Error)]
pub enum FusionError {
    /// Fewer than three providers qualified. Fatal, raised before any
    /// network call; the message enumerates what each provider lacks.
    #[error("Insufficient providers for fusion: {0}")]
    InsufficientProviders(String),

    /// Every agent call failed.
    #[error("All fusion agents failed")]
    AllAgentsFailed,

    /// The synthesizer call failed after the agents succeeded.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Per-provider configuration snapshot used to qualify fusion agents.
#[derive(Debug, Clone)]
pub struct FusionProviderConfig {
    /// The provider.
    pub provider: ProviderId,
    /// Credential, empty when unconfigured.
    pub api_key: String,
    /// Model selection, empty when unconfigured.
    pub model: String,
    /// Enabled flag, true unless explicitly disabled.
    pub enabled: bool,
}

/// The set of provider configurations offered to one fusion call.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Provider entries in dispatch order.
    pub providers: Vec<FusionProviderConfig>,
}

impl FusionConfig {
    /// Builds a config from explicit entries.
    #[must_use]
    pub fn new(providers: Vec<FusionProviderConfig>) -> Self {
        Self { providers }
    }

    /// Snapshots the settings store for the given providers.
    #[must_use]
    pub fn from_settings(settings: &dyn SettingsStore, providers: &[ProviderId]) -> Self {
        let providers = providers
            .iter()
            .map(|&provider| FusionProviderConfig {
                provider,
                api_key: settings.get(&api_key_setting(provider)).unwrap_or_default(),
                model: settings.get(&model_setting(provider)).unwrap_or_default(),
                enabled: settings.get(&enabled_setting(provider)).map_or(true, |v| v != "false"),
            })
            .collect();
        Self { providers }
    }
}

/// The externally visible result of one fusion call.
#[derive(Debug, Clone)]
pub struct FusionResponse {
    /// The synthesizer's combined answer.
    pub final_answer: String,
    /// Successful agent answers, in dispatch order.
    pub providers: Vec<AgentResponse>,
    /// The classifier's reading of the prompt.
    pub analysis: PromptAnalysis,
}

/// Stateless fusion engine. Each call is independent and retryable as a
/// whole.
pub struct FusionEngine {
    source: Arc<dyn ModelSource>,
}

impl FusionEngine {
    /// Creates a fusion engine over a model source.
    #[must_use]
    pub fn new(source: Arc<dyn ModelSource>) -> Self {
        Self { source }
    }

    /// Runs one fusion round: qualify, classify, dispatch all agents
    /// concurrently, then synthesize.
    ///
    /// # Errors
    /// Returns [`FusionError::InsufficientProviders`] before any network
    /// call when fewer than three providers qualify,
    /// [`FusionError::AllAgentsFailed`] when no agent call succeeds, or
    /// the synthesizer's error when the final call fails.
    pub async fn fuse(
        &self,
        message: &str,
        config: &FusionConfig,
    ) -> Result<FusionResponse, FusionError> {
        let agents = Self::qualify(config)?;
        let analysis = classify(message);
        debug!(
            agents = agents.len(),
            category = %analysis.category,
            confidence = analysis.confidence,
            "Starting fusion round"
        );

        let responses = self.dispatch_agents(&agents, message).await;
        if responses.is_empty() {
            return Err(FusionError::AllAgentsFailed);
        }

        let synthesizer = Self::select_synthesizer(&agents, &responses, analysis.category, message);
        let final_answer =
            self.synthesize(&synthesizer, &responses, analysis.category, message).await?;

        info!(
            synthesizer = %synthesizer.provider,
            agents = responses.len(),
            category = %analysis.category,
            "Fusion round completed"
        );

        Ok(FusionResponse { final_answer, providers: responses, analysis })
    }

    /// The fusion precondition gate. Runs before any network call.
    fn qualify(config: &FusionConfig) -> Result<Vec<Agent>, FusionError> {
        let mut agents = Vec::new();
        let mut problems = Vec::new();

        for entry in &config.providers {
            let mut missing = Vec::new();
            if entry.api_key.is_empty() {
                missing.push("missing API key");
            }
            if entry.model.is_empty() {
                missing.push("missing model selection");
            }
            if !entry.enabled {
                missing.push("disabled");
            }

            if missing.is_empty() {
                let role = AgentRole::for_index(agents.len());
                agents.push(Agent {
                    provider: entry.provider,
                    model: entry.model.clone(),
                    api_key: entry.api_key.clone(),
                    role,
                });
            } else {
                problems.push(format!("{}: {}", entry.provider, missing.join(", ")));
            }
        }

        if agents.len() < MIN_AGENTS {
            let detail = if problems.is_empty() {
                format!("only {} provider(s) configured", agents.len())
            } else {
                format!(
                    "{} of {} required providers qualified ({})",
                    agents.len(),
                    MIN_AGENTS,
                    problems.join("; ")
                )
            };
            return Err(FusionError::InsufficientProviders(detail));
        }

        Ok(agents)
    }

    /// Dispatches every agent concurrently; individual failures are
    /// logged and dropped, preserving the dispatch order of the
    /// survivors.
    async fn dispatch_agents(&self, agents: &[Agent], message: &str) -> Vec<AgentResponse> {
        let calls = agents.iter().map(|agent| {
            let model = self.source.model(&ModelConfig::new(
                agent.provider,
                agent.model.clone(),
                agent.api_key.clone(),
            ));
            let messages = vec![
                ChatMessage::system(agent.role.instruction()),
                ChatMessage::user(message),
            ];
            async move {
                let result = model.generate_chat_completion(&messages, None).await;
                (agent, result)
            }
        });

        let mut responses = Vec::with_capacity(agents.len());
        for (agent, result) in join_all(calls).await {
            match result {
                Ok(response) => responses.push(AgentResponse {
                    provider: agent.provider,
                    role: agent.role,
                    response: response.content,
                }),
                Err(err) => {
                    warn!(provider = %agent.provider, role = %agent.role, error = %err, "Fusion agent failed");
                }
            }
        }
        responses
    }

    /// Picks the synthesizer among the agents that responded: base
    /// category strength plus a keyword-match boost, falling back to the
    /// first agent when nothing scores above zero.
    fn select_synthesizer(
        agents: &[Agent],
        responses: &[AgentResponse],
        category: PromptCategory,
        message: &str,
    ) -> Agent {
        let lower = message.to_lowercase();
        let (matched, total) = category.keyword_hits(&lower);
        let boost = if total > 0 { matched as f64 / total as f64 * 0.2 } else { 0.0 };

        let mut best: Option<(&Agent, f64)> = None;
        for response in responses {
            let Some(agent) = agents.iter().find(|a| a.provider == response.provider) else {
                continue;
            };
            let score = (base_strength(agent.provider, category) + boost).min(1.0);
            if score > 0.0 && best.is_none_or(|(_, s)| score > s) {
                best = Some((agent, score));
            }
        }

        match best {
            Some((agent, score)) => {
                debug!(provider = %agent.provider, score, %category, "Selected synthesizer");
                agent.clone()
            }
            None => agents[0].clone(),
        }
    }

    /// Builds the synthesis prompt and dispatches it to the synthesizer.
    async fn synthesize(
        &self,
        synthesizer: &Agent,
        responses: &[AgentResponse],
        category: PromptCategory,
        message: &str,
    ) -> Result<String, FusionError> {
        let mut prompt = format!(
            "Several assistants answered the following request independently.\n\nRequest: {message}\n\n"
        );
        for response in responses {
            prompt.push_str(&format!("[{}] {}\n\n", response.role, response.response));
        }
        prompt.push_str(
            "Synthesize these answers into a single, best answer to the request. ",
        );
        prompt.push_str(category_emphasis(category));

        let model = self.source.model(&ModelConfig::new(
            synthesizer.provider,
            synthesizer.model.clone(),
            synthesizer.api_key.clone(),
        ));
        let response = model.generate_text(&prompt, None).await?;
        Ok(response.content)
    }
}

/// Base per-category provider strength table, in [0, 1].
fn base_strength(provider: ProviderId, category: PromptCategory) -> f64 {
    match (provider, category) {
        (ProviderId::OpenAi, PromptCategory::Code) => 0.9,
        (ProviderId::OpenAi, PromptCategory::Technical | PromptCategory::General) => 0.8,
        (ProviderId::OpenAi, PromptCategory::Creative) => 0.7,
        (ProviderId::Claude, PromptCategory::Creative | PromptCategory::Technical) => 0.9,
        (ProviderId::Claude, PromptCategory::Code | PromptCategory::General) => 0.8,
        (ProviderId::Gemini, PromptCategory::Technical) => 0.8,
        (ProviderId::Gemini, _) => 0.7,
        (ProviderId::OpenRouter, _) => 0.6,
        (ProviderId::Mock, _) => 0.5,
    }
}

/// Category-specific emphasis appended to the synthesis prompt.
fn category_emphasis(category: PromptCategory) -> &'static str {
    match category {
        PromptCategory::Creative => {
            "Preserve the strongest imagery and narrative voice from the answers."
        }
        PromptCategory::Technical => {
            "Keep the explanation precise and technically accurate; resolve any contradictions explicitly."
        }
        PromptCategory::Code => {
            "Ensure code snippets are complete, correct, and runnable as written."
        }
        PromptCategory::General => "Keep the answer clear, balanced, and directly useful.",
    }
}

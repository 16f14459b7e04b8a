//! Model factory for creating adapter instances from configuration.
//!
//! The factory is the provider-id-keyed registry that selects one
//! normalizer implementation per provider, so provider-specific field-path
//! and auth logic stays inside the adapters instead of leaking into
//! conditional branches at the call sites.

use crate::{ClaudeModel, GeminiModel, MockModel, OpenAiModel, OpenRouterModel};
use quorum_abstraction::{Model, ProviderError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// OpenAI GPT-family API.
    OpenAi,
    /// Anthropic Claude-family API.
    Claude,
    /// Google Gemini-family API.
    Gemini,
    /// OpenRouter aggregator API.
    OpenRouter,
    /// Mock provider for testing.
    Mock,
}

impl ProviderId {
    /// Canonical lowercase name, used as the settings-store key prefix.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::OpenRouter => "openrouter",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "claude" | "anthropic" => Ok(Self::Claude),
            "gemini" | "google" => Ok(Self::Gemini),
            "openrouter" => Ok(Self::OpenRouter),
            "mock" => Ok(Self::Mock),
            other => Err(ProviderError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Which provider to create an adapter for.
    pub provider: ProviderId,
    /// The model ID (e.g., "gpt-4o", "claude-sonnet-4-5").
    pub model_id: String,
    /// The credential for the provider's auth scheme.
    pub api_key: String,
    /// Optional base URL override. When set, the adapter performs the
    /// same-shaped call against this endpoint instead of the provider's
    /// public one (backend relay transport).
    pub base_url: Option<String>,
}

impl ModelConfig {
    /// Creates a new `ModelConfig`.
    #[must_use]
    pub fn new(provider: ProviderId, model_id: String, api_key: String) -> Self {
        Self { provider, model_id, api_key, base_url: None }
    }

    /// Sets a base URL override for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

/// Factory for creating model adapter instances.
pub struct ModelFactory;

impl ModelFactory {
    /// Creates a model adapter from the given configuration.
    ///
    /// # Errors
    /// Returns `ProviderError::UnsupportedProvider` only via
    /// [`Self::create_from_str`]; configurations carrying a parsed
    /// [`ProviderId`] always construct.
    pub fn create(config: ModelConfig) -> Arc<dyn Model> {
        debug!(
            provider = %config.provider,
            model_id = %config.model_id,
            relay = config.base_url.is_some(),
            "Creating model adapter"
        );

        match config.provider {
            ProviderId::OpenAi => {
                let mut model = OpenAiModel::new(config.model_id, config.api_key);
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                Arc::new(model)
            }
            ProviderId::Claude => {
                let mut model = ClaudeModel::new(config.model_id, config.api_key);
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                Arc::new(model)
            }
            ProviderId::Gemini => {
                let mut model = GeminiModel::new(config.model_id, config.api_key);
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                Arc::new(model)
            }
            ProviderId::OpenRouter => {
                let mut model = OpenRouterModel::new(config.model_id, config.api_key);
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                Arc::new(model)
            }
            ProviderId::Mock => Arc::new(MockModel::new(config.model_id)),
        }
    }

    /// Creates a model adapter from a provider name string.
    ///
    /// # Errors
    /// Returns `ProviderError::UnsupportedProvider` for unknown names.
    pub fn create_from_str(
        provider: &str,
        model_id: String,
        api_key: String,
    ) -> Result<Arc<dyn Model>, ProviderError> {
        let provider = ProviderId::from_str(provider)?;
        Ok(Self::create(ModelConfig::new(provider, model_id, api_key)))
    }
}

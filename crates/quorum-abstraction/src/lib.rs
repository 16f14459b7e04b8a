//! Provider abstraction layer for Quorum.
//!
//! This crate defines the core trait and types for talking to upstream
//! LLM providers. Every provider adapter in `quorum-models` implements
//! [`Model`], and both the router and the fusion engine consume providers
//! exclusively through it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an error that can occur when calling an upstream provider.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderError {
    /// The provider id is unknown or not configured. Fatal: this is a
    /// caller configuration error, never retried.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// The upstream API returned a non-2xx status. Retryable by the
    /// router's one-step failover.
    #[error("Provider HTTP error ({status}): {body}")]
    Http {
        /// Upstream HTTP status code.
        status: u16,
        /// Upstream response body, passed through verbatim.
        body: String,
    },

    /// The response decoded, but the expected field path was absent.
    /// Treated identically to an HTTP error for retry purposes.
    #[error("Malformed provider response: {0}")]
    ResponseShape(String),

    /// The request never produced a response (network/transport failure).
    #[error("Request error: {0}")]
    Request(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProviderError {
    /// Whether the router's one-step failover may retry after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::ResponseShape(_) | Self::Request(_)
        )
    }
}

/// Represents a message in a conversation with a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender (e.g., "user", "assistant", "system").
    pub role: String,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a user-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    /// Creates a system-role message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }
}

/// Parameters for controlling the model's generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    /// What sampling temperature to use, between 0 and 2.
    pub temperature: Option<f32>,

    /// Nucleus sampling: the model considers the tokens with `top_p`
    /// probability mass.
    pub top_p: Option<f32>,

    /// The maximum number of tokens to generate.
    pub max_tokens: Option<u32>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self { temperature: Some(0.7), top_p: Some(1.0), max_tokens: Some(1024) }
    }
}

/// The response from a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated text.
    pub content: String,

    /// The ID of the model that produced the response, if reported.
    pub model_id: Option<String>,

    /// Usage statistics for the request, if reported.
    pub usage: Option<ModelUsage>,
}

/// Usage statistics for a model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,

    /// Number of tokens in the completion.
    pub completion_tokens: u32,

    /// Total number of tokens used.
    pub total_tokens: u32,
}

/// A trait for interacting with different LLM providers.
///
/// All models must be `Send + Sync` to allow concurrent use across tasks;
/// the fusion engine dispatches every agent's request concurrently.
#[async_trait]
pub trait Model: Send + Sync {
    /// Generates a completion for a single plain-text prompt.
    ///
    /// # Errors
    /// Returns a `ProviderError` if the upstream call fails.
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ProviderError>;

    /// Generates a chat completion for a conversation history.
    ///
    /// # Errors
    /// Returns a `ProviderError` if the upstream call fails.
    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ProviderError>;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}

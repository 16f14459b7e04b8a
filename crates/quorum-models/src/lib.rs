//! Provider adapters for Quorum.
//!
//! This crate provides concrete implementations of the `Model` trait, one
//! per upstream provider. Each adapter normalizes that provider's request
//! shape, auth scheme, and response envelope into the common contract.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and development
//! - **OpenAI**: GPT-family models (bearer token auth)
//! - **Claude**: Anthropic models (`x-api-key` header auth)
//! - **Gemini**: Google models (query-parameter key auth)
//! - **OpenRouter**: Aggregator with an OpenAI-shaped API (bearer token auth)

pub mod claude;
pub mod factory;
pub mod gemini;
pub mod openai;
pub mod openrouter;

use async_trait::async_trait;
use quorum_abstraction::{
    ChatMessage, Model, ModelParameters, ModelResponse, ModelUsage, ProviderError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

pub use claude::ClaudeModel;
pub use factory::{ModelConfig, ModelFactory, ProviderId};
pub use gemini::GeminiModel;
pub use openai::OpenAiModel;
pub use openrouter::OpenRouterModel;

/// A mock implementation of the `Model` trait for testing.
///
/// Returns a canned response (or a scripted failure) and counts every
/// dispatch, so tests can assert that no network-equivalent call happened.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
    canned: Option<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self { id, canned: None, fail: false, calls: AtomicUsize::new(0) }
    }

    /// Sets a fixed response returned for every request.
    #[must_use]
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.canned = Some(response.into());
        self
    }

    /// Makes every request fail with a retryable HTTP error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of requests dispatched to this model so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, prompt: &str) -> Result<ModelResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(ProviderError::Http {
                status: 500,
                body: format!("mock failure from {}", self.id),
            });
        }

        let content = self
            .canned
            .clone()
            .unwrap_or_else(|| format!("Mock response from {} for: {prompt}", self.id));

        let prompt_tokens = count_tokens(prompt);
        let completion_tokens = count_tokens(&content);
        Ok(ModelResponse {
            content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ProviderError> {
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "MockModel generating text"
        );
        self.respond(prompt)
    }

    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ProviderError> {
        debug!(
            model_id = %self.id,
            message_count = messages.len(),
            parameters = ?parameters,
            "MockModel generating chat completion"
        );
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        self.respond(prompt)
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Rough token count approximation (~4 characters per token).
fn count_tokens(text: &str) -> u32 {
    (text.len() as f64 / 4.0).ceil() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_canned_response() {
        let model = MockModel::new("mock-1".to_string()).with_response("canned");
        let response = model.generate_text("hi", None).await.unwrap();
        assert_eq!(response.content, "canned");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let model = MockModel::new("mock-1".to_string()).failing();
        let result = model.generate_text("hi", None).await;
        assert!(matches!(result, Err(ProviderError::Http { status: 500, .. })));
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn test_count_tokens() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(count_tokens("abcd"), 1);
        assert_eq!(count_tokens("abcde"), 2);
    }
}

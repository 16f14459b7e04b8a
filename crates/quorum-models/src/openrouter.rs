//! OpenRouter (aggregator) adapter.
//!
//! OpenRouter exposes an OpenAI-shaped chat completions API over many
//! underlying models, so the wire structs mirror the OpenAI adapter; only
//! the base URL and a couple of attribution headers differ. Auth is a
//! bearer token.

use async_trait::async_trait;
use quorum_abstraction::{
    ChatMessage, Model, ModelParameters, ModelResponse, ModelUsage, ProviderError,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter model implementation.
#[derive(Debug, Clone)]
pub struct OpenRouterModel {
    /// The model ID in OpenRouter's vendor-prefixed form
    /// (e.g., "anthropic/claude-sonnet-4.5").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the OpenRouter API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenRouterModel {
    /// Creates a new `OpenRouterModel` with the given model ID and API key.
    #[must_use]
    pub fn new(model_id: String, api_key: String) -> Self {
        Self { model_id, api_key, base_url: DEFAULT_BASE_URL.to_string(), client: Client::new() }
    }

    /// Overrides the base URL (relay transport or test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl Model for OpenRouterModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ProviderError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            "OpenRouterModel generating text"
        );

        let messages = vec![ChatMessage::user(prompt)];
        self.generate_chat_completion(&messages, parameters).await
    }

    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ProviderError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            parameters = ?parameters,
            "OpenRouterModel generating chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let or_messages: Vec<OpenRouterMessage> = messages
            .iter()
            .map(|msg| OpenRouterMessage { role: msg.role.clone(), content: msg.content.clone() })
            .collect();

        let mut request_body = OpenRouterRequest {
            model: self.model_id.clone(),
            messages: or_messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
        };

        if let Some(params) = parameters {
            request_body.temperature = params.temperature;
            request_body.top_p = params.top_p;
            request_body.max_tokens = params.max_tokens;
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to OpenRouter API");
                ProviderError::Request(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, body = %body, "OpenRouter API returned error status");
            return Err(ProviderError::Http { status: status.as_u16(), body });
        }

        let or_response: OpenRouterResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenRouter API response");
            ProviderError::Serialization(format!("Failed to parse response: {}", e))
        })?;

        let content = or_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| {
                error!("No choices in OpenRouter API response");
                ProviderError::ResponseShape("missing choices[0].message.content".to_string())
            })?;

        let usage = or_response.usage.map(|u| ModelUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ModelResponse { content, model_id: Some(self.model_id.clone()), usage })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// OpenRouter API request/response structures (OpenAI-shaped)

#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<OpenRouterMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenRouterMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
    usage: Option<OpenRouterUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
}

#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bearer_auth_and_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/chat/completions")
            .match_header("authorization", "Bearer router-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "choices": [{
                    "message": { "role": "assistant", "content": "Routed answer" }
                }]
            }"#,
            )
            .create_async()
            .await;

        let model =
            OpenRouterModel::new("anthropic/claude-sonnet-4.5".to_string(), "router-key".to_string())
                .with_base_url(format!("{}/api/v1", server.url()));

        let response = model.generate_text("Test", None).await.unwrap();
        assert_eq!(response.content, "Routed answer");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_2xx_maps_to_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let model = OpenRouterModel::new("openai/gpt-4o".to_string(), "router-key".to_string())
            .with_base_url(format!("{}/api/v1", server.url()));

        let result = model.generate_text("Test", None).await;
        assert!(matches!(result.unwrap_err(), ProviderError::Http { status: 429, .. }));
    }
}

//! Claude (Anthropic) adapter.
//!
//! Implements the `Model` trait for Anthropic's messages API. Auth is a
//! custom `x-api-key` header plus an `anthropic-version` header. System
//! messages go in a dedicated `system` field rather than the messages
//! array, and generated text lives in the first `content[]` block of type
//! `"text"`.

use async_trait::async_trait;
use quorum_abstraction::{
    ChatMessage, Model, ModelParameters, ModelResponse, ModelUsage, ProviderError,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Claude model implementation.
#[derive(Debug, Clone)]
pub struct ClaudeModel {
    /// The model ID (e.g., "claude-sonnet-4-5").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Claude API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl ClaudeModel {
    /// Creates a new `ClaudeModel` with the given model ID and API key.
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

    /// Extracts the first system message, if any.
    ///
    /// Claude takes system instructions via a dedicated `system` field;
    /// system-role entries are filtered out of the messages array.
    fn extract_system_prompt(messages: &[ChatMessage]) -> Option<String> {
        messages.iter().find(|msg| msg.role == "system").map(|msg| msg.content.clone())
    }

    fn to_claude_message(msg: &ChatMessage) -> ClaudeMessage {
        ClaudeMessage {
            role: if msg.role == "assistant" { "assistant" } else { "user" }.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[async_trait]
impl Model for ClaudeModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ProviderError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            "ClaudeModel generating text"
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
            "ClaudeModel generating chat completion"
        );

        let url = format!("{}/messages", self.base_url);

        let system = Self::extract_system_prompt(messages);
        let claude_messages: Vec<ClaudeMessage> = messages
            .iter()
            .filter(|msg| msg.role != "system")
            .map(Self::to_claude_message)
            .collect();

        let mut request_body = ClaudeRequest {
            model: self.model_id.clone(),
            messages: claude_messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            system,
            temperature: None,
            top_p: None,
        };

        if let Some(params) = parameters {
            request_body.temperature = params.temperature;
            request_body.top_p = params.top_p;
            if let Some(max_tokens) = params.max_tokens {
                request_body.max_tokens = max_tokens;
            }
        }

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Claude API");
                ProviderError::Request(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, body = %body, "Claude API returned error status");
            return Err(ProviderError::Http { status: status.as_u16(), body });
        }

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Claude API response");
            ProviderError::Serialization(format!("Failed to parse response: {}", e))
        })?;

        let content = claude_response
            .content
            .iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text.clone())
            .ok_or_else(|| {
                error!("No text content in Claude API response");
                ProviderError::ResponseShape("missing content[] block of type \"text\"".to_string())
            })?;

        let usage = Some(ModelUsage {
            prompt_tokens: claude_response.usage.input_tokens,
            completion_tokens: claude_response.usage.output_tokens,
            total_tokens: claude_response.usage.input_tokens + claude_response.usage.output_tokens,
        });

        Ok(ModelResponse { content, model_id: Some(self.model_id.clone()), usage })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Claude API request/response structures

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    messages: Vec<ClaudeMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_extraction() {
        let messages = vec![ChatMessage::system("You are helpful"), ChatMessage::user("Hello")];
        let system = ClaudeModel::extract_system_prompt(&messages);
        assert_eq!(system, Some("You are helpful".to_string()));
    }

    #[tokio::test]
    async fn test_generate_chat_completion_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "content": [{ "type": "text", "text": "Hi there" }],
                "usage": { "input_tokens": 5, "output_tokens": 7 }
            }"#,
            )
            .create_async()
            .await;

        let model = ClaudeModel::new("claude-sonnet-4-5".to_string(), "test-key".to_string())
            .with_base_url(format!("{}/v1", server.url()));

        let response = model.generate_text("Say hello", None).await.unwrap();
        assert_eq!(response.content, "Hi there");
        assert_eq!(response.usage.unwrap().total_tokens, 12);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_text_block_maps_to_response_shape() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "content": [{ "type": "tool_use", "text": "" }],
                "usage": { "input_tokens": 5, "output_tokens": 0 }
            }"#,
            )
            .create_async()
            .await;

        let model = ClaudeModel::new("claude-sonnet-4-5".to_string(), "test-key".to_string())
            .with_base_url(format!("{}/v1", server.url()));

        let result = model.generate_text("Test", None).await;
        assert!(matches!(result.unwrap_err(), ProviderError::ResponseShape(_)));
    }

    #[tokio::test]
    async fn test_non_2xx_maps_to_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body("overloaded")
            .create_async()
            .await;

        let model = ClaudeModel::new("claude-sonnet-4-5".to_string(), "test-key".to_string())
            .with_base_url(format!("{}/v1", server.url()));

        let result = model.generate_text("Test", None).await;
        assert!(matches!(result.unwrap_err(), ProviderError::Http { status: 529, .. }));
    }
}

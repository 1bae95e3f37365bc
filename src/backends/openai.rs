//! OpenAI chat completions provider.
//!
//! # Requirements
//!
//! - OpenAI API key
//! - Network access to api.openai.com
//!
//! Requests ask for a JSON object response format.

use crate::backends::http;
use crate::config::DEFAULT_OPENAI_MODEL;
use crate::core::{CompletionRequest, DecisionProvider, ProviderError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (kept secret).
    pub api_key: SecretString,

    /// Model identifier.
    pub model: String,

    /// Base URL for the API.
    pub base_url: String,

    /// HTTP request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into().into()),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Decision provider backed by the OpenAI chat completions API.
#[derive(Debug)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Provider name reported in errors and audit events.
    pub const NAME: &'static str = "openai";

    /// Creates a new provider with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = http::build_client(Self::NAME, config.timeout)?;
        Ok(Self { config, client })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

#[async_trait]
impl DecisionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }

    async fn propose(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let builder = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret());

        let response: ChatResponse =
            http::post_json(Self::NAME, self.config.timeout, builder, &body).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed(Self::NAME, "response has no choices"))?;

        http::non_empty(Self::NAME, choice.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest<'static> {
        CompletionRequest {
            system: "system",
            prompt: "decide",
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig::new("sk-test").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_chat_completion_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({
                    "id": "chatcmpl-123",
                    "object": "chat.completion",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "{\"next_action\": \"skip\"}"},
                        "finish_reason": "stop"
                    }]
                })
                .to_string(),
                "application/json",
            ))
            .mount(&server)
            .await;

        let text = provider(&server).propose(&request()).await.unwrap();
        assert_eq!(text, "{\"next_action\": \"skip\"}");
    }

    #[tokio::test]
    async fn test_rate_limited_maps_to_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(&server).propose(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http { status: 429, .. }));
        assert_eq!(err.provider(), Some("openai"));
    }

    #[tokio::test]
    async fn test_no_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({"choices": []}).to_string(),
                "application/json",
            ))
            .mount(&server)
            .await;

        let err = provider(&server).propose(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_null_content_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({"choices": [{"message": {"role": "assistant", "content": null}}]})
                    .to_string(),
                "application/json",
            ))
            .mount(&server)
            .await;

        let err = provider(&server).propose(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let config = OpenAiConfig::new("sk-test").with_base_url("http://127.0.0.1:1");
        let err = OpenAiProvider::new(config)
            .unwrap()
            .propose(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }
}

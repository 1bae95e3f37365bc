//! Anthropic messages API provider.
//!
//! # Requirements
//!
//! - Anthropic API key
//! - Network access to api.anthropic.com
//!
//! The prompt is sent as a single user message with the gateway's system
//! instruction; the first text block of the reply is the completion.

use crate::backends::http;
use crate::config::DEFAULT_ANTHROPIC_MODEL;
use crate::core::{CompletionRequest, DecisionProvider, ProviderError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (kept secret).
    pub api_key: SecretString,

    /// Model identifier.
    pub model: String,

    /// Base URL for the API.
    pub base_url: String,

    /// HTTP request timeout.
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into().into()),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
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
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Decision provider backed by the Anthropic messages API.
#[derive(Debug)]
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Provider name reported in errors and audit events.
    pub const NAME: &'static str = "anthropic";

    /// Creates a new provider with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self, ProviderError> {
        let client = http::build_client(Self::NAME, config.timeout)?;
        Ok(Self { config, client })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }
}

#[async_trait]
impl DecisionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }

    async fn propose(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system,
            messages: [Message {
                role: "user",
                content: request.prompt,
            }],
        };

        let builder = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION);

        let response: MessagesResponse =
            http::post_json(Self::NAME, self.config.timeout, builder, &body).await?;

        if response.content.is_empty() {
            return Err(ProviderError::malformed(Self::NAME, "response has no content blocks"));
        }

        let text = response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text);

        http::non_empty(Self::NAME, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest<'static> {
        CompletionRequest {
            system: "system",
            prompt: "decide",
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::new(AnthropicConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_messages_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({
                    "id": "msg_01",
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "text", "text": "{\"next_action\": \"skip\"}"}],
                    "stop_reason": "end_turn"
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
    async fn test_server_error_maps_to_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider(&server).propose(&request()).await.unwrap_err();
        match err {
            ProviderError::Http { status, body, .. } => {
                assert_eq!(status, 529);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({"content": [{"type": "text", "text": "  "}]}).to_string(),
                "application/json",
            ))
            .mount(&server)
            .await;

        let err = provider(&server).propose(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_unexpected_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
            .mount(&server)
            .await;

        let err = provider(&server).propose(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[test]
    fn test_config_defaults() {
        let config = AnthropicConfig::new("key");
        assert_eq!(config.model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(config.base_url, "https://api.anthropic.com/v1");
    }
}

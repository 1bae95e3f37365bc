//! The provider gateway implementation.

use crate::core::{ArcProvider, CompletionRequest, ConfigurationError, DecisionProvider, ProviderError};
use crate::gateway::config::{GatewayConfig, SYSTEM_INSTRUCTION};
use crate::gateway::response::parse_payload;

use serde_json::{Map, Value};
use std::sync::Arc;

/// A parsed payload and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    /// The JSON object returned by the provider.
    pub payload: Map<String, Value>,
    /// Name of the provider that answered.
    pub provider: String,
    /// Number of provider attempts made, including the successful one.
    pub attempts: u32,
}

impl GatewayResponse {
    /// Returns the payload as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.payload)
    }
}

/// Builder for creating a `ProviderGateway`.
pub struct ProviderGatewayBuilder {
    primary: Option<ArcProvider>,
    secondary: Option<ArcProvider>,
    config: GatewayConfig,
}

impl ProviderGatewayBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            primary: None,
            secondary: None,
            config: GatewayConfig::default(),
        }
    }

    /// Sets the primary provider.
    pub fn primary<P: DecisionProvider + 'static>(self, provider: P) -> Self {
        self.primary_arc(Arc::new(provider))
    }

    /// Sets the primary provider, already wrapped in an Arc.
    pub fn primary_arc(mut self, provider: ArcProvider) -> Self {
        self.primary = Some(provider);
        self
    }

    /// Sets the secondary (fallback) provider.
    pub fn secondary<P: DecisionProvider + 'static>(self, provider: P) -> Self {
        self.secondary_arc(Arc::new(provider))
    }

    /// Sets the secondary provider, already wrapped in an Arc.
    pub fn secondary_arc(mut self, provider: ArcProvider) -> Self {
        self.secondary = Some(provider);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the gateway.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if neither provider is set.
    pub fn build(self) -> Result<ProviderGateway, ConfigurationError> {
        ProviderGateway::new(self.primary, self.secondary, self.config)
    }
}

impl Default for ProviderGatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Invokes the primary provider, falling back to the secondary on failure.
///
/// Holds only immutable configuration and can serve concurrent requests.
pub struct ProviderGateway {
    /// Tried first.
    primary: Option<ArcProvider>,
    /// Tried after a primary failure, if fallback is enabled.
    secondary: Option<ArcProvider>,
    /// Configuration.
    config: GatewayConfig,
}

impl ProviderGateway {
    /// Creates a new builder.
    pub fn builder() -> ProviderGatewayBuilder {
        ProviderGatewayBuilder::new()
    }

    /// Creates a gateway from optional providers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if both are `None`.
    pub fn new(
        primary: Option<ArcProvider>,
        secondary: Option<ArcProvider>,
        config: GatewayConfig,
    ) -> Result<Self, ConfigurationError> {
        if primary.is_none() && secondary.is_none() {
            return Err(ConfigurationError::new(
                "no decision provider available; configure a primary or secondary provider",
            ));
        }

        let gateway = Self {
            primary,
            secondary,
            config,
        };
        tracing::info!(
            providers = ?gateway.provider_names(),
            fallback = gateway.config.enable_fallback,
            temperature = gateway.config.temperature,
            "Provider gateway initialised"
        );
        Ok(gateway)
    }

    /// Returns the names of configured providers, in attempt order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.ordered().map(|p| p.name()).collect()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Obtains a decision payload for `prompt`.
    ///
    /// The primary is tried first. After a failure the secondary is tried
    /// once, provided fallback is enabled and the failure was not an
    /// unparseable completion. At most two attempts are made.
    ///
    /// # Errors
    ///
    /// - `Unparseable` - a provider answered with text that is not a JSON object.
    /// - `Exhausted` - the last permitted attempt failed; wraps its error.
    /// - `NotConfigured` - no provider is present.
    pub async fn obtain_decision(&self, prompt: &str) -> Result<GatewayResponse, ProviderError> {
        let request = CompletionRequest {
            system: SYSTEM_INSTRUCTION,
            prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let providers: Vec<&ArcProvider> = self.ordered().collect();
        let mut attempts = 0u32;

        for (index, provider) in providers.iter().enumerate() {
            attempts += 1;
            tracing::debug!(provider = provider.name(), attempt = attempts, "Calling provider");

            match self.attempt(provider, &request).await {
                Ok(text) => {
                    let payload = parse_payload(provider.name(), &text)?;
                    return Ok(GatewayResponse {
                        payload,
                        provider: provider.name().to_string(),
                        attempts,
                    });
                }
                Err(e) => {
                    crate::audit::emit_provider_failure(provider.name(), attempts, &e);

                    let next = providers.get(index + 1);
                    match next {
                        Some(next) if self.config.enable_fallback && e.allows_fallback() => {
                            tracing::warn!(
                                provider = provider.name(),
                                fallback = next.name(),
                                error = %e,
                                "Provider failed, falling back"
                            );
                            crate::audit::emit_provider_fallback(provider.name(), next.name());
                        }
                        _ => {
                            tracing::error!(
                                provider = provider.name(),
                                error = %e,
                                "Provider failed, no fallback permitted"
                            );
                            return Err(ProviderError::Exhausted {
                                attempts,
                                last: Box::new(e),
                            });
                        }
                    }
                }
            }
        }

        Err(ProviderError::NotConfigured)
    }

    fn ordered(&self) -> impl Iterator<Item = &ArcProvider> {
        self.primary.iter().chain(self.secondary.iter())
    }

    async fn attempt(
        &self,
        provider: &ArcProvider,
        request: &CompletionRequest<'_>,
    ) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.config.attempt_timeout, provider.propose(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(
                provider.name(),
                self.config.attempt_timeout,
            )),
        }
    }
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("providers", &self.provider_names())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MockProvider, MockReply};
    use serde_json::json;
    use std::time::Duration;

    fn skip_reply() -> Value {
        json!({"next_action": "skip", "reasoning": "nothing to do"})
    }

    #[test]
    fn test_builder_requires_provider() {
        let result = ProviderGateway::builder().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_secondary_alone_is_enough() {
        let gateway = ProviderGateway::builder()
            .secondary(MockProvider::new().with_name("secondary"))
            .build()
            .unwrap();
        assert_eq!(gateway.provider_names(), vec!["secondary"]);
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = Arc::new(MockProvider::new_json(skip_reply()).with_name("primary"));
        let secondary = Arc::new(MockProvider::new_json(skip_reply()).with_name("secondary"));

        let gateway = ProviderGateway::builder()
            .primary_arc(primary.clone())
            .secondary_arc(secondary.clone())
            .build()
            .unwrap();

        let response = gateway.obtain_decision("prompt").await.unwrap();
        assert_eq!(response.provider, "primary");
        assert_eq!(response.attempts, 1);
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_to_secondary() {
        let primary = Arc::new(MockProvider::new_failing("overloaded").with_name("primary"));
        let secondary = Arc::new(MockProvider::new_json(skip_reply()).with_name("secondary"));

        let gateway = ProviderGateway::builder()
            .primary_arc(primary.clone())
            .secondary_arc(secondary.clone())
            .build()
            .unwrap();

        let response = gateway.obtain_decision("prompt").await.unwrap();
        assert_eq!(response.provider, "secondary");
        assert_eq!(response.attempts, 2);
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_disabled_fails_fast() {
        let primary = Arc::new(MockProvider::new_failing("overloaded").with_name("primary"));
        let secondary = Arc::new(MockProvider::new_json(skip_reply()).with_name("secondary"));

        let gateway = ProviderGateway::builder()
            .primary_arc(primary.clone())
            .secondary_arc(secondary.clone())
            .with_config(GatewayConfig::default().with_fallback(false))
            .build()
            .unwrap();

        let err = gateway.obtain_decision("prompt").await.unwrap_err();
        assert!(matches!(err, ProviderError::Exhausted { attempts: 1, .. }));
        assert_eq!(err.provider(), Some("primary"));
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_both_fail_wraps_secondary_error() {
        let gateway = ProviderGateway::builder()
            .primary(MockProvider::new_failing("a").with_name("primary"))
            .secondary(MockProvider::new_failing("b").with_name("secondary"))
            .build()
            .unwrap();

        let err = gateway.obtain_decision("prompt").await.unwrap_err();
        assert!(matches!(err, ProviderError::Exhausted { attempts: 2, .. }));
        assert_eq!(err.provider(), Some("secondary"));
    }

    #[tokio::test]
    async fn test_timeout_triggers_fallback() {
        let primary = MockProvider::new_json(skip_reply())
            .with_name("primary")
            .with_latency(Duration::from_millis(200));
        let secondary = Arc::new(MockProvider::new_json(skip_reply()).with_name("secondary"));

        let gateway = ProviderGateway::builder()
            .primary(primary)
            .secondary_arc(secondary.clone())
            .with_config(GatewayConfig::default().with_attempt_timeout(Duration::from_millis(20)))
            .build()
            .unwrap();

        let response = gateway.obtain_decision("prompt").await.unwrap();
        assert_eq!(response.provider, "secondary");
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_is_not_retried() {
        let primary = Arc::new(MockProvider::new_text("sure, scan it").with_name("primary"));
        let secondary = Arc::new(MockProvider::new_json(skip_reply()).with_name("secondary"));

        let gateway = ProviderGateway::builder()
            .primary_arc(primary.clone())
            .secondary_arc(secondary.clone())
            .build()
            .unwrap();

        let err = gateway.obtain_decision("prompt").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unparseable { .. }));
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fenced_reply_is_parsed() {
        let text = format!("```json\n{}\n```", skip_reply());
        let gateway = ProviderGateway::builder()
            .primary(MockProvider::new().with_reply(MockReply::Text(text)))
            .build()
            .unwrap();

        let response = gateway.obtain_decision("prompt").await.unwrap();
        assert_eq!(
            response.payload.get("next_action").and_then(Value::as_str),
            Some("skip")
        );
    }

    #[tokio::test]
    async fn test_request_carries_fixed_instruction_and_temperature() {
        let primary = Arc::new(MockProvider::new_json(skip_reply()));
        let gateway = ProviderGateway::builder()
            .primary_arc(primary.clone())
            .with_config(GatewayConfig::default().with_temperature(0.7))
            .build()
            .unwrap();

        gateway.obtain_decision("the prompt").await.unwrap();
        let recorded = primary.last_request().unwrap();
        assert_eq!(recorded.system, SYSTEM_INSTRUCTION);
        assert_eq!(recorded.prompt, "the prompt");
        assert_eq!(recorded.temperature, 0.7);
    }
}

//! Typed orchestrator settings.
//!
//! Settings load from JSON with every field optional, then take explicit
//! overrides through an injected lookup function. Nothing here reads the
//! process environment directly; callers pass `|k| std::env::var(k).ok()`
//! if that is what they want.

use crate::core::{ConfigurationError, ScanLevel, ScanPolicy};
use crate::gateway::{GatewayConfig, DEFAULT_TEMPERATURE};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Provider selection and sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Use Anthropic as the primary provider and OpenAI as the secondary.
    pub prefer_anthropic: bool,

    /// Sampling temperature.
    pub temperature: f32,

    /// OpenAI model identifier.
    pub openai_model: String,

    /// Anthropic model identifier.
    pub anthropic_model: String,

    /// Whether to fall back to the secondary provider.
    pub enable_fallback: bool,

    /// Per-attempt timeout in seconds.
    pub attempt_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            prefer_anthropic: true,
            temperature: DEFAULT_TEMPERATURE,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            enable_fallback: true,
            attempt_timeout_secs: 60,
        }
    }
}

/// Top-level orchestrator settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Provider settings.
    #[serde(rename = "ai_provider")]
    pub provider: ProviderSettings,

    /// Global scan policy.
    pub scan_policy: ScanPolicy,
}

impl OrchestratorSettings {
    /// Parses settings from JSON. Absent fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the JSON is invalid or a value is out
    /// of range.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::new(format!("invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::new(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Applies overrides from `lookup`.
    ///
    /// Recognised keys: `ORCHESTRATION_TEMPERATURE`, `OPENAI_MODEL`,
    /// `ANTHROPIC_MODEL`, `ORCHESTRATION_MAX_ESCALATION`,
    /// `ORCHESTRATION_SCAN_COOLDOWN`. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for a value that does not parse.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("ORCHESTRATION_TEMPERATURE") {
            self.provider.temperature = value.trim().parse().map_err(|_| {
                ConfigurationError::new(format!(
                    "ORCHESTRATION_TEMPERATURE must be a number, got '{}'",
                    value
                ))
            })?;
        }
        if let Some(value) = get("OPENAI_MODEL") {
            self.provider.openai_model = value;
        }
        if let Some(value) = get("ANTHROPIC_MODEL") {
            self.provider.anthropic_model = value;
        }
        if let Some(value) = get("ORCHESTRATION_MAX_ESCALATION") {
            self.scan_policy.max_escalation = value.trim().parse::<ScanLevel>().map_err(|e| {
                ConfigurationError::new(format!("ORCHESTRATION_MAX_ESCALATION: {}", e))
            })?;
        }
        if let Some(value) = get("ORCHESTRATION_SCAN_COOLDOWN") {
            self.scan_policy.scan_cooldown_hours = value.trim().parse().map_err(|_| {
                ConfigurationError::new(format!(
                    "ORCHESTRATION_SCAN_COOLDOWN must be a non-negative integer, got '{}'",
                    value
                ))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Returns `true` if Anthropic is the primary provider.
    pub fn primary_is_anthropic(&self) -> bool {
        self.provider.prefer_anthropic
    }

    /// Projects the settings into a gateway configuration.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new()
            .with_temperature(self.provider.temperature)
            .with_fallback(self.provider.enable_fallback)
            .with_attempt_timeout(Duration::from_secs(self.provider.attempt_timeout_secs))
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigurationError::new(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.provider.temperature
            )));
        }
        if self.provider.attempt_timeout_secs == 0 {
            return Err(ConfigurationError::new("attempt_timeout_secs must be positive"));
        }
        Ok(())
    }
}

/// API keys for the HTTP providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    /// Anthropic API key.
    pub anthropic_api_key: Option<SecretString>,

    /// OpenAI API key.
    pub openai_api_key: Option<SecretString>,
}

impl ProviderCredentials {
    /// Reads `ANTHROPIC_API_KEY` and `OPENAI_API_KEY` through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| SecretString::new(v.into()))
        };
        Self {
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            openai_api_key: secret("OPENAI_API_KEY"),
        }
    }
}

#[cfg(any(feature = "anthropic", feature = "openai"))]
mod build {
    use super::{OrchestratorSettings, ProviderCredentials};
    use crate::core::{ArcProvider, ConfigurationError};
    use crate::gateway::ProviderGateway;

    impl OrchestratorSettings {
        /// Builds a gateway from the settings and whichever keys are present.
        ///
        /// # Errors
        ///
        /// Returns `ConfigurationError` if no provider can be built.
        pub fn build_gateway(
            &self,
            credentials: &ProviderCredentials,
        ) -> Result<ProviderGateway, ConfigurationError> {
            let anthropic = self.anthropic_provider(credentials)?;
            let openai = self.openai_provider(credentials)?;

            let (primary, secondary) = if self.primary_is_anthropic() {
                (anthropic, openai)
            } else {
                (openai, anthropic)
            };

            ProviderGateway::new(primary, secondary, self.gateway_config())
        }

        #[cfg(feature = "anthropic")]
        fn anthropic_provider(
            &self,
            credentials: &ProviderCredentials,
        ) -> Result<Option<ArcProvider>, ConfigurationError> {
            use crate::backends::{AnthropicConfig, AnthropicProvider};
            use secrecy::ExposeSecret;

            let Some(key) = &credentials.anthropic_api_key else {
                return Ok(None);
            };
            let config = AnthropicConfig::new(key.expose_secret())
                .with_model(self.provider.anthropic_model.clone());
            let provider = AnthropicProvider::new(config)
                .map_err(|e| ConfigurationError::new(e.to_string()))?;
            Ok(Some(std::sync::Arc::new(provider)))
        }

        #[cfg(not(feature = "anthropic"))]
        fn anthropic_provider(
            &self,
            _credentials: &ProviderCredentials,
        ) -> Result<Option<ArcProvider>, ConfigurationError> {
            Ok(None)
        }

        #[cfg(feature = "openai")]
        fn openai_provider(
            &self,
            credentials: &ProviderCredentials,
        ) -> Result<Option<ArcProvider>, ConfigurationError> {
            use crate::backends::{OpenAiConfig, OpenAiProvider};
            use secrecy::ExposeSecret;

            let Some(key) = &credentials.openai_api_key else {
                return Ok(None);
            };
            let config = OpenAiConfig::new(key.expose_secret())
                .with_model(self.provider.openai_model.clone());
            let provider = OpenAiProvider::new(config)
                .map_err(|e| ConfigurationError::new(e.to_string()))?;
            Ok(Some(std::sync::Arc::new(provider)))
        }

        #[cfg(not(feature = "openai"))]
        fn openai_provider(
            &self,
            _credentials: &ProviderCredentials,
        ) -> Result<Option<ArcProvider>, ConfigurationError> {
            Ok(None)
        }
    }
}

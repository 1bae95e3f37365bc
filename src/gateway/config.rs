//! Gateway configuration.

use std::time::Duration;

/// System instruction sent with every request. Not configurable.
pub const SYSTEM_INSTRUCTION: &str = "You are an infrastructure orchestration agent. \
Output must be valid JSON that matches the required schema exactly.";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default bound on a single provider attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default upper bound on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Configuration for the provider gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Sampling temperature applied to every provider.
    pub temperature: f32,

    /// Whether the secondary provider is tried after the primary fails.
    pub enable_fallback: bool,

    /// Time budget for each provider attempt.
    pub attempt_timeout: Duration,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            enable_fallback: true,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl GatewayConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sampling temperature, clamped to `0.0..=2.0`.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Enables or disables fallback to the secondary provider.
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.enable_fallback = enabled;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Sets the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }
}

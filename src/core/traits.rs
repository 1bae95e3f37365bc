//! The capability every decision provider implements.
//!
//! A provider turns a prompt into completion text. Stripping code fences and
//! parsing the text is the gateway's job, so every provider behaves the same
//! way once its text comes back.

use crate::core::error::ProviderError;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// A single completion request sent to a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionRequest<'a> {
    /// Fixed system instruction.
    pub system: &'a str,
    /// The generated decision prompt.
    pub prompt: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// An external decision-generating service.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; one instance serves concurrent
///   requests and must not keep per-request state.
/// - The gateway bounds each call with its own timeout, so implementations
///   need not enforce one, though HTTP clients usually carry their own.
/// - Return the raw completion text, fences and all.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use pgdn_orchestrator::core::{CompletionRequest, DecisionProvider, ProviderError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct AlwaysSkip;
///
/// #[async_trait]
/// impl DecisionProvider for AlwaysSkip {
///     fn name(&self) -> &str {
///         "always-skip"
///     }
///
///     async fn propose(&self, _request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
///         Ok(r#"{"next_action": "skip", "reasoning": "maintenance window"}"#.to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait DecisionProvider: Send + Sync + Debug {
    /// Stable identifier such as `"anthropic"` or `"openai"`.
    fn name(&self) -> &str;

    /// Returns the model identifier in use, if meaningful.
    fn model(&self) -> Option<&str> {
        None
    }

    /// Requests a completion for `request`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` - the service could not be reached.
    /// - `Http` - the service answered with a failure status.
    /// - `EmptyResponse` / `MalformedResponse` - the envelope had no usable text.
    async fn propose(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError>;
}

/// A boxed provider for type-erased storage.
pub type BoxedProvider = Box<dyn DecisionProvider>;

/// An arc-wrapped provider for shared ownership.
pub type ArcProvider = Arc<dyn DecisionProvider>;

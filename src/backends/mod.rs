//! Decision provider implementations.
//!
//! This module contains implementations of the `DecisionProvider` trait
//! for the supported decision services.
//!
//! ## Available Providers
//!
//! - [`mock`] - A scriptable provider for tests and demos
//! - `anthropic` - Anthropic messages API (requires `anthropic` feature)
//! - `openai` - OpenAI chat completions API (requires `openai` feature)
//!
//! ## Implementing a Custom Provider
//!
//! Providers return raw completion text; the gateway strips code fences
//! and parses it.
//!
//! ```rust,ignore
//! use pgdn_orchestrator::core::{CompletionRequest, DecisionProvider, ProviderError};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct MyProvider;
//!
//! #[async_trait]
//! impl DecisionProvider for MyProvider {
//!     fn name(&self) -> &str {
//!         "my-provider"
//!     }
//!
//!     async fn propose(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
//!         // Call your service with request.system and request.prompt
//!         todo!()
//!     }
//! }
//! ```

pub mod mock;

#[cfg(any(feature = "anthropic", feature = "openai"))]
mod http;

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "openai")]
pub mod openai;

// Re-exports
pub use mock::{MockProvider, MockReply, RecordedRequest};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicConfig, AnthropicProvider};

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

//! # pgdn-orchestrator
//!
//! Decides the next security-scanning action for a network node by asking a
//! language-model provider for a proposal and then holding that proposal to
//! hard, deterministic policy constraints.
//!
//! ## Overview
//!
//! For each node the decision pipeline:
//!
//! - Validates the node, organisation and scan policy documents
//! - Refuses blacklisted hosts and non-whitelisted protocols before any call
//! - Builds a deterministic prompt describing the node and the rules
//! - Asks the primary provider, falling back to the secondary on failure
//! - Validates the returned JSON into an `OrchestrationDecision`
//! - Applies the override pass: ferocious permission, cooldown, escalation ceiling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pgdn_orchestrator::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = DecisionPipeline::builder()
//!         .primary(MockProvider::new())
//!         .build()?;
//!
//!     let decision = pipeline
//!         .decide(
//!             &json!({"id": "node-1", "host": "10.0.0.5", "protocol": "sui"}),
//!             &json!({"id": "org-1"}),
//!             &json!({}),
//!         )
//!         .await?;
//!
//!     println!("{} ({:?})", decision.next_action(), decision.scan_level());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Both HTTP providers
//! - `anthropic` - Anthropic messages API provider
//! - `openai` - OpenAI chat completions provider
//!
//! ## Architecture
//!
//! - **Core**: Schema types, validation, the provider trait, errors
//! - **Prompt**: The deterministic prompt contract
//! - **Backends**: Provider implementations
//! - **Gateway**: Ordered fallback across providers
//! - **Policy**: Permission checks and the override pass
//! - **Pipeline**: The end-to-end decision flow
//! - **Audit**: Structured audit events
//! - **Config**: Typed settings with explicit overrides

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod config;
pub mod core;
pub mod gateway;
pub mod pipeline;
pub mod policy;
pub mod prompt;

// Re-export commonly used types at the crate root
pub use crate::core::{
    ConfigurationError, DecisionProvider, NextAction, Node, OrchestrationDecision,
    OrchestrationError, OrchestrationResult, Organisation, PermissionDeniedError, ProviderError,
    ScanLevel, ScanPolicy, SchemaError,
};

pub use crate::config::OrchestratorSettings;
pub use crate::gateway::{GatewayConfig, ProviderGateway};
pub use crate::pipeline::{DecisionOutcome, DecisionPipeline};
pub use crate::policy::{apply_overrides, check_permissions, OverrideReport, OverrideRule};
pub use crate::prompt::generate_prompt;

/// Prelude module for convenient imports.
///
/// ```rust
/// use pgdn_orchestrator::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backends::{MockProvider, MockReply};
    pub use crate::config::{OrchestratorSettings, ProviderCredentials};
    pub use crate::core::{
        CompletionRequest, ConfigurationError, DecisionProvider, FollowUpAction, NextAction, Node,
        NodeStatus, OrchestrationDecision, OrchestrationError, OrchestrationResult, Organisation,
        PermissionDeniedError, ProviderError, ScanLevel, ScanPolicy, SchemaError,
    };
    pub use crate::gateway::{GatewayConfig, ProviderGateway};
    pub use crate::pipeline::{DecisionOutcome, DecisionPipeline};
    pub use crate::policy::{apply_overrides, check_permissions, OverrideReport, OverrideRule};
    pub use crate::prompt::generate_prompt;
}

//! Core types and traits for the orchestrator.
//!
//! - [`types`] - Scan tiers, actions, node status, follow-ups
//! - [`node`] - Node, organisation and scan policy entities
//! - [`decision`] - The orchestration decision
//! - [`traits`] - The `DecisionProvider` capability
//! - [`error`] - Structured error types

pub mod decision;
pub mod error;
pub mod node;
pub(crate) mod schema;
pub mod traits;
pub mod types;

pub use decision::{OrchestrationDecision, DEFAULT_CONFIDENCE};
pub use error::{
    ConfigurationError, FieldViolation, OrchestrationError, OrchestrationResult,
    PermissionDeniedError, ProviderError, ProviderResult, SchemaError, SchemaResult,
    ViolationKind,
};
pub use node::{Node, Organisation, ScanPolicy};
pub use traits::{ArcProvider, BoxedProvider, CompletionRequest, DecisionProvider};
pub use types::{FollowUpAction, NextAction, NodeStatus, ScanLevel};

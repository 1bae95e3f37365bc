//! The decision pipeline.
//!
//! The `DecisionPipeline` composes input validation, permission checks,
//! prompt generation, the provider gateway, decision validation and the
//! override pass into a single call per node.

mod decision_pipeline;

pub use decision_pipeline::{DecisionOutcome, DecisionPipeline, DecisionPipelineBuilder};

//! The decision pipeline implementation.

use crate::core::{
    ArcProvider, ConfigurationError, DecisionProvider, Node, OrchestrationDecision,
    OrchestrationError, OrchestrationResult, Organisation, ProviderError, ScanPolicy, SchemaError,
};
use crate::gateway::{GatewayConfig, GatewayResponse, ProviderGateway};
use crate::policy::{apply_overrides, check_permissions, AppliedOverride};
use crate::prompt::generate_prompt;

use serde_json::Value;
use std::sync::Arc;

/// Everything a single pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    /// The final decision, after overrides.
    pub decision: OrchestrationDecision,
    /// The decision as the provider proposed it.
    pub proposal: OrchestrationDecision,
    /// Override rewrites, in the order they were applied.
    pub overrides: Vec<AppliedOverride>,
    /// Provider that answered.
    pub provider: String,
    /// Provider attempts made.
    pub attempts: u32,
}

impl DecisionOutcome {
    /// Returns `true` if the final decision differs from the proposal.
    pub fn is_overridden(&self) -> bool {
        !self.overrides.is_empty()
    }

    /// Consumes the outcome, returning the final decision.
    pub fn into_decision(self) -> OrchestrationDecision {
        self.decision
    }
}

/// Builder for creating a `DecisionPipeline`.
pub struct DecisionPipelineBuilder {
    primary: Option<ArcProvider>,
    secondary: Option<ArcProvider>,
    config: GatewayConfig,
}

impl DecisionPipelineBuilder {
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

    /// Sets the secondary provider.
    pub fn secondary<P: DecisionProvider + 'static>(self, provider: P) -> Self {
        self.secondary_arc(Arc::new(provider))
    }

    /// Sets the secondary provider, already wrapped in an Arc.
    pub fn secondary_arc(mut self, provider: ArcProvider) -> Self {
        self.secondary = Some(provider);
        self
    }

    /// Sets the gateway configuration.
    pub fn with_gateway_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if no provider is set.
    pub fn build(self) -> Result<DecisionPipeline, ConfigurationError> {
        let gateway = ProviderGateway::new(self.primary, self.secondary, self.config)?;
        Ok(DecisionPipeline::new(gateway))
    }
}

impl Default for DecisionPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides the next scanning action for a node.
///
/// Each call validates its inputs, checks permissions, asks the gateway for
/// a proposal, validates it and applies the override pass. The pipeline
/// keeps no state between calls and can be shared across tasks.
///
/// # Example
///
/// ```rust,ignore
/// use pgdn_orchestrator::prelude::*;
///
/// let pipeline = DecisionPipeline::builder()
///     .primary(MockProvider::new())
///     .build()?;
///
/// let decision = pipeline.decide(&node, &organisation, &policy).await?;
/// println!("{}", decision.next_action());
/// ```
#[derive(Debug)]
pub struct DecisionPipeline {
    gateway: ProviderGateway,
}

impl DecisionPipeline {
    /// Creates a new builder.
    pub fn builder() -> DecisionPipelineBuilder {
        DecisionPipelineBuilder::new()
    }

    /// Creates a pipeline around an existing gateway.
    pub fn new(gateway: ProviderGateway) -> Self {
        Self { gateway }
    }

    /// Returns the gateway.
    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Decides for untyped node, organisation and policy documents.
    ///
    /// # Errors
    ///
    /// - `Schema` - an input or the provider payload is malformed.
    /// - `PermissionDenied` - the organisation forbids scanning the node.
    /// - `Provider` - every permitted provider attempt failed.
    pub async fn decide(
        &self,
        node: &Value,
        organisation: &Value,
        policy: &Value,
    ) -> OrchestrationResult<OrchestrationDecision> {
        Ok(self
            .decide_with_report(node, organisation, policy)
            .await?
            .into_decision())
    }

    /// Like [`decide`](Self::decide), returning the full outcome.
    pub async fn decide_with_report(
        &self,
        node: &Value,
        organisation: &Value,
        policy: &Value,
    ) -> OrchestrationResult<DecisionOutcome> {
        let (node, organisation, policy) = normalize(node, organisation, policy)?;
        self.decide_typed_with_report(&node, &organisation, &policy)
            .await
    }

    /// Decides for already validated entities.
    pub async fn decide_typed(
        &self,
        node: &Node,
        organisation: &Organisation,
        policy: &ScanPolicy,
    ) -> OrchestrationResult<OrchestrationDecision> {
        Ok(self
            .decide_typed_with_report(node, organisation, policy)
            .await?
            .into_decision())
    }

    /// Like [`decide_typed`](Self::decide_typed), returning the full outcome.
    pub async fn decide_typed_with_report(
        &self,
        node: &Node,
        organisation: &Organisation,
        policy: &ScanPolicy,
    ) -> OrchestrationResult<DecisionOutcome> {
        crate::audit::emit_decision_requested(node, organisation);

        if let Err(e) = check_permissions(node, organisation) {
            tracing::warn!(node_id = %node.id, error = %e, "Node refused by permission check");
            crate::audit::emit_permission_denied(node, &e);
            return Err(e.into());
        }

        let prompt = generate_prompt(node, organisation, policy);
        tracing::debug!(node_id = %node.id, prompt_len = prompt.len(), "Prompt generated");

        let GatewayResponse {
            payload,
            provider,
            attempts,
        } = self
            .gateway
            .obtain_decision(&prompt)
            .await
            .map_err(|e| match e {
                ProviderError::Unparseable { details, .. } => {
                    OrchestrationError::from(SchemaError::unparseable("decision", details))
                }
                other => OrchestrationError::from(other),
            })?;

        let proposal = OrchestrationDecision::from_value(&Value::Object(payload))?;

        tracing::info!(
            node_id = %node.id,
            provider = %provider,
            action = %proposal.next_action(),
            scan_level = ?proposal.scan_level(),
            confidence = proposal.confidence,
            "Decision proposed"
        );

        let report = apply_overrides(proposal.clone(), node, organisation, policy);
        for applied in &report.applied {
            tracing::info!(
                node_id = %node.id,
                rule = %applied.rule,
                from = %applied.from_action,
                to = %applied.to_action,
                "Policy override applied"
            );
            crate::audit::emit_override_applied(&crate::audit::OverrideAuditEvent::new(
                node.id.clone(),
                applied,
            ));
        }

        crate::audit::emit_decision_finalised(&crate::audit::DecisionAuditEvent::new(
            node,
            organisation,
            provider.clone(),
            attempts,
            &proposal,
            &report.decision,
            &report.applied,
        ));

        Ok(DecisionOutcome {
            decision: report.decision,
            proposal,
            overrides: report.applied,
            provider,
            attempts,
        })
    }
}

/// Validates the three inbound documents, reporting every violation at once.
fn normalize(
    node: &Value,
    organisation: &Value,
    policy: &Value,
) -> Result<(Node, Organisation, ScanPolicy), SchemaError> {
    let node = Node::from_value(node);
    let organisation = Organisation::from_value(organisation);
    let policy = ScanPolicy::from_value(policy);

    match (node, organisation, policy) {
        (Ok(node), Ok(organisation), Ok(policy)) => Ok((node, organisation, policy)),
        (node, organisation, policy) => {
            let errors = [node.err(), organisation.err(), policy.err()]
                .into_iter()
                .flatten()
                .collect();
            Err(SchemaError::combine("request", errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockProvider;
    use crate::core::{NextAction, ScanLevel};
    use serde_json::json;

    fn inputs() -> (Value, Value, Value) {
        (
            json!({"id": "n1", "host": "10.0.0.1", "protocol": "sui"}),
            json!({"id": "org", "ferocious_enabled": false}),
            json!({"max_escalation": "ferocious"}),
        )
    }

    #[test]
    fn test_builder_requires_provider() {
        let err = DecisionPipeline::builder().build().unwrap_err();
        assert!(err.message.contains("no decision provider"));
    }

    #[tokio::test]
    async fn test_decide_returns_proposal_when_no_rule_fires() {
        let pipeline = DecisionPipeline::builder()
            .primary(MockProvider::new_json(json!({
                "next_action": "scan_light",
                "scan_level": "light",
                "reasoning": "first look",
                "confidence": 0.6
            })))
            .build()
            .unwrap();

        let (node, org, policy) = inputs();
        let outcome = pipeline.decide_with_report(&node, &org, &policy).await.unwrap();
        assert_eq!(outcome.decision.next_action(), NextAction::ScanLight);
        assert_eq!(outcome.decision.confidence, 0.6);
        assert_eq!(outcome.provider, "mock");
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.is_overridden());
    }

    #[tokio::test]
    async fn test_outcome_keeps_raw_proposal() {
        let pipeline = DecisionPipeline::builder()
            .primary(MockProvider::new_json(json!({
                "next_action": "scan_ferocious",
                "scan_level": "ferocious",
                "reasoning": "suspicious ports"
            })))
            .build()
            .unwrap();

        let (node, org, policy) = inputs();
        let outcome = pipeline.decide_with_report(&node, &org, &policy).await.unwrap();
        assert_eq!(outcome.proposal.scan_level(), Some(ScanLevel::Ferocious));
        assert_eq!(outcome.decision.scan_level(), Some(ScanLevel::Medium));
        assert_eq!(outcome.overrides.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_reported_together() {
        let provider = Arc::new(MockProvider::new());
        let pipeline = DecisionPipeline::builder()
            .primary_arc(provider.clone())
            .build()
            .unwrap();

        let err = pipeline
            .decide(
                &json!({"id": "n1"}),
                &json!({"id": "org", "max_concurrent_scans": 0}),
                &json!({"max_escalation": "nuclear"}),
            )
            .await
            .unwrap_err();

        match err {
            OrchestrationError::Schema(e) => {
                assert!(e.has_violation("node.host"));
                assert!(e.has_violation("organisation.max_concurrent_scans"));
                assert!(e.has_violation("policy.max_escalation"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_schema_violating_payload() {
        let pipeline = DecisionPipeline::builder()
            .primary(MockProvider::new_json(json!({
                "next_action": "manual_review",
                "scan_level": "light",
                "reasoning": "odd"
            })))
            .build()
            .unwrap();

        let (node, org, policy) = inputs();
        let err = pipeline.decide(&node, &org, &policy).await.unwrap_err();
        assert!(err.is_schema());
    }
}

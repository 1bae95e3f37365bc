//! Audit event types and emission functions.

use crate::core::{Node, OrchestrationDecision, Organisation, PermissionDeniedError, ProviderError};
use crate::policy::AppliedOverride;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit event for a finalised decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Node the decision is for.
    pub node_id: String,

    /// Owning organisation.
    pub organisation_id: String,

    /// Provider that produced the proposal.
    pub provider: String,

    /// Provider attempts made.
    pub attempts: u32,

    /// Action the provider proposed.
    pub proposed_action: String,

    /// Scan level the provider proposed.
    pub proposed_level: Option<String>,

    /// Final action after overrides.
    pub final_action: String,

    /// Final scan level after overrides.
    pub final_level: Option<String>,

    /// Confidence reported by the provider.
    pub confidence: f64,

    /// Names of the override rules that fired, in order.
    pub overrides: Vec<String>,
}

impl DecisionAuditEvent {
    /// Builds the event from a proposal, its final form and the rules applied.
    pub fn new(
        node: &Node,
        organisation: &Organisation,
        provider: impl Into<String>,
        attempts: u32,
        proposal: &OrchestrationDecision,
        decision: &OrchestrationDecision,
        applied: &[AppliedOverride],
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            node_id: node.id.clone(),
            organisation_id: organisation.id.clone(),
            provider: provider.into(),
            attempts,
            proposed_action: proposal.next_action().to_string(),
            proposed_level: proposal.scan_level().map(|l| l.to_string()),
            final_action: decision.next_action().to_string(),
            final_level: decision.scan_level().map(|l| l.to_string()),
            confidence: decision.confidence,
            overrides: applied.iter().map(|o| o.rule.to_string()).collect(),
        }
    }
}

impl AuditEvent for DecisionAuditEvent {
    fn event_type(&self) -> &'static str {
        "decision_finalised"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for a single override rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Node the decision is for.
    pub node_id: String,

    /// Rule that fired.
    pub rule: String,

    /// Action before the rewrite.
    pub from_action: String,

    /// Scan level before the rewrite.
    pub from_level: Option<String>,

    /// Action after the rewrite.
    pub to_action: String,

    /// Scan level after the rewrite.
    pub to_level: Option<String>,

    /// Reason for the rewrite.
    pub reason: String,
}

impl OverrideAuditEvent {
    /// Builds the event for `applied` on `node_id`.
    pub fn new(node_id: impl Into<String>, applied: &AppliedOverride) -> Self {
        Self {
            timestamp: Utc::now(),
            node_id: node_id.into(),
            rule: applied.rule.to_string(),
            from_action: applied.from_action.to_string(),
            from_level: applied.from_level.map(|l| l.to_string()),
            to_action: applied.to_action.to_string(),
            to_level: applied.to_level.map(|l| l.to_string()),
            reason: applied.reason.clone(),
        }
    }
}

impl AuditEvent for OverrideAuditEvent {
    fn event_type(&self) -> &'static str {
        "override_applied"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a decision request entering the pipeline.
pub fn emit_decision_requested(node: &Node, organisation: &Organisation) {
    tracing::info!(
        target: "pgdn_orchestrator::audit",
        event_type = "decision_requested",
        node_id = %node.id,
        host = %node.host,
        protocol = ?node.protocol,
        status = %node.status,
        organisation_id = %organisation.id,
        "Decision requested"
    );
}

/// Emits an audit event for a node refused by permission checks.
pub fn emit_permission_denied(node: &Node, error: &PermissionDeniedError) {
    tracing::warn!(
        target: "pgdn_orchestrator::audit",
        event_type = "permission_denied",
        node_id = %node.id,
        host = %node.host,
        reason = %error,
        "Permission denied"
    );
}

/// Emits an audit event for a failed provider attempt.
pub fn emit_provider_failure(provider: &str, attempt: u32, error: &ProviderError) {
    tracing::warn!(
        target: "pgdn_orchestrator::audit",
        event_type = "provider_attempt_failed",
        provider = %provider,
        attempt = attempt,
        error = %error,
        "Provider attempt failed"
    );
}

/// Emits an audit event for a fallback from one provider to the next.
pub fn emit_provider_fallback(from: &str, to: &str) {
    tracing::info!(
        target: "pgdn_orchestrator::audit",
        event_type = "provider_fallback",
        from_provider = %from,
        to_provider = %to,
        "Falling back to secondary provider"
    );
}

/// Emits an audit event for an override rewrite.
pub fn emit_override_applied(event: &OverrideAuditEvent) {
    tracing::info!(
        target: "pgdn_orchestrator::audit",
        event_type = event.event_type(),
        node_id = %event.node_id,
        rule = %event.rule,
        from_action = %event.from_action,
        from_level = ?event.from_level,
        to_action = %event.to_action,
        to_level = ?event.to_level,
        reason = %event.reason,
        "Override applied"
    );
}

/// Emits an audit event for a finalised decision.
pub fn emit_decision_finalised(event: &DecisionAuditEvent) {
    tracing::info!(
        target: "pgdn_orchestrator::audit",
        event_type = event.event_type(),
        node_id = %event.node_id,
        organisation_id = %event.organisation_id,
        provider = %event.provider,
        attempts = event.attempts,
        proposed_action = %event.proposed_action,
        final_action = %event.final_action,
        final_level = ?event.final_level,
        confidence = event.confidence,
        overrides = ?event.overrides,
        "Decision finalised"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NextAction, ScanLevel};
    use crate::policy::OverrideRule;

    fn ceiling_override() -> AppliedOverride {
        AppliedOverride {
            rule: OverrideRule::EscalationCeiling,
            from_action: NextAction::ScanFerocious,
            from_level: Some(ScanLevel::Ferocious),
            to_action: NextAction::ScanLight,
            to_level: Some(ScanLevel::Light),
            reason: "policy caps escalation at light".into(),
        }
    }

    #[test]
    fn test_override_event_from_applied() {
        let event = OverrideAuditEvent::new("n1", &ceiling_override());

        assert_eq!(event.event_type(), "override_applied");
        assert_eq!(event.rule, "escalation_ceiling");
        assert_eq!(event.from_level.as_deref(), Some("ferocious"));
        assert_eq!(event.to_action, "scan_light");
    }

    #[test]
    fn test_decision_event_serializes() {
        let node = Node::new("n1", "10.0.0.1");
        let org = Organisation::new("org");
        let proposal = OrchestrationDecision::scan(ScanLevel::Ferocious, "deep");
        let decision = proposal.clone().with_action(NextAction::ScanLight);

        let event = DecisionAuditEvent::new(
            &node,
            &org,
            "anthropic",
            1,
            &proposal,
            &decision,
            &[ceiling_override()],
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["proposed_action"], "scan_ferocious");
        assert_eq!(json["final_level"], "light");
        assert_eq!(json["overrides"][0], "escalation_ceiling");
        assert_eq!(event.event_type(), "decision_finalised");
    }
}

//! The deterministic override pass.
//!
//! Rules run in a fixed order against the possibly already rewritten
//! decision. A rule may only lower the scan tier or cancel the scan.

use crate::core::{NextAction, Node, OrchestrationDecision, Organisation, ScanLevel, ScanPolicy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A deterministic override rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideRule {
    /// Ferocious scans need the organisation's permission; otherwise medium.
    FerociousPermission,
    /// No scan within the cooldown window after the last one.
    Cooldown,
    /// The scan tier may not exceed the policy ceiling.
    EscalationCeiling,
}

impl OverrideRule {
    /// All rules, in evaluation order.
    pub const ORDER: [OverrideRule; 3] = [
        Self::FerociousPermission,
        Self::Cooldown,
        Self::EscalationCeiling,
    ];

    /// Returns the rule's snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FerociousPermission => "ferocious_permission",
            Self::Cooldown => "cooldown",
            Self::EscalationCeiling => "escalation_ceiling",
        }
    }

    /// Returns the action this rule rewrites `decision` to, if it fires.
    pub fn evaluate(&self, decision: &OrchestrationDecision, context: &OverrideContext<'_>) -> Option<NextAction> {
        match self {
            Self::FerociousPermission => {
                (decision.scan_level() == Some(ScanLevel::Ferocious)
                    && !context.organisation.ferocious_enabled)
                    .then_some(NextAction::ScanMedium)
            }
            Self::Cooldown => {
                let last = context.node.last_scan_time?;
                (decision.is_scan() && context.now - last < context.policy.cooldown())
                    .then_some(NextAction::Skip)
            }
            Self::EscalationCeiling => {
                let level = decision.scan_level()?;
                let ceiling = context.policy.max_escalation;
                (level > ceiling).then(|| NextAction::for_level(ceiling))
            }
        }
    }

    fn reason(&self, context: &OverrideContext<'_>) -> String {
        match self {
            Self::FerociousPermission => format!(
                "ferocious scans are not enabled for organisation {}",
                context.organisation.id
            ),
            Self::Cooldown => format!(
                "node was scanned within the last {} hour(s)",
                context.policy.scan_cooldown_hours
            ),
            Self::EscalationCeiling => format!(
                "policy caps escalation at {}",
                context.policy.max_escalation
            ),
        }
    }
}

impl fmt::Display for OverrideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs the override rules are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct OverrideContext<'a> {
    /// The node being decided on.
    pub node: &'a Node,
    /// The owning organisation.
    pub organisation: &'a Organisation,
    /// The global scan policy.
    pub policy: &'a ScanPolicy,
    /// Reference time for the cooldown rule.
    pub now: DateTime<Utc>,
}

/// A rewrite performed by one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOverride {
    /// The rule that fired.
    pub rule: OverrideRule,
    /// Action before the rewrite.
    pub from_action: NextAction,
    /// Scan level before the rewrite.
    pub from_level: Option<ScanLevel>,
    /// Action after the rewrite.
    pub to_action: NextAction,
    /// Scan level after the rewrite.
    pub to_level: Option<ScanLevel>,
    /// Human-readable reason.
    pub reason: String,
}

/// Result of the override pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideReport {
    /// The final decision.
    pub decision: OrchestrationDecision,
    /// Rewrites that were applied, in order.
    pub applied: Vec<AppliedOverride>,
}

impl OverrideReport {
    /// Returns `true` if any rule changed the decision.
    pub fn is_overridden(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Returns `true` if `rule` fired.
    pub fn fired(&self, rule: OverrideRule) -> bool {
        self.applied.iter().any(|o| o.rule == rule)
    }
}

/// Applies the override rules using the current time.
pub fn apply_overrides(
    decision: OrchestrationDecision,
    node: &Node,
    organisation: &Organisation,
    policy: &ScanPolicy,
) -> OverrideReport {
    apply_overrides_at(decision, node, organisation, policy, Utc::now())
}

/// Applies the override rules with `now` as the reference time.
///
/// Pure: equal inputs give equal reports. Applying the pass to its own
/// output fires no further rules.
pub fn apply_overrides_at(
    decision: OrchestrationDecision,
    node: &Node,
    organisation: &Organisation,
    policy: &ScanPolicy,
    now: DateTime<Utc>,
) -> OverrideReport {
    let context = OverrideContext {
        node,
        organisation,
        policy,
        now,
    };

    let mut decision = decision;
    let mut applied = Vec::new();

    for rule in OverrideRule::ORDER {
        let Some(to_action) = rule.evaluate(&decision, &context) else {
            continue;
        };
        if to_action == decision.next_action() {
            continue;
        }

        let from_action = decision.next_action();
        let from_level = decision.scan_level();
        decision = decision.with_action(to_action);

        tracing::debug!(
            node_id = %node.id,
            rule = %rule,
            from = %from_action,
            to = %to_action,
            "Override rule fired"
        );

        applied.push(AppliedOverride {
            rule,
            from_action,
            from_level,
            to_action,
            to_level: decision.scan_level(),
            reason: rule.reason(&context),
        });
    }

    OverrideReport { decision, applied }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn permissive_policy() -> ScanPolicy {
        ScanPolicy::default().with_max_escalation(ScanLevel::Ferocious)
    }

    #[test]
    fn test_ferocious_without_permission_downgrades_to_medium() {
        let node = Node::new("n1", "10.0.0.1");
        let org = Organisation::new("org");
        let decision = OrchestrationDecision::scan(ScanLevel::Ferocious, "deep dive");

        let report = apply_overrides_at(decision, &node, &org, &permissive_policy(), now());
        assert_eq!(report.decision.next_action(), NextAction::ScanMedium);
        assert_eq!(report.decision.scan_level(), Some(ScanLevel::Medium));
        assert!(report.fired(OverrideRule::FerociousPermission));
    }

    #[test]
    fn test_ferocious_with_permission_is_kept() {
        let node = Node::new("n1", "10.0.0.1");
        let org = Organisation::new("org").with_ferocious_enabled(true);
        let decision = OrchestrationDecision::scan(ScanLevel::Ferocious, "deep dive");

        let report = apply_overrides_at(decision, &node, &org, &permissive_policy(), now());
        assert_eq!(report.decision.scan_level(), Some(ScanLevel::Ferocious));
        assert!(!report.is_overridden());
    }

    #[test]
    fn test_cooldown_cancels_any_scan_tier() {
        let node = Node::new("n1", "10.0.0.1").with_last_scan(now() - Duration::hours(2), ScanLevel::Light);
        let org = Organisation::new("org").with_ferocious_enabled(true);

        for level in ScanLevel::ALL {
            let decision = OrchestrationDecision::scan(level, "again");
            let report = apply_overrides_at(decision, &node, &org, &permissive_policy(), now());
            assert_eq!(report.decision.next_action(), NextAction::Skip);
            assert_eq!(report.decision.scan_level(), None);
        }
    }

    #[test]
    fn test_cooldown_expired_allows_scan() {
        let node = Node::new("n1", "10.0.0.1").with_last_scan(now() - Duration::hours(25), ScanLevel::Light);
        let org = Organisation::new("org");
        let decision = OrchestrationDecision::scan(ScanLevel::Light, "routine");

        let report = apply_overrides_at(decision, &node, &org, &ScanPolicy::default(), now());
        assert_eq!(report.decision.next_action(), NextAction::ScanLight);
    }

    #[test]
    fn test_cooldown_ignores_non_scan_actions() {
        let node = Node::new("n1", "10.0.0.1").with_last_scan(now(), ScanLevel::Light);
        let org = Organisation::new("org");
        let decision = OrchestrationDecision::new(NextAction::ManualReview, "odd results");

        let report = apply_overrides_at(decision, &node, &org, &ScanPolicy::default(), now());
        assert_eq!(report.decision.next_action(), NextAction::ManualReview);
        assert!(!report.is_overridden());
    }

    #[test]
    fn test_zero_cooldown_never_fires() {
        let node = Node::new("n1", "10.0.0.1").with_last_scan(now(), ScanLevel::Light);
        let org = Organisation::new("org");
        let policy = ScanPolicy::default().with_scan_cooldown_hours(0);
        let decision = OrchestrationDecision::scan(ScanLevel::Light, "routine");

        let report = apply_overrides_at(decision, &node, &org, &policy, now());
        assert_eq!(report.decision.next_action(), NextAction::ScanLight);
    }

    #[test]
    fn test_ceiling_caps_level() {
        let node = Node::new("n1", "10.0.0.1");
        let org = Organisation::new("org").with_ferocious_enabled(true);
        let policy = ScanPolicy::default().with_max_escalation(ScanLevel::Light);
        let decision = OrchestrationDecision::scan(ScanLevel::Ferocious, "deep dive");

        let report = apply_overrides_at(decision, &node, &org, &policy, now());
        assert_eq!(report.decision.next_action(), NextAction::ScanLight);
        assert_eq!(report.decision.scan_level(), Some(ScanLevel::Light));
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].rule, OverrideRule::EscalationCeiling);
    }

    #[test]
    fn test_rules_chain_in_order() {
        let node = Node::new("n1", "10.0.0.1");
        let org = Organisation::new("org");
        let policy = ScanPolicy::default().with_max_escalation(ScanLevel::Light);
        let decision = OrchestrationDecision::scan(ScanLevel::Ferocious, "deep dive");

        let report = apply_overrides_at(decision, &node, &org, &policy, now());
        let rules: Vec<OverrideRule> = report.applied.iter().map(|o| o.rule).collect();
        assert_eq!(
            rules,
            vec![OverrideRule::FerociousPermission, OverrideRule::EscalationCeiling]
        );
        assert_eq!(report.applied[0].to_level, Some(ScanLevel::Medium));
        assert_eq!(report.applied[1].from_level, Some(ScanLevel::Medium));
        assert_eq!(report.decision.scan_level(), Some(ScanLevel::Light));
    }

    #[test]
    fn test_pass_is_idempotent() {
        let node = Node::new("n1", "10.0.0.1").with_last_scan(now() - Duration::hours(30), ScanLevel::Light);
        let org = Organisation::new("org");
        let policy = ScanPolicy::default();

        for action in NextAction::ALL {
            let decision = OrchestrationDecision::new(action, "proposal");
            let first = apply_overrides_at(decision, &node, &org, &policy, now());
            let second = apply_overrides_at(first.decision.clone(), &node, &org, &policy, now());
            assert_eq!(second.decision, first.decision);
            assert!(!second.is_overridden());
        }
    }

    #[test]
    fn test_overrides_preserve_other_fields() {
        let node = Node::new("n1", "10.0.0.1");
        let org = Organisation::new("org");
        let decision = OrchestrationDecision::scan(ScanLevel::Ferocious, "deep dive")
            .with_confidence(0.9)
            .with_follow_up("if open ports", "scan_medium");
        let timestamp = decision.timestamp;

        let report = apply_overrides_at(decision, &node, &org, &permissive_policy(), now());
        assert_eq!(report.decision.reasoning, "deep dive");
        assert_eq!(report.decision.confidence, 0.9);
        assert_eq!(report.decision.expected_follow_up.len(), 1);
        assert_eq!(report.decision.timestamp, timestamp);
    }
}

//! The decision produced for a node.

use crate::core::error::{FieldViolation, SchemaError, SchemaResult, ViolationKind};
use crate::core::schema::FieldReader;
use crate::core::types::{FollowUpAction, NextAction, ScanLevel};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Confidence assumed when a provider omits it.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// An orchestration decision for a single node.
///
/// `scan_level` is `Some` exactly when `next_action` is a scan, and then
/// names the same tier. Every constructor upholds this.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationDecision {
    next_action: NextAction,
    scan_level: Option<ScanLevel>,
    /// Explanation of the decision.
    pub reasoning: String,
    /// Expected follow-ups, in order.
    pub expected_follow_up: Vec<FollowUpAction>,
    /// Confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// When the decision was created.
    pub timestamp: DateTime<Utc>,
}

impl OrchestrationDecision {
    /// Creates a decision for `action`; the scan level follows from it.
    pub fn new(action: NextAction, reasoning: impl Into<String>) -> Self {
        Self {
            next_action: action,
            scan_level: action.scan_level(),
            reasoning: reasoning.into(),
            expected_follow_up: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
            timestamp: Utc::now(),
        }
    }

    /// Creates a scan decision at `level`.
    pub fn scan(level: ScanLevel, reasoning: impl Into<String>) -> Self {
        Self::new(NextAction::for_level(level), reasoning)
    }

    /// Sets the confidence, clamped to `0.0..=1.0`.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Appends an expected follow-up.
    pub fn with_follow_up(mut self, condition: impl Into<String>, action: impl Into<String>) -> Self {
        self.expected_follow_up
            .push(FollowUpAction::new(condition, action));
        self
    }

    /// The immediate next action.
    pub fn next_action(&self) -> NextAction {
        self.next_action
    }

    /// The scan tier, present only for scan actions.
    pub fn scan_level(&self) -> Option<ScanLevel> {
        self.scan_level
    }

    /// Returns `true` if the decision runs a scan.
    pub fn is_scan(&self) -> bool {
        self.next_action.is_scan()
    }

    /// Returns a copy with `action` and its matching scan level.
    pub fn with_action(mut self, action: NextAction) -> Self {
        self.next_action = action;
        self.scan_level = action.scan_level();
        self
    }

    /// Validates a provider payload into a decision stamped with the
    /// current time.
    pub fn from_value(value: &Value) -> SchemaResult<Self> {
        Self::from_value_at(value, Utc::now())
    }

    /// Validates a provider payload into a decision stamped with `timestamp`.
    ///
    /// Any timestamp in the payload is ignored.
    pub fn from_value_at(value: &Value, timestamp: DateTime<Utc>) -> SchemaResult<Self> {
        let mut r = FieldReader::new("decision", value);

        let next_action: Option<NextAction> = r.required_enum("next_action", NextAction::NAMES);
        let scan_level: Option<ScanLevel> = r.optional_enum("scan_level", ScanLevel::NAMES);
        let reasoning = r.required_str("reasoning");
        let confidence = r.f64_in_or("confidence", DEFAULT_CONFIDENCE, 0.0, 1.0);

        let mut expected_follow_up = Vec::new();
        for (index, item) in r.array("expected_follow_up").into_iter().enumerate() {
            let condition = item.get("condition").and_then(Value::as_str);
            let action = item.get("action").and_then(Value::as_str);
            match (condition, action) {
                (Some(condition), Some(action)) => {
                    expected_follow_up.push(FollowUpAction::new(condition, action));
                }
                _ => r.fail(
                    format!("expected_follow_up[{index}]"),
                    ViolationKind::WrongType {
                        expected: "object with string 'condition' and 'action'",
                    },
                ),
            }
        }

        if let Some(action) = next_action {
            if let Some(violation) = level_mismatch(action, scan_level, value) {
                r.fail(violation.field, violation.kind);
            }
        }

        r.finish()?;

        let next_action = next_action.unwrap_or(NextAction::Skip);
        Ok(Self {
            next_action,
            scan_level: next_action.scan_level(),
            reasoning: reasoning.unwrap_or_default(),
            expected_follow_up,
            confidence,
            timestamp,
        })
    }

    /// Re-checks the action/level invariant.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.scan_level == self.next_action.scan_level() {
            Ok(())
        } else {
            Err(SchemaError::new(
                "decision",
                vec![FieldViolation::new(
                    "scan_level",
                    ViolationKind::Inconsistent {
                        reason: format!(
                            "scan_level {:?} does not match next_action '{}'",
                            self.scan_level, self.next_action
                        ),
                    },
                )],
            ))
        }
    }
}

/// Checks that the payload's `scan_level` agrees with `action`.
///
/// An unparseable `scan_level` has already been reported, so only a
/// parsed-or-absent level is compared.
fn level_mismatch(
    action: NextAction,
    scan_level: Option<ScanLevel>,
    raw: &Value,
) -> Option<FieldViolation> {
    let level_present = raw
        .get("scan_level")
        .is_some_and(|value| !value.is_null());
    if level_present && scan_level.is_none() {
        return None;
    }

    let reason = match (action.scan_level(), scan_level) {
        (Some(expected), Some(actual)) if expected == actual => return None,
        (None, None) => return None,
        (Some(expected), Some(actual)) => {
            format!("'{action}' requires scan_level '{expected}', got '{actual}'")
        }
        (Some(expected), None) => format!("'{action}' requires scan_level '{expected}'"),
        (None, Some(actual)) => {
            format!("'{action}' is not a scan action but scan_level is '{actual}'")
        }
    };
    Some(FieldViolation::new(
        "scan_level",
        ViolationKind::Inconsistent { reason },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_scan_decision() {
        let decision = OrchestrationDecision::from_value(&json!({
            "next_action": "scan_medium",
            "scan_level": "medium",
            "reasoning": "Known protocol, trust score below threshold",
            "expected_follow_up": [
                {"condition": "vulnerabilities found", "action": "manual_review"}
            ],
            "confidence": 0.9
        }))
        .unwrap();

        assert_eq!(decision.next_action(), NextAction::ScanMedium);
        assert_eq!(decision.scan_level(), Some(ScanLevel::Medium));
        assert_eq!(decision.expected_follow_up.len(), 1);
        assert_eq!(decision.confidence, 0.9);
    }

    #[test]
    fn test_from_value_defaults() {
        let decision = OrchestrationDecision::from_value(&json!({
            "next_action": "run_discovery",
            "scan_level": null,
            "reasoning": "Protocol unknown"
        }))
        .unwrap();

        assert_eq!(decision.scan_level(), None);
        assert_eq!(decision.confidence, DEFAULT_CONFIDENCE);
        assert!(decision.expected_follow_up.is_empty());
    }

    #[test]
    fn test_from_value_rejects_level_on_non_scan() {
        let err = OrchestrationDecision::from_value(&json!({
            "next_action": "run_discovery",
            "scan_level": "light",
            "reasoning": "Protocol unknown"
        }))
        .unwrap_err();
        assert!(matches!(
            err.violation("scan_level").unwrap().kind,
            ViolationKind::Inconsistent { .. }
        ));
    }

    #[test]
    fn test_from_value_rejects_mismatched_tier() {
        let err = OrchestrationDecision::from_value(&json!({
            "next_action": "scan_light",
            "scan_level": "ferocious",
            "reasoning": "x"
        }))
        .unwrap_err();
        assert!(err.has_violation("scan_level"));

        let err = OrchestrationDecision::from_value(&json!({
            "next_action": "scan_light",
            "reasoning": "x"
        }))
        .unwrap_err();
        assert!(err.has_violation("scan_level"));
    }

    #[test]
    fn test_from_value_collects_all_violations() {
        let err = OrchestrationDecision::from_value(&json!({
            "next_action": "scan_everything",
            "reasoning": "",
            "confidence": 1.5,
            "expected_follow_up": [{"condition": "x"}]
        }))
        .unwrap_err();

        assert!(err.has_violation("next_action"));
        assert!(err.has_violation("reasoning"));
        assert!(err.has_violation("confidence"));
        assert!(err.has_violation("expected_follow_up[0]"));
    }

    #[test]
    fn test_with_action_keeps_invariant() {
        let decision = OrchestrationDecision::scan(ScanLevel::Ferocious, "deep dive");
        let skipped = decision.clone().with_action(NextAction::Skip);
        assert_eq!(skipped.scan_level(), None);
        assert!(skipped.validate().is_ok());
        assert_eq!(skipped.timestamp, decision.timestamp);
    }

    #[test]
    fn test_payload_timestamp_ignored() {
        let stamp = Utc::now();
        let decision = OrchestrationDecision::from_value_at(
            &json!({
                "next_action": "skip",
                "reasoning": "cooldown",
                "timestamp": "1999-01-01T00:00:00Z"
            }),
            stamp,
        )
        .unwrap();
        assert_eq!(decision.timestamp, stamp);
    }
}

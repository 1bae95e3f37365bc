//! Enumerations shared by the schema types.
//!
//! Scan tiers, decision actions, and node lifecycle states are closed sets.
//! Each has a stable snake_case wire form used by serde, `Display`, and
//! `FromStr`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A scan tier, ordered by invasiveness.
///
/// The derived ordering is the escalation order: `Light < Medium < Ferocious`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanLevel {
    /// Basic reconnaissance and port scanning.
    Light,
    /// Service analysis, vulnerability detection and trust scoring.
    Medium,
    /// Deep, aggressive assessment; requires organisation permission.
    Ferocious,
}

impl ScanLevel {
    /// Wire names of all tiers, in escalation order.
    pub const NAMES: &'static [&'static str] = &["light", "medium", "ferocious"];

    /// All tiers, in escalation order.
    pub const ALL: [ScanLevel; 3] = [Self::Light, Self::Medium, Self::Ferocious];

    /// Returns the wire name of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Ferocious => "ferocious",
        }
    }

    /// One-line description used in prompts.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Light => "basic recon and port scanning",
            Self::Medium => "service analysis, vulnerability detection, and trust scoring",
            Self::Ferocious => {
                "deep, aggressive scan with comprehensive security assessment (requires permission)"
            }
        }
    }

    /// Returns the matching scan action.
    pub fn action(&self) -> NextAction {
        NextAction::for_level(*self)
    }
}

impl fmt::Display for ScanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "medium" => Ok(Self::Medium),
            "ferocious" => Ok(Self::Ferocious),
            other => Err(other.to_string()),
        }
    }
}

/// The immediate next action proposed for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// Identify the node's protocol and services.
    RunDiscovery,
    /// Basic reconnaissance scan.
    ScanLight,
    /// Standard security assessment.
    ScanMedium,
    /// Comprehensive security analysis.
    ScanFerocious,
    /// Flag for human investigation.
    ManualReview,
    /// Do not scan this time.
    Skip,
}

impl NextAction {
    /// Wire names of all actions.
    pub const NAMES: &'static [&'static str] = &[
        "run_discovery",
        "scan_light",
        "scan_medium",
        "scan_ferocious",
        "manual_review",
        "skip",
    ];

    /// All actions, in the order they are presented to a provider.
    pub const ALL: [NextAction; 6] = [
        Self::RunDiscovery,
        Self::ScanLight,
        Self::ScanMedium,
        Self::ScanFerocious,
        Self::ManualReview,
        Self::Skip,
    ];

    /// Returns the wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunDiscovery => "run_discovery",
            Self::ScanLight => "scan_light",
            Self::ScanMedium => "scan_medium",
            Self::ScanFerocious => "scan_ferocious",
            Self::ManualReview => "manual_review",
            Self::Skip => "skip",
        }
    }

    /// One-line description used in prompts.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RunDiscovery => "Identify the node's protocol and services",
            Self::ScanLight => "Basic reconnaissance scan",
            Self::ScanMedium => "Standard security assessment",
            Self::ScanFerocious => "Comprehensive security analysis (requires org permission)",
            Self::ManualReview => "Flag for human investigation",
            Self::Skip => "Skip scanning (e.g., due to cooldown or policy)",
        }
    }

    /// Returns `true` if this action runs a scan tier.
    pub fn is_scan(&self) -> bool {
        self.scan_level().is_some()
    }

    /// Returns the tier this action runs, if it is a scan.
    pub fn scan_level(&self) -> Option<ScanLevel> {
        match self {
            Self::ScanLight => Some(ScanLevel::Light),
            Self::ScanMedium => Some(ScanLevel::Medium),
            Self::ScanFerocious => Some(ScanLevel::Ferocious),
            Self::RunDiscovery | Self::ManualReview | Self::Skip => None,
        }
    }

    /// Returns the scan action for `level`.
    pub fn for_level(level: ScanLevel) -> Self {
        match level {
            ScanLevel::Light => Self::ScanLight,
            ScanLevel::Medium => Self::ScanMedium,
            ScanLevel::Ferocious => Self::ScanFerocious,
        }
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NextAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Never scanned.
    #[default]
    New,
    /// Responding normally.
    Active,
    /// Recent scans have failed.
    Failing,
    /// Not reachable.
    Offline,
    /// State could not be determined.
    Unknown,
}

impl NodeStatus {
    /// Wire names of all states.
    pub const NAMES: &'static [&'static str] = &["new", "active", "failing", "offline", "unknown"];

    /// Returns the wire name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Failing => "failing",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "active" => Ok(Self::Active),
            "failing" => Ok(Self::Failing),
            "offline" => Ok(Self::Offline),
            "unknown" => Ok(Self::Unknown),
            other => Err(other.to_string()),
        }
    }
}

/// An expected follow-up: when `condition` holds, take `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpAction {
    /// Condition that triggers the follow-up.
    pub condition: String,
    /// Action to take when the condition is met.
    pub action: String,
}

impl FollowUpAction {
    /// Creates a new follow-up.
    pub fn new(condition: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            action: action.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_level_ordering() {
        assert!(ScanLevel::Light < ScanLevel::Medium);
        assert!(ScanLevel::Medium < ScanLevel::Ferocious);
        assert_eq!(ScanLevel::Ferocious.min(ScanLevel::Light), ScanLevel::Light);
    }

    #[test]
    fn test_next_action_scan_level_consistency() {
        for action in NextAction::ALL {
            match action.scan_level() {
                Some(level) => {
                    assert!(action.as_str().ends_with(level.as_str()));
                    assert_eq!(NextAction::for_level(level), action);
                }
                None => assert!(!action.as_str().starts_with("scan_")),
            }
        }
    }

    #[test]
    fn test_next_action_from_str() {
        assert_eq!("scan_medium".parse::<NextAction>(), Ok(NextAction::ScanMedium));
        assert_eq!("skip".parse::<NextAction>(), Ok(NextAction::Skip));
        assert_eq!("scan_extreme".parse::<NextAction>(), Err("scan_extreme".to_string()));
    }

    #[test]
    fn test_wire_names_match_serde() {
        for action in NextAction::ALL {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, serde_json::Value::String(action.to_string()));
        }
        for level in ScanLevel::ALL {
            let json = serde_json::to_value(level).unwrap();
            assert_eq!(json, serde_json::Value::String(level.to_string()));
        }
        assert_eq!(NodeStatus::default(), NodeStatus::New);
        assert_eq!(NodeStatus::NAMES.len(), 5);
    }
}

//! Inbound entities: the node under evaluation, its owning organisation,
//! and the global scan policy.
//!
//! All three are built from untyped JSON through `from_value`, which is the
//! single validation boundary. Their serde `Deserialize` impls route through
//! the same code.

use crate::core::error::{SchemaError, SchemaResult};
use crate::core::schema::FieldReader;
use crate::core::types::{NodeStatus, ScanLevel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A network endpoint under evaluation for scanning.
///
/// Read-only to the orchestrator; the scan executor updates it between
/// decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Node {
    /// Unique node identifier.
    pub id: String,
    /// Hostname or IP address.
    pub host: String,
    /// Classified protocol (sui, filecoin, ...), if known.
    pub protocol: Option<String>,
    /// Lifecycle state.
    pub status: NodeStatus,
    /// When the node was last scanned.
    pub last_scan_time: Option<DateTime<Utc>>,
    /// Tier of the last scan performed.
    pub last_scan_level: Option<ScanLevel>,
    /// Number of discovery attempts made so far.
    pub discovery_attempts: u32,
    /// Number of consecutive scan failures.
    pub scan_failures: u32,
    /// Known open ports.
    pub open_ports: BTreeSet<u16>,
    /// Identified services, keyed by service name.
    pub services: BTreeMap<String, String>,
    /// Trust score in `0..=100`, if calculated.
    pub trust_score: Option<f64>,
    /// Prior scan records, oldest first.
    pub scan_history: Vec<Value>,
}

impl Node {
    /// Creates a fresh node with no history.
    pub fn new(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            protocol: None,
            status: NodeStatus::New,
            last_scan_time: None,
            last_scan_level: None,
            discovery_attempts: 0,
            scan_failures: 0,
            open_ports: BTreeSet::new(),
            services: BTreeMap::new(),
            trust_score: None,
            scan_history: Vec::new(),
        }
    }

    /// Creates a fresh node for `host` with a random UUID identifier.
    pub fn with_generated_id(host: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), host)
    }

    /// Sets the protocol.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Records the last scan.
    pub fn with_last_scan(mut self, at: DateTime<Utc>, level: ScanLevel) -> Self {
        self.last_scan_time = Some(at);
        self.last_scan_level = Some(level);
        self
    }

    /// Sets the trust score.
    pub fn with_trust_score(mut self, score: f64) -> Self {
        self.trust_score = Some(score);
        self
    }

    /// Adds an open port.
    pub fn with_open_port(mut self, port: u16) -> Self {
        self.open_ports.insert(port);
        self
    }

    /// Adds an identified service.
    pub fn with_service(mut self, name: impl Into<String>, ident: impl Into<String>) -> Self {
        self.services.insert(name.into(), ident.into());
        self
    }

    /// Validates an untyped node document.
    pub fn from_value(value: &Value) -> SchemaResult<Self> {
        let mut r = FieldReader::new("node", value);

        let id = r.required_str("id");
        let host = r.required_str("host");
        let protocol = r.optional_str("protocol");
        let status = r.enum_or("status", NodeStatus::NAMES, NodeStatus::New);
        let last_scan_time = r.optional_timestamp("last_scan_time");
        let last_scan_level = r.optional_enum("last_scan_level", ScanLevel::NAMES);
        let discovery_attempts = r.u32_or("discovery_attempts", 0, 0);
        let scan_failures = r.u32_or("scan_failures", 0, 0);
        let open_ports = r.port_set("open_ports");
        let services = r.string_map("services");
        let trust_score = r.optional_f64_in("trust_score", 0.0, 100.0);
        let scan_history = r.array("scan_history").into_iter().cloned().collect();

        r.finish()?;

        Ok(Self {
            id: id.unwrap_or_default(),
            host: host.unwrap_or_default(),
            protocol,
            status,
            last_scan_time,
            last_scan_level,
            discovery_attempts,
            scan_failures,
            open_ports,
            services,
            trust_score,
            scan_history,
        })
    }
}

impl TryFrom<Value> for Node {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

/// Default number of concurrent scans an organisation may run.
pub const DEFAULT_MAX_CONCURRENT_SCANS: u32 = 10;

/// The permission-and-policy owner of a set of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Organisation {
    /// Organisation identifier.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Whether the most invasive tier is permitted.
    pub ferocious_enabled: bool,
    /// Concurrency limit, informational only.
    pub max_concurrent_scans: u32,
    /// Daily scan budget, if limited.
    pub scan_budget_daily: Option<u32>,
    /// Protocols the organisation may scan; empty means unrestricted.
    pub whitelisted_protocols: BTreeSet<String>,
    /// Hosts that must never be scanned (exact match).
    pub blacklisted_hosts: BTreeSet<String>,
    /// Opaque preferences, passed through uninterpreted.
    pub scan_preferences: Map<String, Value>,
}

impl Organisation {
    /// Creates an organisation with default permissions.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: Some(format!("Organisation {id}")),
            id,
            ferocious_enabled: false,
            max_concurrent_scans: DEFAULT_MAX_CONCURRENT_SCANS,
            scan_budget_daily: None,
            whitelisted_protocols: BTreeSet::new(),
            blacklisted_hosts: BTreeSet::new(),
            scan_preferences: Map::new(),
        }
    }

    /// Enables or disables ferocious scans.
    pub fn with_ferocious_enabled(mut self, enabled: bool) -> Self {
        self.ferocious_enabled = enabled;
        self
    }

    /// Whitelists a protocol.
    pub fn with_whitelisted_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.whitelisted_protocols.insert(protocol.into());
        self
    }

    /// Blacklists a host.
    pub fn with_blacklisted_host(mut self, host: impl Into<String>) -> Self {
        self.blacklisted_hosts.insert(host.into());
        self
    }

    /// Sets the daily scan budget.
    pub fn with_scan_budget_daily(mut self, budget: u32) -> Self {
        self.scan_budget_daily = Some(budget);
        self
    }

    /// Validates an untyped organisation document.
    pub fn from_value(value: &Value) -> SchemaResult<Self> {
        let mut r = FieldReader::new("organisation", value);

        let id = r.required_str("id");
        let name = r.optional_str("name");
        let ferocious_enabled = r.bool_or("ferocious_enabled", false);
        let max_concurrent_scans =
            r.u32_or("max_concurrent_scans", DEFAULT_MAX_CONCURRENT_SCANS, 1);
        let scan_budget_daily = r.optional_u32("scan_budget_daily", 0);
        let whitelisted_protocols = r.string_set("whitelisted_protocols");
        let blacklisted_hosts = r.string_set("blacklisted_hosts");
        let scan_preferences = r
            .object_field("scan_preferences")
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        r.finish()?;

        Ok(Self {
            id: id.unwrap_or_default(),
            name,
            ferocious_enabled,
            max_concurrent_scans,
            scan_budget_daily,
            whitelisted_protocols,
            blacklisted_hosts,
            scan_preferences,
        })
    }
}

impl TryFrom<Value> for Organisation {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

/// Global scan policy, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ScanPolicy {
    /// Highest tier any decision may reach.
    pub max_escalation: ScanLevel,
    /// Whether protocol discovery must precede scanning.
    pub require_discovery: bool,
    /// Discovery attempts before manual review.
    pub max_discovery_attempts: u32,
    /// Minimum hours between scans of the same node.
    pub scan_cooldown_hours: u32,
    /// Whether automatic escalation is allowed.
    pub auto_escalation_enabled: bool,
    /// Trust score below which medium scans are warranted.
    pub trust_score_threshold_medium: f64,
    /// Trust score below which ferocious scans are warranted.
    pub trust_score_threshold_ferocious: f64,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            max_escalation: ScanLevel::Medium,
            require_discovery: true,
            max_discovery_attempts: 3,
            scan_cooldown_hours: 24,
            auto_escalation_enabled: true,
            trust_score_threshold_medium: 70.0,
            trust_score_threshold_ferocious: 50.0,
        }
    }
}

impl ScanPolicy {
    /// Sets the escalation ceiling.
    pub fn with_max_escalation(mut self, level: ScanLevel) -> Self {
        self.max_escalation = level;
        self
    }

    /// Sets the cooldown window in hours.
    pub fn with_scan_cooldown_hours(mut self, hours: u32) -> Self {
        self.scan_cooldown_hours = hours;
        self
    }

    /// Returns the cooldown window as a duration.
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.scan_cooldown_hours))
    }

    /// Validates an untyped policy document. Absent fields take defaults.
    pub fn from_value(value: &Value) -> SchemaResult<Self> {
        let defaults = Self::default();
        let mut r = FieldReader::new("policy", value);

        let max_escalation = r.enum_or("max_escalation", ScanLevel::NAMES, defaults.max_escalation);
        let require_discovery = r.bool_or("require_discovery", defaults.require_discovery);
        let max_discovery_attempts =
            r.u32_or("max_discovery_attempts", defaults.max_discovery_attempts, 1);
        let scan_cooldown_hours = r.u32_or("scan_cooldown_hours", defaults.scan_cooldown_hours, 0);
        let auto_escalation_enabled =
            r.bool_or("auto_escalation_enabled", defaults.auto_escalation_enabled);
        let trust_score_threshold_medium = r.f64_in_or(
            "trust_score_threshold_medium",
            defaults.trust_score_threshold_medium,
            0.0,
            100.0,
        );
        let trust_score_threshold_ferocious = r.f64_in_or(
            "trust_score_threshold_ferocious",
            defaults.trust_score_threshold_ferocious,
            0.0,
            100.0,
        );

        r.finish()?;

        Ok(Self {
            max_escalation,
            require_discovery,
            max_discovery_attempts,
            scan_cooldown_hours,
            auto_escalation_enabled,
            trust_score_threshold_medium,
            trust_score_threshold_ferocious,
        })
    }
}

impl TryFrom<Value> for ScanPolicy {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ViolationKind;
    use serde_json::json;

    #[test]
    fn test_node_minimal_document() {
        let node = Node::from_value(&json!({"id": "n1", "host": "10.0.0.5"})).unwrap();
        assert_eq!(node, Node::new("n1", "10.0.0.5"));
    }

    #[test]
    fn test_node_full_document() {
        let node = Node::from_value(&json!({
            "id": "n1",
            "host": "validator.example.net",
            "protocol": "sui",
            "status": "active",
            "last_scan_time": "2024-03-01T08:30:00Z",
            "last_scan_level": "medium",
            "discovery_attempts": 1,
            "scan_failures": 0,
            "open_ports": [9000, 22, 22],
            "services": {"ssh": "OpenSSH_8.9"},
            "trust_score": 82.5,
            "scan_history": [{"level": "light", "ok": true}]
        }))
        .unwrap();

        assert_eq!(node.protocol.as_deref(), Some("sui"));
        assert_eq!(node.status, NodeStatus::Active);
        assert_eq!(node.last_scan_level, Some(ScanLevel::Medium));
        assert_eq!(node.open_ports.iter().copied().collect::<Vec<_>>(), vec![22, 9000]);
        assert_eq!(node.services.get("ssh").map(String::as_str), Some("OpenSSH_8.9"));
        assert_eq!(node.scan_history.len(), 1);
    }

    #[test]
    fn test_node_reports_every_violation() {
        let err = Node::from_value(&json!({
            "host": "",
            "status": "sleeping",
            "discovery_attempts": -2,
            "trust_score": 140.0,
        }))
        .unwrap_err();

        assert_eq!(err.entity, "node");
        assert_eq!(err.violations.len(), 5);
        assert_eq!(err.violation("id").unwrap().kind, ViolationKind::Missing);
        assert_eq!(err.violation("host").unwrap().kind, ViolationKind::Empty);
        assert!(matches!(
            err.violation("status").unwrap().kind,
            ViolationKind::NotInEnumeration { .. }
        ));
        assert!(err.has_violation("discovery_attempts"));
        assert!(err.has_violation("trust_score"));
    }

    #[test]
    fn test_node_serde_round_trip() {
        let node = Node::new("n1", "1.2.3.4")
            .with_protocol("filecoin")
            .with_last_scan(Utc::now(), ScanLevel::Light)
            .with_open_port(443)
            .with_trust_score(55.0);

        let json = serde_json::to_value(&node).unwrap();
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back.protocol, node.protocol);
        assert_eq!(back.open_ports, node.open_ports);
        assert_eq!(back.last_scan_time, node.last_scan_time);
    }

    #[test]
    fn test_deserialize_runs_validation() {
        let result: Result<Node, _> = serde_json::from_value(json!({"id": "n1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_organisation_defaults() {
        let org = Organisation::from_value(&json!({"id": "acme"})).unwrap();
        assert!(!org.ferocious_enabled);
        assert_eq!(org.max_concurrent_scans, DEFAULT_MAX_CONCURRENT_SCANS);
        assert!(org.whitelisted_protocols.is_empty());
        assert_eq!(Organisation::new("acme").name.as_deref(), Some("Organisation acme"));
    }

    #[test]
    fn test_organisation_rejects_zero_concurrency() {
        let err =
            Organisation::from_value(&json!({"id": "acme", "max_concurrent_scans": 0})).unwrap_err();
        assert!(err.has_violation("max_concurrent_scans"));
    }

    #[test]
    fn test_policy_defaults_and_overrides() {
        let policy = ScanPolicy::from_value(&json!({})).unwrap();
        assert_eq!(policy, ScanPolicy::default());

        let policy =
            ScanPolicy::from_value(&json!({"max_escalation": "light", "scan_cooldown_hours": 0}))
                .unwrap();
        assert_eq!(policy.max_escalation, ScanLevel::Light);
        assert_eq!(policy.cooldown(), chrono::Duration::zero());
    }

    #[test]
    fn test_policy_rejects_unknown_tier() {
        let err = ScanPolicy::from_value(&json!({"max_escalation": "nuclear"})).unwrap_err();
        assert!(matches!(
            err.violation("max_escalation").unwrap().kind,
            ViolationKind::NotInEnumeration { .. }
        ));
    }
}

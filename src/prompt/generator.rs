//! Prompt generation.

use crate::core::{NextAction, Node, Organisation, ScanLevel, ScanPolicy};

use chrono::SecondsFormat;

const PREAMBLE: &str = "You are a DePIN orchestration agent responsible for deciding the next \
scanning action on a node.";

const INSTRUCTIONS: &[&str] = &[
    "Evaluate the node's current state (new, failing, known, open ports, protocol, scan history, etc).",
    "Check the designated protocol. If unknown and the node is new, recommend discovery first.",
    "Verify the organisation's permissions for running ferocious scans.",
    "Consider scan cooldown periods and escalation policies.",
    "Do not escalate scanning without protocol classification or required permissions.",
    "Recommend only the next immediate action based on current state.",
    "Suggest logical follow-up actions based on likely outcomes.",
];

const OUTPUT_SCHEMA_EXAMPLE: &str = r#"```json
{
  "next_action": "scan_medium",
  "scan_level": "medium",
  "reasoning": "Detailed explanation of decision logic",
  "expected_follow_up": [
    {
      "condition": "scan completes and trust score stays above threshold",
      "action": "skip"
    },
    {
      "condition": "critical vulnerabilities are found",
      "action": "manual_review"
    }
  ],
  "confidence": 0.85
}
```"#;

const GUIDELINES: &[&str] = &[
    "New nodes with unknown protocol should start with discovery",
    "Nodes with low trust scores may warrant escalated scanning (if permitted)",
    "Failed discovery attempts should trigger manual review after max attempts",
    "Respect cooldown periods between scans",
    "Consider escalation based on previous scan results and trust scores",
    "Always check organisational permissions before recommending ferocious scans",
];

/// Builds the decision prompt for a node.
///
/// Pure and total: identical inputs always yield byte-identical output.
/// Collections are rendered in sorted order.
pub fn generate_prompt(node: &Node, organisation: &Organisation, policy: &ScanPolicy) -> String {
    let sections = [
        PREAMBLE.to_string(),
        tiers_section(),
        bullet_section("Instructions:", INSTRUCTIONS.iter().map(|s| s.to_string())),
        actions_section(),
        format!(
            "Return your result in JSON using the following schema. `scan_level` must be \
one of {} when `next_action` is a scan action, and null otherwise:\n\n{OUTPUT_SCHEMA_EXAMPLE}",
            ScanLevel::NAMES.join(", ")
        ),
        node_section(node),
        organisation_section(organisation),
        policy_section(policy),
        numbered_section("Decision Guidelines:", GUIDELINES),
    ];
    let mut prompt = sections.join("\n\n");
    prompt.push('\n');
    prompt
}

fn tiers_section() -> String {
    bullet_section(
        "Each node can be scanned at one of three levels:",
        ScanLevel::ALL
            .iter()
            .map(|level| format!("{}: {}", level, level.description())),
    )
}

fn actions_section() -> String {
    bullet_section(
        "Available actions:",
        NextAction::ALL
            .iter()
            .map(|action| format!("{}: {}", action, action.description())),
    )
}

fn node_section(node: &Node) -> String {
    let ports = if node.open_ports.is_empty() {
        "None".to_string()
    } else {
        let ports: Vec<String> = node.open_ports.iter().map(u16::to_string).collect();
        format!("[{}]", ports.join(", "))
    };
    let services = if node.services.is_empty() {
        "None".to_string()
    } else {
        node.services
            .iter()
            .map(|(name, ident)| format!("{name}={ident}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    bullet_section(
        "Node metadata:",
        [
            format!("ID: {}", node.id),
            format!("Host: {}", node.host),
            format!("Protocol: {}", node.protocol.as_deref().unwrap_or("Unknown")),
            format!("Status: {}", node.status),
            format!(
                "Last scan: {}",
                node.last_scan_time
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                    .unwrap_or_else(|| "Never".to_string())
            ),
            format!(
                "Last scan level: {}",
                node.last_scan_level
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "None".to_string())
            ),
            format!("Discovery attempts: {}", node.discovery_attempts),
            format!("Scan failures: {}", node.scan_failures),
            format!("Open ports: {ports}"),
            format!("Services: {services}"),
            format!(
                "Trust score: {}",
                node.trust_score
                    .map(|s| format!("{s:.1}"))
                    .unwrap_or_else(|| "Not calculated".to_string())
            ),
            format!("Scan history count: {}", node.scan_history.len()),
        ],
    )
}

fn organisation_section(org: &Organisation) -> String {
    let whitelisted = if org.whitelisted_protocols.is_empty() {
        "All".to_string()
    } else {
        org.whitelisted_protocols
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    let preferences = if org.scan_preferences.is_empty() {
        "None".to_string()
    } else {
        serde_json::Value::Object(org.scan_preferences.clone()).to_string()
    };

    bullet_section(
        "Organisation context:",
        [
            format!("ID: {}", org.id),
            format!("Name: {}", org.name.as_deref().unwrap_or("Unknown")),
            format!("Ferocious scans enabled: {}", org.ferocious_enabled),
            format!("Max concurrent scans: {}", org.max_concurrent_scans),
            format!(
                "Daily scan budget: {}",
                org.scan_budget_daily
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "Unlimited".to_string())
            ),
            format!("Whitelisted protocols: {whitelisted}"),
            format!("Blacklisted hosts: {} hosts", org.blacklisted_hosts.len()),
            format!("Scan preferences: {preferences}"),
        ],
    )
}

fn policy_section(policy: &ScanPolicy) -> String {
    bullet_section(
        "Global scan policy:",
        [
            format!("Max escalation level: {}", policy.max_escalation),
            format!("Require discovery: {}", policy.require_discovery),
            format!("Max discovery attempts: {}", policy.max_discovery_attempts),
            format!("Scan cooldown hours: {}", policy.scan_cooldown_hours),
            format!("Auto escalation enabled: {}", policy.auto_escalation_enabled),
            format!(
                "Trust thresholds: medium={:.1}, ferocious={:.1}",
                policy.trust_score_threshold_medium, policy.trust_score_threshold_ferocious
            ),
        ],
    )
}

fn bullet_section(heading: &str, lines: impl IntoIterator<Item = String>) -> String {
    let mut out = heading.to_string();
    for line in lines {
        out.push_str("\n- ");
        out.push_str(&line);
    }
    out
}

fn numbered_section(heading: &str, lines: &[&str]) -> String {
    let mut out = heading.to_string();
    for (index, line) in lines.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", index + 1, line));
    }
    out
}

//! Decide example showing a single decision for one node.
//!
//! This example shows how to:
//! - Build a DecisionPipeline around a provider
//! - Submit untyped node, organisation and policy documents
//! - Inspect the proposal and any policy overrides
//!
//! Run with: cargo run --example decide_node
//!
//! Set ANTHROPIC_API_KEY or OPENAI_API_KEY to call a real provider;
//! otherwise a mock provider proposing a ferocious scan is used.

use pgdn_orchestrator::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== pgdn-orchestrator Decide Example ===\n");

    let lookup = |key: &str| std::env::var(key).ok();
    let settings = OrchestratorSettings::default().with_env_overrides(lookup)?;
    let credentials = ProviderCredentials::from_lookup(lookup);

    let pipeline = match settings.build_gateway(&credentials) {
        Ok(gateway) => DecisionPipeline::new(gateway),
        Err(_) => {
            println!("No API keys found, using a mock provider.\n");
            DecisionPipeline::builder()
                .primary(MockProvider::new_json(json!({
                    "next_action": "scan_ferocious",
                    "scan_level": "ferocious",
                    "reasoning": "Many open ports and a low trust score",
                    "expected_follow_up": [
                        {"condition": "if vulnerabilities found", "action": "manual_review"}
                    ],
                    "confidence": 0.72
                })))
                .with_gateway_config(settings.gateway_config())
                .build()?
        }
    };

    let node = json!({
        "id": "node-7f3a",
        "host": "10.20.0.14",
        "protocol": "sui",
        "status": "active",
        "discovery_attempts": 1,
        "open_ports": [22, 80, 9000, 9184],
        "services": {"ssh": "OpenSSH_8.9", "http": "nginx/1.24"},
        "trust_score": 42.5
    });
    let organisation = json!({
        "id": "org-1",
        "name": "Example Validators",
        "ferocious_enabled": false,
        "whitelisted_protocols": ["sui", "filecoin"]
    });
    let policy = serde_json::to_value(&settings.scan_policy)?;

    let outcome = pipeline.decide_with_report(&node, &organisation, &policy).await?;

    println!("Provider:  {} ({} attempt(s))", outcome.provider, outcome.attempts);
    println!(
        "Proposed:  {} {:?}",
        outcome.proposal.next_action(),
        outcome.proposal.scan_level()
    );
    for applied in &outcome.overrides {
        println!("Override:  {} -> {} ({})", applied.rule, applied.to_action, applied.reason);
    }
    println!(
        "Final:     {} {:?}",
        outcome.decision.next_action(),
        outcome.decision.scan_level()
    );
    println!("Reasoning: {}", outcome.decision.reasoning);
    println!("\n{}", serde_json::to_string_pretty(&outcome.decision)?);

    Ok(())
}

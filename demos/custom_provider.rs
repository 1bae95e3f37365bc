//! Custom provider example demonstrating how to implement a new provider.
//!
//! This example shows how to:
//! - Implement the DecisionProvider trait for a rule-based provider
//! - Read node details back out of the generated prompt
//! - Plug the provider into a DecisionPipeline
//!
//! Run with: cargo run --example custom_provider

use async_trait::async_trait;
use pgdn_orchestrator::prelude::*;
use serde_json::json;

/// A provider that never calls a model and proposes a light scan for
/// unscanned nodes and a skip for everything else.
#[derive(Debug)]
struct RuleOfThumbProvider;

#[async_trait]
impl DecisionProvider for RuleOfThumbProvider {
    fn name(&self) -> &str {
        "rule-of-thumb"
    }

    async fn propose(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        let never_scanned = request.prompt.contains("- Last scan: Never");

        tracing::debug!(provider = self.name(), never_scanned, "Proposing decision");

        let decision = if never_scanned {
            json!({
                "next_action": "scan_light",
                "scan_level": "light",
                "reasoning": "Node has never been scanned",
                "confidence": 0.9
            })
        } else {
            json!({
                "next_action": "skip",
                "scan_level": null,
                "reasoning": "Node already has a scan on record",
                "confidence": 0.6
            })
        };

        // Wrapped in a fence to show the gateway strips it
        Ok(format!("```json\n{}\n```", decision))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    println!("=== pgdn-orchestrator Custom Provider Example ===\n");

    let pipeline = DecisionPipeline::builder()
        .primary(RuleOfThumbProvider)
        .build()?;

    let organisation = Organisation::new("org-1");
    let policy = ScanPolicy::default();

    let fresh = Node::new("node-a", "10.0.0.1").with_protocol("sui");
    let scanned = Node::new("node-b", "10.0.0.2")
        .with_last_scan(chrono::Utc::now() - chrono::Duration::days(3), ScanLevel::Light);

    for node in [&fresh, &scanned] {
        let decision = pipeline.decide_typed(node, &organisation, &policy).await?;
        println!(
            "{}: {} ({})",
            node.id,
            decision.next_action(),
            decision.reasoning
        );
    }

    Ok(())
}

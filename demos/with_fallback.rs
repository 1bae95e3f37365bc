//! Fallback example showing the gateway switching providers.
//!
//! This example shows how to:
//! - Configure a primary and a secondary provider
//! - Observe fallback after a primary timeout
//! - Disable fallback and handle the resulting provider error
//!
//! Run with: cargo run --example with_fallback

use pgdn_orchestrator::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info,pgdn_orchestrator::audit=info"))
        .init();

    println!("=== pgdn-orchestrator Fallback Example ===\n");

    // Slow primary: every call outlives the attempt timeout
    let primary = Arc::new(
        MockProvider::new()
            .with_name("slow-primary")
            .with_latency(Duration::from_millis(500)),
    );
    let secondary = Arc::new(
        MockProvider::new_json(json!({
            "next_action": "run_discovery",
            "scan_level": null,
            "reasoning": "Protocol is not yet classified"
        }))
        .with_name("secondary"),
    );

    let config = GatewayConfig::new().with_attempt_timeout(Duration::from_millis(100));

    let pipeline = DecisionPipeline::builder()
        .primary_arc(primary.clone())
        .secondary_arc(secondary.clone())
        .with_gateway_config(config.clone())
        .build()?;

    let node = Node::new("node-1", "10.0.0.9");
    let organisation = Organisation::new("org-1");
    let policy = ScanPolicy::default();

    let outcome = pipeline
        .decide_typed_with_report(&node, &organisation, &policy)
        .await?;
    println!(
        "With fallback:    {} from {} after {} attempt(s)",
        outcome.decision.next_action(),
        outcome.provider,
        outcome.attempts
    );

    let strict = DecisionPipeline::builder()
        .primary_arc(primary.clone())
        .secondary_arc(secondary.clone())
        .with_gateway_config(config.with_fallback(false))
        .build()?;

    match strict.decide_typed(&node, &organisation, &policy).await {
        Ok(decision) => println!("Without fallback: {}", decision.next_action()),
        Err(e) => println!("Without fallback: {} error: {}", e.kind(), e),
    }

    println!(
        "\nCalls: primary={}, secondary={}",
        primary.call_count(),
        secondary.call_count()
    );

    Ok(())
}

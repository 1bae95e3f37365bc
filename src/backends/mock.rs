//! Mock provider for testing.
//!
//! This module provides a scriptable provider that can stand in for a real
//! decision service in tests and demos, with call counting so tests can
//! assert that a provider was, or was not, invoked.

use crate::core::{CompletionRequest, DecisionProvider, ProviderError};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A canned provider reply.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Return this completion text.
    Text(String),
    /// Fail with `ProviderError::Unavailable` and this reason.
    Fail(String),
}

impl MockReply {
    /// A reply carrying `value` serialized as JSON text.
    pub fn json(value: serde_json::Value) -> Self {
        Self::Text(value.to_string())
    }
}

/// The parts of a request the mock remembers.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// System instruction that was sent.
    pub system: String,
    /// Prompt that was sent.
    pub prompt: String,
    /// Temperature that was sent.
    pub temperature: f32,
    /// Token limit that was sent.
    pub max_tokens: u32,
}

/// A mock provider for testing purposes.
///
/// Replies are taken from a script in order; once the script is exhausted
/// every call gets the default reply.
///
/// # Examples
///
/// ```rust
/// use pgdn_orchestrator::backends::{MockProvider, MockReply};
/// use serde_json::json;
/// use std::time::Duration;
///
/// // Always proposes a light scan
/// let provider = MockProvider::new_json(json!({
///     "next_action": "scan_light",
///     "scan_level": "light",
///     "reasoning": "routine check"
/// }));
///
/// // Fails once, then answers
/// let provider = MockProvider::new()
///     .with_reply(MockReply::Fail("overloaded".into()))
///     .with_latency(Duration::from_millis(5));
/// ```
#[derive(Debug)]
pub struct MockProvider {
    /// Name of this provider instance.
    name: String,
    /// Replies served in order before the default applies.
    script: Mutex<VecDeque<MockReply>>,
    /// Reply once the script is exhausted.
    default_reply: MockReply,
    /// Simulated latency for calls.
    latency: Option<Duration>,
    /// Counter for propose calls.
    call_count: AtomicU64,
    /// Most recent request.
    last_request: Mutex<Option<RecordedRequest>>,
}

impl MockProvider {
    /// Creates a mock that proposes `skip`.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            script: Mutex::new(VecDeque::new()),
            default_reply: MockReply::json(serde_json::json!({
                "next_action": "skip",
                "scan_level": null,
                "reasoning": "mock provider default",
                "expected_follow_up": [],
                "confidence": 0.5
            })),
            latency: None,
            call_count: AtomicU64::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Creates a mock that always answers with `value` as JSON.
    pub fn new_json(value: serde_json::Value) -> Self {
        Self::new().with_default_reply(MockReply::json(value))
    }

    /// Creates a mock that always answers with raw `text`.
    pub fn new_text(text: impl Into<String>) -> Self {
        Self::new().with_default_reply(MockReply::Text(text.into()))
    }

    /// Creates a mock that always fails.
    pub fn new_failing(reason: impl Into<String>) -> Self {
        Self::new().with_default_reply(MockReply::Fail(reason.into()))
    }

    /// Sets the name of this provider.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the reply used once the script is exhausted.
    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Appends a scripted reply.
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
        self
    }

    /// Sets the simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the number of propose calls made.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Returns the most recent request, if any.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> Option<&str> {
        Some("mock")
    }

    async fn propose(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(RecordedRequest {
            system: request.system.to_string(),
            prompt: request.prompt.to_string(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.next_reply() {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(reason) => Err(ProviderError::unavailable(&self.name, reason)),
        }
    }
}

//! Structured audit logging for decision requests.
//!
//! This module provides functions for emitting structured audit events
//! using the `tracing` crate under the `pgdn_orchestrator::audit` target.
//! Events can be captured by any tracing subscriber; the serializable
//! event structs let callers persist the same records.

mod events;

pub use events::{
    emit_decision_finalised, emit_decision_requested, emit_override_applied,
    emit_permission_denied, emit_provider_failure, emit_provider_fallback, AuditEvent,
    DecisionAuditEvent, OverrideAuditEvent,
};

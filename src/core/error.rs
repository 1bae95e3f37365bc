//! Error types for the orchestrator.
//!
//! Every failure path is a typed value; the library never panics. The four
//! kinds map onto distinct stages of a decision request:
//!
//! - [`SchemaError`] - malformed input or a malformed provider payload
//! - [`PermissionDeniedError`] - the organisation forbids scanning the node
//! - [`ConfigurationError`] - no usable provider or invalid settings
//! - [`ProviderError`] - the external decision service failed
//!
//! [`OrchestrationError`] is the umbrella type returned by the pipeline.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The way a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required field is absent or null.
    Missing,
    /// A required text field is present but blank.
    Empty,
    /// The field has the wrong JSON type.
    WrongType {
        /// The type that was expected, e.g. `"string"`.
        expected: &'static str,
    },
    /// A numeric value is outside its permitted range.
    OutOfRange {
        /// Human-readable description of the permitted range.
        range: String,
    },
    /// A value is not one of the permitted enumeration members.
    NotInEnumeration {
        /// The value that was supplied.
        value: String,
        /// The permitted values.
        allowed: &'static [&'static str],
    },
    /// The field contradicts another field.
    Inconsistent {
        /// What the contradiction is.
        reason: String,
    },
    /// The document could not be parsed at all.
    Unparseable {
        /// Parser error details.
        details: String,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "required field is missing"),
            Self::Empty => write!(f, "must not be empty"),
            Self::WrongType { expected } => write!(f, "expected {expected}"),
            Self::OutOfRange { range } => write!(f, "out of range, expected {range}"),
            Self::NotInEnumeration { value, allowed } => {
                write!(f, "'{value}' is not one of [{}]", allowed.join(", "))
            }
            Self::Inconsistent { reason } => write!(f, "{reason}"),
            Self::Unparseable { details } => write!(f, "unparseable: {details}"),
        }
    }
}

/// A single violated field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted path of the field, e.g. `node.trust_score`.
    pub field: String,
    /// What went wrong.
    pub kind: ViolationKind,
}

impl FieldViolation {
    /// Creates a new violation for `field`.
    pub fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// Validation failure listing every violated field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema validation failed for {entity}: {}", join_violations(.violations))]
pub struct SchemaError {
    /// The entity being validated (`node`, `decision`, ...).
    pub entity: String,
    /// All violations found, in field order.
    pub violations: Vec<FieldViolation>,
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SchemaError {
    /// Creates a schema error for `entity` with the given violations.
    pub fn new(entity: impl Into<String>, violations: Vec<FieldViolation>) -> Self {
        Self {
            entity: entity.into(),
            violations,
        }
    }

    /// Creates a schema error for a document that could not be parsed.
    pub fn unparseable(entity: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(
            entity,
            vec![FieldViolation::new(
                "$",
                ViolationKind::Unparseable {
                    details: details.into(),
                },
            )],
        )
    }

    /// Returns `true` if `field` is among the violations.
    pub fn has_violation(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// Returns the violation for `field`, if any.
    pub fn violation(&self, field: &str) -> Option<&FieldViolation> {
        self.violations.iter().find(|v| v.field == field)
    }

    /// Folds several per-entity errors into one, prefixing each field with
    /// its entity name.
    pub fn combine(entity: impl Into<String>, errors: Vec<SchemaError>) -> Self {
        let violations = errors
            .into_iter()
            .flat_map(|err| {
                let prefix = err.entity;
                err.violations.into_iter().map(move |v| {
                    FieldViolation::new(format!("{prefix}.{}", v.field), v.kind)
                })
            })
            .collect();
        Self::new(entity, violations)
    }
}

/// The organisation's permissions forbid scanning the node at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionDeniedError {
    /// The node's host is on the organisation's blacklist.
    #[error("host {host} is blacklisted for organisation {organisation}")]
    BlacklistedHost {
        /// The blacklisted host.
        host: String,
        /// Organisation identifier.
        organisation: String,
    },

    /// The node's protocol is not among the organisation's whitelisted ones.
    #[error("protocol {protocol} is not whitelisted for organisation {organisation}")]
    ProtocolNotWhitelisted {
        /// The node's protocol.
        protocol: String,
        /// Organisation identifier.
        organisation: String,
    },
}

/// No usable provider is configured, or settings are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("configuration error: {message}")]
pub struct ConfigurationError {
    /// Description of the problem.
    pub message: String,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure of an external decision service.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The service could not be reached.
    #[error("provider '{provider}' is unavailable: {reason}")]
    Unavailable {
        /// Provider name.
        provider: String,
        /// Why it is unavailable.
        reason: String,
    },

    /// The attempt exceeded its time budget.
    #[error("provider '{provider}' timed out after {elapsed:?}")]
    Timeout {
        /// Provider name.
        provider: String,
        /// The timeout that elapsed.
        elapsed: Duration,
    },

    /// The service answered with a non-success status.
    #[error("provider '{provider}' returned HTTP {status}: {body}")]
    Http {
        /// Provider name.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The service answered without any completion text.
    #[error("provider '{provider}' returned an empty response")]
    EmptyResponse {
        /// Provider name.
        provider: String,
    },

    /// The service's response envelope did not have the expected shape.
    #[error("malformed response from provider '{provider}': {details}")]
    MalformedResponse {
        /// Provider name.
        provider: String,
        /// What was wrong with it.
        details: String,
    },

    /// The completion text was not a JSON object.
    #[error("response from provider '{provider}' is not a JSON object: {details}")]
    Unparseable {
        /// Provider name.
        provider: String,
        /// Parser error details.
        details: String,
    },

    /// No provider was configured when a decision was requested.
    #[error("no decision provider is configured")]
    NotConfigured,

    /// Every permitted attempt failed; wraps the last attempt's error.
    #[error("all provider attempts failed after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Creates an `Unavailable` error.
    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(provider: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            elapsed,
        }
    }

    /// Creates a `MalformedResponse` error.
    pub fn malformed(provider: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            details: details.into(),
        }
    }

    /// Creates an `Unparseable` error.
    pub fn unparseable(provider: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Unparseable {
            provider: provider.into(),
            details: details.into(),
        }
    }

    /// Returns the provider name if this error is associated with one.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Unavailable { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Http { provider, .. }
            | Self::EmptyResponse { provider }
            | Self::MalformedResponse { provider, .. }
            | Self::Unparseable { provider, .. } => Some(provider),
            Self::Exhausted { last, .. } => last.provider(),
            Self::NotConfigured => None,
        }
    }

    /// Returns `true` if the gateway may move on to the next provider.
    ///
    /// An unparseable completion is never retried.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, Self::Unparseable { .. } | Self::NotConfigured)
    }

    /// Returns the innermost error, unwrapping `Exhausted`.
    pub fn root(&self) -> &ProviderError {
        match self {
            Self::Exhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

/// Umbrella error returned by the decision pipeline.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Malformed input or provider payload.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The organisation forbids scanning this node.
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDeniedError),

    /// No usable provider, or invalid settings.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The external decision service failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl OrchestrationError {
    /// Returns a stable snake_case label for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Configuration(_) => "configuration",
            Self::Provider(_) => "provider",
        }
    }

    /// Returns `true` for schema errors.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Returns `true` for permission errors.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Returns `true` for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns `true` for provider errors.
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

/// A specialized `Result` type for schema validation.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A specialized `Result` type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A specialized `Result` type for pipeline operations.
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

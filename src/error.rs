//! The resolution/injection/cycle error taxonomy.
//!
//! A single `ContainerError` hierarchy rather than several parallel
//! exception types split by namespace — one unified, PSR-like shape, no
//! duplication.

use crate::id::{ClassId, ServiceId};
use crate::telemetry::Trace;
use thiserror::Error;

/// Result alias used across the kernel.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// All failures the kernel can raise.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// No definition exists for `service_id` and autowiring was disabled or
    /// impossible.
    #[error("service not found: {service_id}")]
    ServiceNotFound { service_id: ServiceId },

    /// The prototype for `class_id` reports that it cannot be instantiated
    /// (e.g. an interface with no bound implementation) yet instantiation
    /// was attempted anyway.
    #[error("class `{class_id}` is not instantiable (resolving `{service_id}`)")]
    ClassNotInstantiable {
        class_id: ClassId,
        service_id: ServiceId,
    },

    /// The ancestor chain already contains `service_id` — a dependency
    /// cycle, or the depth bound was exceeded without a literal cycle.
    #[error("circular dependency detected: {}", render_chain(.chain))]
    CircularDependency { chain: Vec<ServiceId> },

    /// A required constructor/method parameter had no override, no
    /// resolvable registered type, no default, and did not allow null.
    #[error("cannot resolve parameter `{param}` of `{owner}`: {reason}")]
    UnresolvableParameter {
        param: String,
        owner: ClassId,
        reason: String,
    },

    /// A required injectable property/method member had no resolvable
    /// source, or carried an illegal (builtin/unresolvable) type.
    #[error("cannot inject `{member}` of `{owner}`: {reason}")]
    InvalidInjection {
        member: String,
        owner: ClassId,
        reason: String,
    },

    /// A generic failure raised during pipeline execution, always carrying
    /// the partial or complete trace for diagnosis.
    #[error("resolution of `{service_id}` failed: {message}")]
    ResolutionFailure {
        service_id: ServiceId,
        message: String,
        trace: Trace,
    },

    /// A pipeline step requested an illegal state transition.
    #[error("illegal pipeline transition: {from} -> {to}")]
    PipelineStateViolation { from: String, to: String },

    /// A pipeline was built with zero steps.
    #[error("pipeline cannot be empty")]
    EmptyPipeline,

    /// `endScope`/`setScoped` was called with no active scope frame.
    #[error("no active scope")]
    NoActiveScope,

    /// `bind`/registration attempted on a locked `DefinitionStore`.
    #[error("definition store is locked — no further bindings allowed")]
    StoreLocked,
}

impl ContainerError {
    /// Attach a service id to an existing `Trace`, producing a
    /// `ResolutionFailure`. Used by the pipeline's `CollectDiagnosticsStep`
    /// and by steps that wrap unexpected native failures.
    pub fn resolution_failure(
        service_id: impl Into<ServiceId>,
        message: impl Into<String>,
        trace: Trace,
    ) -> Self {
        Self::ResolutionFailure {
            service_id: service_id.into(),
            message: message.into(),
            trace,
        }
    }

    /// `true` if this failure already carries a `Trace` for diagnostics.
    pub fn trace(&self) -> Option<&Trace> {
        match self {
            Self::ResolutionFailure { trace, .. } => Some(trace),
            _ => None,
        }
    }
}

fn render_chain(chain: &[ServiceId]) -> String {
    chain
        .iter()
        .map(ServiceId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Redact a value associated with a (possibly secret-carrying) argument or
/// trace-context key before it reaches a log line, error message, or
/// serialized `Trace`.
///
/// Keys are matched case-insensitively against a small deny-list; this is a
/// best-effort filter applied at emission time, not a guarantee.
pub fn redact(key: &str, value: &str) -> String {
    const SECRET_MARKERS: &[&str] = &[
        "password", "secret", "token", "apikey", "api_key", "credential", "private_key",
    ];
    let lower = key.to_ascii_lowercase();
    if SECRET_MARKERS.iter().any(|marker| lower.contains(marker)) {
        "***redacted***".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_dependency_renders_chain() {
        let err = ContainerError::CircularDependency {
            chain: vec![ServiceId::from("A"), ServiceId::from("B"), ServiceId::from("A")],
        };
        assert_eq!(err.to_string(), "circular dependency detected: A -> B -> A");
    }

    #[test]
    fn redact_masks_secret_like_keys() {
        assert_eq!(redact("db_password", "hunter2"), "***redacted***");
        assert_eq!(redact("apiKey", "xyz"), "***redacted***");
        assert_eq!(redact("name", "alice"), "alice");
    }
}

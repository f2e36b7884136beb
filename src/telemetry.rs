//! Resolution telemetry: per-step events and the ordered trace attached to
//! failures.
//!
//! `TelemetryCollector` records `StepStarted`/`StepSucceeded`/`StepFailed`
//! events as the pipeline runs and assembles them into a `Trace` on demand —
//! either for a successful `inspect_injection` call or embedded in a
//! `ContainerError::ResolutionFailure`. Timestamps are wall-clock
//! (`SystemTime`) for display; step durations use `Instant`, which is
//! monotonic and immune to clock adjustments.

use crate::id::ServiceId;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant, SystemTime};

/// The pipeline stage a telemetry event was recorded for. Mirrors the
/// canonical seven-step resolution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DefinitionLookup,
    CircularDependencyCheck,
    AnalyzePrototype,
    Autowire,
    ResolveInstance,
    InjectDependencies,
    CollectDiagnostics,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::DefinitionLookup => "definition_lookup",
            Stage::CircularDependencyCheck => "circular_dependency_check",
            Stage::AnalyzePrototype => "analyze_prototype",
            Stage::Autowire => "autowire",
            Stage::ResolveInstance => "resolve_instance",
            Stage::InjectDependencies => "inject_dependencies",
            Stage::CollectDiagnostics => "collect_diagnostics",
        };
        write!(f, "{name}")
    }
}

/// The outcome recorded for a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Started,
    Succeeded,
    Failed { reason: String },
}

/// One entry in a [`Trace`]: a stage, its outcome, when it happened, how
/// long it took (only meaningful once the matching `Succeeded`/`Failed`
/// event lands), and an optional free-text message.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub service_id: ServiceId,
    pub stage: Stage,
    pub outcome: Outcome,
    pub timestamp: SystemTime,
    pub duration: Option<Duration>,
    pub message: Option<String>,
}

/// An ordered, append-only record of everything that happened while
/// resolving one top-level request — including nested dependency
/// resolutions, which append to the same trace in the order they occurred.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Project this trace into its documented wire format: an ordered array
    /// of `{state, stage, outcome}` entries. `state` is the service id the
    /// step ran for; timestamps and durations are diagnostic-only and left
    /// out of the wire shape.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries.iter().map(TraceEntryJson::from).collect::<Vec<_>>())
    }
}

/// The wire projection of one [`TraceEntry`], matching the documented
/// `{state, stage, outcome}` serialization contract.
#[derive(Debug, Serialize)]
struct TraceEntryJson<'a> {
    state: &'a str,
    stage: Stage,
    outcome: &'a Outcome,
}

impl<'a> From<&'a TraceEntry> for TraceEntryJson<'a> {
    fn from(entry: &'a TraceEntry) -> Self {
        Self {
            state: entry.service_id.as_str(),
            stage: entry.stage,
            outcome: &entry.outcome,
        }
    }
}

/// Per-stage event kinds the pipeline reports to the collector:
/// `StepStarted` / `StepSucceeded` / `StepFailed`.
pub enum Event {
    StepStarted {
        service_id: ServiceId,
        stage: Stage,
    },
    StepSucceeded {
        service_id: ServiceId,
        stage: Stage,
        message: Option<String>,
    },
    StepFailed {
        service_id: ServiceId,
        stage: Stage,
        reason: String,
    },
}

/// Accumulates [`Event`]s for one resolution and assembles them into a
/// [`Trace`]. Not shared across requests — the `Engine` builds a fresh
/// collector per top-level `resolve` call and threads it through the
/// `ResolutionContext`.
pub struct TelemetryCollector {
    trace: Trace,
    pending_start: std::collections::HashMap<(ServiceId, StageKey), Instant>,
}

/// `Stage` itself isn't `Eq`+`Hash`-derivable across service ids cleanly as a
/// map key tuple without an explicit newtype; this keeps the lookup cheap.
type StageKey = Stage;

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            trace: Trace::new(),
            pending_start: std::collections::HashMap::new(),
        }
    }

    /// Record an event, computing elapsed duration for `Succeeded`/`Failed`
    /// events whose matching `Started` was observed earlier in this
    /// collector's lifetime.
    pub fn record(&mut self, event: Event) {
        match event {
            Event::StepStarted { service_id, stage } => {
                self.pending_start
                    .insert((service_id.clone(), stage), Instant::now());
                self.trace.push(TraceEntry {
                    service_id,
                    stage,
                    outcome: Outcome::Started,
                    timestamp: SystemTime::now(),
                    duration: None,
                    message: None,
                });
            }
            Event::StepSucceeded {
                service_id,
                stage,
                message,
            } => {
                let duration = self
                    .pending_start
                    .remove(&(service_id.clone(), stage))
                    .map(|start| start.elapsed());
                self.trace.push(TraceEntry {
                    service_id,
                    stage,
                    outcome: Outcome::Succeeded,
                    timestamp: SystemTime::now(),
                    duration,
                    message,
                });
            }
            Event::StepFailed {
                service_id,
                stage,
                reason,
            } => {
                let duration = self
                    .pending_start
                    .remove(&(service_id.clone(), stage))
                    .map(|start| start.elapsed());
                self.trace.push(TraceEntry {
                    service_id,
                    stage,
                    outcome: Outcome::Failed {
                        reason: reason.clone(),
                    },
                    timestamp: SystemTime::now(),
                    duration,
                    message: Some(reason),
                });
            }
        }
    }

    /// Consume the collector, yielding its accumulated trace.
    pub fn into_trace(self) -> Trace {
        self.trace
    }

    /// Borrow the trace accumulated so far without consuming the collector —
    /// used mid-resolution when a step needs to attach a partial trace to an
    /// error without aborting telemetry collection.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_started_then_succeeded_with_duration() {
        let mut collector = TelemetryCollector::new();
        let id = ServiceId::from("Logger");
        collector.record(Event::StepStarted {
            service_id: id.clone(),
            stage: Stage::ResolveInstance,
        });
        collector.record(Event::StepSucceeded {
            service_id: id,
            stage: Stage::ResolveInstance,
            message: None,
        });
        let trace = collector.into_trace();
        assert_eq!(trace.entries().len(), 2);
        assert!(trace.entries()[1].duration.is_some());
    }

    #[test]
    fn failed_event_carries_reason_as_message() {
        let mut collector = TelemetryCollector::new();
        let id = ServiceId::from("Database");
        collector.record(Event::StepFailed {
            service_id: id,
            stage: Stage::Autowire,
            reason: "no binding".to_string(),
        });
        let trace = collector.into_trace();
        assert_eq!(trace.entries()[0].message.as_deref(), Some("no binding"));
    }

    #[test]
    fn empty_trace_reports_empty() {
        assert!(Trace::new().is_empty());
    }

    #[test]
    fn to_json_projects_state_stage_outcome() {
        let mut collector = TelemetryCollector::new();
        collector.record(Event::StepStarted {
            service_id: ServiceId::from("Logger"),
            stage: Stage::ResolveInstance,
        });
        let trace = collector.into_trace();
        let json = trace.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &parsed[0];
        assert_eq!(entry["state"], "Logger");
        assert_eq!(entry["stage"], "resolve_instance");
        assert_eq!(entry["outcome"], "started");
    }
}
